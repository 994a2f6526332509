use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use crate::domain::{IoKey, TimeGrid};
use crate::error::Result;
use crate::optimizer::{Solution, VariableId};

/// Committed series per IO, concatenated across windows
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Results {
    time: Vec<f64>,
    series: BTreeMap<IoKey, Vec<f64>>,
}

impl Results {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the committed steps of a solved window
    pub(crate) fn commit(
        &mut self,
        grid: &TimeGrid,
        variables: &BTreeMap<IoKey, Vec<VariableId>>,
        solution: &Solution,
    ) {
        let committed = grid.committed_steps();
        self.time.extend(grid.committed_times());
        for (key, vars) in variables {
            self.series
                .entry(key.clone())
                .or_default()
                .extend(solution.series(&vars[..committed]));
        }
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn get(&self, component: &str, io: &str) -> Option<&[f64]> {
        self.series
            .get(&IoKey::new(component, io))
            .map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IoKey, &[f64])> {
        self.series.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Tabular view: a `time` column then one `{component}_{io}` column per IO
    pub fn as_table(&self) -> ResultTable {
        let mut columns = vec![("time".to_string(), self.time.clone())];
        columns.extend(self.series.iter().map(|(k, v)| (k.to_string(), v.clone())));
        ResultTable { columns }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultTable {
    columns: Vec<(String, Vec<f64>)>,
}

impl ResultTable {
    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |(_, values)| values.len())
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(self.headers())?;
        for row in 0..self.n_rows() {
            writer.write_record(
                self.columns
                    .iter()
                    .map(|(_, values)| values[row].to_string()),
            )?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn write_csv_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }
}
