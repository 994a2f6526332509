use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

use super::TimeGrid;
use crate::error::{EesrepError, Result};

/// Behaviour when a value is requested outside the known time range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Extrapolation {
    /// Hold the first/last known value
    #[default]
    Hold,
    /// Refuse to extrapolate
    Fail,
}

/// Where in a step a series is sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sampling {
    /// Flows applied during the step
    StepStart,
    /// States reached at the end of the step
    StepEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub time: f64,
    pub value: f64,
}

/// External forcing or target data, expressed in the same time unit as the
/// step duration of the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTimeSeries")]
pub struct TimeSeries {
    points: Vec<TimePoint>,
    extrapolation: Extrapolation,
}

/// Unchecked form read from serialized data
#[derive(Debug, Deserialize)]
struct RawTimeSeries {
    points: Vec<TimePoint>,
    #[serde(default)]
    extrapolation: Extrapolation,
}

impl TryFrom<RawTimeSeries> for TimeSeries {
    type Error = EesrepError;

    fn try_from(raw: RawTimeSeries) -> Result<Self> {
        Ok(Self::new(raw.points)?.with_extrapolation(raw.extrapolation))
    }
}

impl TimeSeries {
    pub fn new(points: Vec<TimePoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(EesrepError::Parameters(
                "time series needs at least one point".to_string(),
            ));
        }
        for point in &points {
            if !point.time.is_finite() || !point.value.is_finite() {
                return Err(EesrepError::Parameters(format!(
                    "time series point ({}, {}) is not finite",
                    point.time, point.value
                )));
            }
        }
        if points.windows(2).any(|w| w[1].time <= w[0].time) {
            return Err(EesrepError::Parameters(
                "time series times must be strictly increasing".to_string(),
            ));
        }

        Ok(Self {
            points,
            extrapolation: Extrapolation::default(),
        })
    }

    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self> {
        Self::new(
            pairs
                .iter()
                .map(|&(time, value)| TimePoint { time, value })
                .collect(),
        )
    }

    /// Series with one value per step of length `step_duration`, starting at 0
    pub fn from_steps(step_duration: f64, values: &[f64]) -> Result<Self> {
        Self::new(
            values
                .iter()
                .enumerate()
                .map(|(i, &value)| TimePoint {
                    time: i as f64 * step_duration,
                    value,
                })
                .collect(),
        )
    }

    pub fn constant(value: f64) -> Result<Self> {
        Self::from_pairs(&[(0.0, value)])
    }

    pub fn with_extrapolation(mut self, extrapolation: Extrapolation) -> Self {
        self.extrapolation = extrapolation;
        self
    }

    pub fn points(&self) -> &[TimePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Read a series from CSV data with a `time` and a `value` column
    pub fn from_csv_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        Self::from_csv_columns(reader, delimiter, "time", "value")
    }

    pub fn from_csv_path(path: impl AsRef<Path>, delimiter: u8) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file, delimiter)
    }

    /// Read a series from two named CSV columns
    pub fn from_csv_columns<R: Read>(
        reader: R,
        delimiter: u8,
        time_column: &str,
        value_column: &str,
    ) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let column = |name: &str| {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                EesrepError::TimeSeries(format!("missing column '{}' in CSV header", name))
            })
        };
        let time_idx = column(time_column)?;
        let value_idx = column(value_column)?;

        let mut points = Vec::new();
        for (row_idx, record) in reader.records().enumerate() {
            let record = record?;
            let row_number = row_idx + 2;
            let time = get_f64_field(&record, time_idx).ok_or_else(|| {
                EesrepError::TimeSeries(format!("invalid time on row {}", row_number))
            })?;
            let value = get_f64_field(&record, value_idx).ok_or_else(|| {
                EesrepError::TimeSeries(format!("invalid value on row {}", row_number))
            })?;
            points.push(TimePoint { time, value });
        }

        Self::new(points)
    }

    /// Linearly interpolated value at `time`
    pub fn value_at(&self, time: f64) -> Result<f64> {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];

        if time < first.time || time > last.time {
            return match self.extrapolation {
                Extrapolation::Hold if time < first.time => Ok(first.value),
                Extrapolation::Hold => Ok(last.value),
                Extrapolation::Fail => Err(EesrepError::TimeSeries(format!(
                    "time {} outside of the series range [{}, {}]",
                    time, first.time, last.time
                ))),
            };
        }

        let upper = self.points.partition_point(|p| p.time < time);
        if upper == 0 {
            return Ok(first.value);
        }
        let right = self.points[upper];
        if right.time == time {
            return Ok(right.value);
        }
        let left = self.points[upper - 1];
        let weight = (time - left.time) / (right.time - left.time);
        Ok(left.value + weight * (right.value - left.value))
    }

    /// One value per step of `grid`
    pub fn resample(&self, grid: &TimeGrid, sampling: Sampling) -> Result<Vec<f64>> {
        (0..grid.len())
            .map(|t| {
                let time = match sampling {
                    Sampling::StepStart => grid.step_start(t),
                    Sampling::StepEnd => grid.step_end(t),
                };
                self.value_at(time)
            })
            .collect()
    }
}

fn get_f64_field(record: &csv::StringRecord, index: usize) -> Option<f64> {
    record
        .get(index)
        .and_then(|s| s.trim().parse::<f64>().ok())
}
