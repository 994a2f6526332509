use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::components::BusKind;
use crate::domain::IoKey;
use crate::error::{EesrepError, Result};
use crate::optimizer::{Constraint, LinearExpr, VariableId};

/// One IO plugged into a bus, seen through `factor * io + offset`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusAttachment {
    pub io: IoKey,
    pub factor: f64,
    pub offset: f64,
}

/// Registered bus and its attachments.
///
/// `inputs` feed the bus (component outputs), `outputs` draw from it
/// (component inputs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusEntry {
    pub name: String,
    pub component_type: BusKind,
    pub inputs: Vec<BusAttachment>,
    pub outputs: Vec<BusAttachment>,
}

impl BusEntry {
    pub fn new(name: impl Into<String>, component_type: BusKind) -> Self {
        Self {
            name: name.into(),
            component_type,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }

    /// `Σ(f·in + o) = Σ(f·out + o)` for each of the `len` steps
    pub fn balance_constraints(
        &self,
        variables: &BTreeMap<IoKey, Vec<VariableId>>,
        len: usize,
    ) -> Result<Vec<Constraint>> {
        let lookup = |attachment: &BusAttachment| {
            variables
                .get(&attachment.io)
                .ok_or_else(|| EesrepError::UnknownIo(attachment.io.to_string()))
        };
        let inputs = self
            .inputs
            .iter()
            .map(|a| lookup(a).map(|vars| (a, vars)))
            .collect::<Result<Vec<_>>>()?;
        let outputs = self
            .outputs
            .iter()
            .map(|a| lookup(a).map(|vars| (a, vars)))
            .collect::<Result<Vec<_>>>()?;

        let offsets: f64 = self.outputs.iter().map(|a| a.offset).sum::<f64>()
            - self.inputs.iter().map(|a| a.offset).sum::<f64>();

        Ok((0..len)
            .map(|t| {
                let mut expr = LinearExpr::new();
                for (attachment, vars) in &inputs {
                    expr.add_term(vars[t], attachment.factor);
                }
                for (attachment, vars) in &outputs {
                    expr.add_term(vars[t], -attachment.factor);
                }
                Constraint::equal(format!("bus_{}_{}", self.name, t), expr, offsets)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::LinearProblem;

    #[test]
    fn test_entry_keys() {
        let entry = BusEntry::new("bus_1", BusKind::Generic);
        let value = serde_json::to_value(&entry).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 4);
        for key in ["name", "component_type", "inputs", "outputs"] {
            assert!(keys.iter().any(|k| k == key));
        }
        assert_eq!(value["component_type"], "bus");
    }

    #[test]
    fn test_balance() {
        let mut problem = LinearProblem::new();
        let production = problem.add_variables("prod", 2, 0.0, 10.0);
        let load = problem.add_variables("load", 2, 0.0, 10.0);
        let mut variables = BTreeMap::new();
        variables.insert(IoKey::new("prod", "power_out"), production);
        variables.insert(IoKey::new("load", "power_in"), load);

        let mut entry = BusEntry::new("bus", BusKind::Generic);
        entry.inputs.push(BusAttachment {
            io: IoKey::new("prod", "power_out"),
            factor: 1.0,
            offset: 0.0,
        });
        entry.outputs.push(BusAttachment {
            io: IoKey::new("load", "power_in"),
            factor: 2.0,
            offset: 1.0,
        });

        let rows = entry.balance_constraints(&variables, 2).unwrap();
        assert_eq!(rows.len(), 2);
        // prod = 2 * load + 1
        assert!(rows[0].is_satisfied(&[7.0, 0.0, 3.0, 0.0], 1e-12));
        assert!(!rows[0].is_satisfied(&[6.0, 0.0, 3.0, 0.0], 1e-12));
    }

    #[test]
    fn test_missing_attachment_variables() {
        let mut entry = BusEntry::new("bus", BusKind::Generic);
        entry.inputs.push(BusAttachment {
            io: IoKey::new("ghost", "power_out"),
            factor: 1.0,
            offset: 0.0,
        });
        let result = entry.balance_constraints(&BTreeMap::new(), 1);
        assert!(matches!(result, Err(EesrepError::UnknownIo(_))));
    }
}
