use serde::{Deserialize, Serialize};

use crate::domain::IoKey;
use crate::optimizer::{Constraint, LinearExpr, VariableId};

/// Point-to-point binding `destination = factor * source + offset`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub source: IoKey,
    pub destination: IoKey,
    pub factor: f64,
    pub offset: f64,
}

impl Link {
    pub fn new(source: IoKey, destination: IoKey, factor: f64, offset: f64) -> Self {
        Self {
            source,
            destination,
            factor,
            offset,
        }
    }

    /// One equation per step, written `dest - factor * src = offset`
    pub fn constraints(&self, source: &[VariableId], destination: &[VariableId]) -> Vec<Constraint> {
        source
            .iter()
            .zip(destination)
            .enumerate()
            .map(|(t, (&src, &dst))| {
                Constraint::equal(
                    format!("link_{}_{}_{}", self.source, self.destination, t),
                    LinearExpr::new().term(dst, 1.0).term(src, -self.factor),
                    self.offset,
                )
            })
            .collect()
    }
}
