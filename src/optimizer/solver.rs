use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{LinearProblem, MiniLpSolver, Solution};
use crate::config::SolverConfig;
use crate::error::{EesrepError, Result};

/// Outcome of a failed solve
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("problem is infeasible")]
    Infeasible,
    #[error("problem is unbounded")]
    Unbounded,
    #[error("backend failure: {0}")]
    Backend(String),
}

/// Adapter between the abstract [`LinearProblem`] and a concrete solver.
///
/// Implementations minimise the problem objective and return one value per
/// problem variable, in declaration order.
#[cfg_attr(test, mockall::automock)]
pub trait SolverInterface: Send + Sync {
    fn name(&self) -> &'static str;

    fn solve(&self, problem: &LinearProblem) -> std::result::Result<Solution, SolverError>;
}

/// Solver backends known to the crate
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::EnumString, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SolverKind {
    /// Pure Rust simplex with branch and bound on integer variables
    #[default]
    #[strum(serialize = "minilp")]
    #[serde(rename = "minilp")]
    MiniLp,
    /// `good_lp` default solver, requires the `good-lp` feature
    GoodLp,
}

impl SolverKind {
    pub fn build(self, config: &SolverConfig) -> Result<Box<dyn SolverInterface>> {
        match self {
            SolverKind::MiniLp => Ok(Box::new(MiniLpSolver::new(
                config.max_nodes,
                config.integrality_tolerance,
            ))),
            #[cfg(feature = "good-lp")]
            SolverKind::GoodLp => Ok(Box::new(super::GoodLpSolver::default())),
            #[cfg(not(feature = "good-lp"))]
            SolverKind::GoodLp => Err(EesrepError::Configuration(
                "the good_lp backend requires the 'good-lp' feature to be enabled".to_string(),
            )),
        }
    }
}
