//! Solver backends
//!
//! - minilp: pure Rust simplex, branch and bound for integer variables (default)
//! - good_lp: `good_lp` default solver, behind the `good-lp` feature

pub mod minilp;
#[cfg(feature = "good-lp")]
pub mod good_lp;

pub use self::minilp::*;
#[cfg(feature = "good-lp")]
pub use self::good_lp::*;
