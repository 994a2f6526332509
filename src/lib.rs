//! Energy system model builder with rolling-horizon LP/MILP solving.
//!
//! Components publish named IOs, links and buses bind those IOs together and
//! [`Eesrep`] turns the whole network into one linear problem per window of
//! the time range.

pub mod components;
pub mod config;
pub mod domain;
pub mod error;
pub mod model;
pub mod network;
pub mod optimizer;
pub mod telemetry;

pub use error::{EesrepError, Result};
pub use model::Eesrep;
