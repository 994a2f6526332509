pub mod backends;
pub mod problem;
pub mod solver;

pub use backends::*;
pub use problem::*;
pub use solver::*;
