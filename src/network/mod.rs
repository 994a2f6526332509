//! Bindings between component IOs: direct links and balance buses

pub mod bus;
pub mod link;

pub use bus::*;
pub use link::*;
