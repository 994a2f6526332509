pub mod io;
pub mod state;
pub mod time_range;
pub mod time_series;

pub use io::*;
pub use state::*;
pub use time_range::*;
pub use time_series::*;
