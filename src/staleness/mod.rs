pub mod controller;
pub mod state;

pub use controller::StalenessClock;
pub use state::{Staleness, StalenessState, StalenessUnit};
