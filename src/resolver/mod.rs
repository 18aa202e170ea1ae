pub mod controller;
pub mod state;

pub use controller::SourceResolver;
pub use state::{reduce, Provenance, ReportState, ResolverEvent};
