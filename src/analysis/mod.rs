pub mod categorize;
pub mod filter;

pub use categorize::{categorize, CategorizedReport};
pub use filter::{filter_report, FilterDelta, FilterSet, ScoreRange};
