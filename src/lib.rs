//! Report acquisition and caching pipeline for JFR automated analysis.
//!
//! [`SourceResolver`] decides which recording to analyze for a target, falling
//! back from the live analysis recording to a cached report and then to the
//! freshest archived recording. The resulting [`ReportState`] is categorized,
//! filtered on demand, and aged by a [`StalenessClock`] when it is not live.

pub mod analysis;
pub mod cache;
pub mod config;
pub mod context;
pub mod db;
pub mod errors;
pub mod filters;
pub mod models;
pub mod remote;
pub mod resolver;
pub mod staleness;
pub mod store;
pub mod utils;
pub mod view;

pub use analysis::{categorize, filter_report, CategorizedReport, FilterDelta, FilterSet, ScoreRange};
pub use cache::{CacheEntry, ReportCache};
pub use config::{PipelineConfig, StoreKind};
pub use context::PipelineContext;
pub use errors::{ApiError, ErrorKind, RecoveryAction, RetryPolicy};
pub use models::{ActiveRecording, AnalysisRecordingConfig, ArchivedRecording, RuleEvaluation, Target};
pub use remote::{AuthFailureOrigin, AuthFailureSignal, RecordingApi, ReportSource};
pub use resolver::{Provenance, ReportState, SourceResolver};
pub use staleness::{Staleness, StalenessClock, StalenessUnit};
pub use view::AnalysisView;

/// Installs `env_logger`, honouring `RUST_LOG` on top of the configured level.
/// Calling it again is harmless.
pub fn init_logging(config: &PipelineConfig) {
    let result = env_logger::Builder::new()
        .filter_level(config.log_level())
        .parse_default_env()
        .try_init();

    if result.is_ok() {
        log::info!("Automated analysis pipeline logging initialised");
    }
}
