pub mod recording;
pub mod report;

pub use recording::{ActiveRecording, AnalysisRecordingConfig, ArchivedRecording, Target};
pub use report::{
    now_millis, AnalysisReport, RuleEvaluation, Severity, MAX_SCORE, NA_SCORE,
    ORANGE_SCORE_THRESHOLD, RED_SCORE_THRESHOLD,
};
