//! Rule evaluation data models.
//!
//! Scores come from the remote analysis engine and live in `[0, 100]`. Any
//! negative score is the engine's "not applicable" marker.

use chrono::Utc;
use serde::{Deserialize, Serialize};

pub const NA_SCORE: f64 = -1.0;
pub const ORANGE_SCORE_THRESHOLD: f64 = 50.0;
pub const RED_SCORE_THRESHOLD: f64 = 75.0;
pub const MAX_SCORE: f64 = 100.0;

/// One scored finding produced by analyzing a recording.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuleEvaluation {
    pub topic: String,
    pub name: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RuleEvaluation {
    pub fn new(topic: impl Into<String>, name: impl Into<String>, score: f64) -> Self {
        Self {
            topic: topic.into(),
            name: name.into(),
            score,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_applicable(&self) -> bool {
        self.score >= 0.0
    }

    pub fn severity(&self) -> Severity {
        Severity::from_score(self.score)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    NotApplicable,
    Ok,
    Warning,
    Critical,
}

impl Severity {
    pub fn from_score(score: f64) -> Self {
        if score < 0.0 || score.is_nan() {
            Severity::NotApplicable
        } else if score >= RED_SCORE_THRESHOLD {
            Severity::Critical
        } else if score >= ORANGE_SCORE_THRESHOLD {
            Severity::Warning
        } else {
            Severity::Ok
        }
    }
}

/// Flat, ordered evaluation list as returned by the analysis engine.
pub type AnalysisReport = Vec<RuleEvaluation>;

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
