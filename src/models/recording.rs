//! Target and recording data models.
//!
//! Targets and recordings are owned by the remote management API; the
//! pipeline only reads their identity and a handful of attributes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const ANALYSIS_RECORDING_NAME: &str = "automated-analysis";
pub const ANALYSIS_TEMPLATE_NAME: &str = "Continuous";
pub const ANALYSIS_TEMPLATE_TYPE: &str = "TARGET";
pub const ORIGIN_LABEL_KEY: &str = "origin";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub connect_url: String,
    #[serde(default)]
    pub alias: Option<String>,
}

impl Target {
    pub fn new(connect_url: impl Into<String>) -> Self {
        Self {
            connect_url: connect_url.into(),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.connect_url)
    }
}

/// A live recording on the target, addressable for report generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveRecording {
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Set when the recording was taken purely so it could be analyzed; such
    /// recordings are deleted once their report has been extracted.
    #[serde(default)]
    pub snapshot: bool,
}

impl ActiveRecording {
    /// Handle for the reserved analysis recording, addressed by name.
    pub fn reserved(config: &AnalysisRecordingConfig) -> Self {
        Self {
            name: config.name.clone(),
            labels: config.labels.clone(),
            snapshot: false,
        }
    }

    pub fn is_analysis_recording(&self, config: &AnalysisRecordingConfig) -> bool {
        self.name == config.name
            && self.labels.get(ORIGIN_LABEL_KEY) == config.labels.get(ORIGIN_LABEL_KEY)
    }
}

/// A recording persisted off-target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedRecording {
    pub name: String,
    #[serde(default)]
    pub report_url: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub size: u64,
    /// Epoch millis at which the recording was archived.
    pub archived_time: i64,
}

/// Settings for the reserved recording the pipeline starts for analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisRecordingConfig {
    pub name: String,
    pub template_name: String,
    pub template_type: String,
    pub to_disk: bool,
    pub max_age_secs: u64,
    pub max_size_bytes: u64,
    pub labels: BTreeMap<String, String>,
}

impl Default for AnalysisRecordingConfig {
    fn default() -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(
            ORIGIN_LABEL_KEY.to_string(),
            ANALYSIS_RECORDING_NAME.to_string(),
        );
        Self {
            name: ANALYSIS_RECORDING_NAME.into(),
            template_name: ANALYSIS_TEMPLATE_NAME.into(),
            template_type: ANALYSIS_TEMPLATE_TYPE.into(),
            to_disk: true,
            max_age_secs: 0,
            max_size_bytes: 0,
            labels,
        }
    }
}
