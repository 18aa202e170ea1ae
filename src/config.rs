use std::{env, path::PathBuf, str::FromStr};

use anyhow::{anyhow, Result};
use serde::Deserialize;

use crate::models::AnalysisRecordingConfig;

const DEBUG_ENV: &str = "AUTOMATED_ANALYSIS_DEBUG";
const DATA_DIR_ENV: &str = "AUTOMATED_ANALYSIS_DATA_DIR";
const STORE_ENV: &str = "AUTOMATED_ANALYSIS_STORE";

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
    Json,
    Sqlite,
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreKind::Memory),
            "json" => Ok(StoreKind::Json),
            "sqlite" => Ok(StoreKind::Sqlite),
            other => Err(anyhow!("unknown store kind '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    pub debug: bool,
    pub data_dir: Option<PathBuf>,
    pub store: StoreKind,
    pub recording: AnalysisRecordingConfig,
}

fn flag_enabled(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let store = match lookup(STORE_ENV) {
            Some(value) => value.parse()?,
            None => StoreKind::default(),
        };

        Ok(Self {
            debug: lookup(DEBUG_ENV).is_some_and(|value| flag_enabled(&value)),
            data_dir: lookup(DATA_DIR_ENV).map(PathBuf::from),
            store,
            recording: AnalysisRecordingConfig::default(),
        })
    }

    pub fn log_level(&self) -> log::LevelFilter {
        if self.debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }

    pub fn require_data_dir(&self) -> Result<&PathBuf> {
        self.data_dir
            .as_ref()
            .ok_or_else(|| anyhow!("{DATA_DIR_ENV} must be set for the {:?} store", self.store))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_to_memory_store_without_debug() {
        let config = PipelineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.store, StoreKind::Memory);
        assert!(!config.debug);
        assert_eq!(config.log_level(), log::LevelFilter::Info);
        assert!(config.require_data_dir().is_err());
    }

    #[test]
    fn reads_store_and_debug_flags() {
        let config = PipelineConfig::from_lookup(lookup(&[
            (DEBUG_ENV, "TRUE"),
            (STORE_ENV, "sqlite"),
            (DATA_DIR_ENV, "/var/lib/analysis"),
        ]))
        .unwrap();
        assert!(config.debug);
        assert_eq!(config.store, StoreKind::Sqlite);
        assert_eq!(
            config.require_data_dir().unwrap(),
            &PathBuf::from("/var/lib/analysis")
        );
    }

    #[test]
    fn rejects_unknown_store() {
        assert!(PipelineConfig::from_lookup(lookup(&[(STORE_ENV, "redis")])).is_err());
    }

    #[test]
    fn deserializes_partial_json() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"store":"json","dataDir":"/tmp/aa"}"#).unwrap();
        assert_eq!(config.store, StoreKind::Json);
        assert_eq!(config.recording.name, "automated-analysis");
    }
}
