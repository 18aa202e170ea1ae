use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

use crate::cache::ReportCache;
use crate::config::{PipelineConfig, StoreKind};
use crate::db::Database;
use crate::filters::FilterStore;
use crate::models::AnalysisRecordingConfig;
use crate::remote::AuthFailureSignal;
use crate::store::{JsonFileStore, KeyValueStore, MemoryStore};

const JSON_STORE_FILE: &str = "automated-analysis.json";
const SQLITE_STORE_FILE: &str = "automated-analysis.sqlite3";

/// Per-process state shared by every resolution, passed in rather than held
/// globally.
#[derive(Clone)]
pub struct PipelineContext {
    pub cache: ReportCache,
    pub filters: FilterStore,
    pub auth: AuthFailureSignal,
    pub recording: AnalysisRecordingConfig,
}

impl PipelineContext {
    pub fn new(store: Arc<dyn KeyValueStore>, recording: AnalysisRecordingConfig) -> Self {
        Self {
            cache: ReportCache::new(store.clone()),
            filters: FilterStore::new(store),
            auth: AuthFailureSignal::new(),
            recording,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            AnalysisRecordingConfig::default(),
        )
    }

    pub fn open(config: &PipelineConfig) -> Result<Self> {
        let store: Arc<dyn KeyValueStore> = match config.store {
            StoreKind::Memory => Arc::new(MemoryStore::new()),
            StoreKind::Json => {
                let path = config.require_data_dir()?.join(JSON_STORE_FILE);
                Arc::new(
                    JsonFileStore::new(path)
                        .context("failed to open JSON report store")?,
                )
            }
            StoreKind::Sqlite => {
                let path = config.require_data_dir()?.join(SQLITE_STORE_FILE);
                Arc::new(Database::new(path).context("failed to open SQLite report store")?)
            }
        };
        info!("Using {:?} store for cached reports and filters", config.store);

        Ok(Self::new(store, config.recording.clone()))
    }
}
