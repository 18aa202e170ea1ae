//! Persisted filter preferences: one `FilterSet` per target plus a global set
//! and the "show not-applicable scores" toggle shared by every target.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::analysis::{filter_report, CategorizedReport, FilterDelta, FilterSet};
use crate::store::KeyValueStore;

const TARGET_KEY_PREFIX: &str = "automated-analysis:filters:target:";
const GLOBAL_KEY: &str = "automated-analysis:filters:global";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalFilters {
    pub filters: FilterSet,
    pub show_na_scores: bool,
}

#[derive(Clone)]
pub struct FilterStore {
    store: Arc<dyn KeyValueStore>,
}

fn target_key(connect_url: &str) -> String {
    format!("{TARGET_KEY_PREFIX}{connect_url}")
}

impl FilterStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    async fn load<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        match self.store.get(key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("corrupt filter preferences under {key}")),
            None => Ok(T::default()),
        }
    }

    async fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let serialized = serde_json::to_string(value)?;
        self.store
            .put(key, serialized)
            .await
            .with_context(|| format!("failed to persist filter preferences under {key}"))
    }

    pub async fn target_filters(&self, connect_url: &str) -> Result<FilterSet> {
        self.load(&target_key(connect_url)).await
    }

    pub async fn update_target_filters(
        &self,
        connect_url: &str,
        delta: FilterDelta,
    ) -> Result<FilterSet> {
        let key = target_key(connect_url);
        let mut filters: FilterSet = self.load(&key).await?;
        filters.apply(delta);
        self.save(&key, &filters).await?;
        Ok(filters)
    }

    pub async fn clear_target_filters(&self, connect_url: &str) -> Result<()> {
        self.store.delete(&target_key(connect_url)).await
    }

    pub async fn global_filters(&self) -> Result<GlobalFilters> {
        self.load(GLOBAL_KEY).await
    }

    pub async fn update_global_filters(&self, delta: FilterDelta) -> Result<GlobalFilters> {
        let mut global: GlobalFilters = self.load(GLOBAL_KEY).await?;
        global.filters.apply(delta);
        self.save(GLOBAL_KEY, &global).await?;
        Ok(global)
    }

    pub async fn set_show_na_scores(&self, show: bool) -> Result<GlobalFilters> {
        let mut global: GlobalFilters = self.load(GLOBAL_KEY).await?;
        global.show_na_scores = show;
        self.save(GLOBAL_KEY, &global).await?;
        Ok(global)
    }

    /// Resets the global filter set; the not-applicable toggle is kept.
    pub async fn clear_global_filters(&self) -> Result<GlobalFilters> {
        let mut global: GlobalFilters = self.load(GLOBAL_KEY).await?;
        global.filters = FilterSet::default();
        self.save(GLOBAL_KEY, &global).await?;
        Ok(global)
    }

    pub async fn apply(
        &self,
        connect_url: &str,
        report: &CategorizedReport,
    ) -> Result<CategorizedReport> {
        let target = self.target_filters(connect_url).await?;
        let global = self.global_filters().await?;
        Ok(filter_report(
            report,
            &target,
            &global.filters,
            global.show_na_scores,
        ))
    }
}
