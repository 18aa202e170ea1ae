//! Per-target single-slot cache of the last report obtained from a
//! cache-eligible source. Entries never expire on their own; they are
//! replaced by `put`, removed by `delete`, or removed when a live report
//! supersedes them.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::AnalysisReport;
use crate::store::KeyValueStore;

const CACHE_KEY_PREFIX: &str = "automated-analysis:report:";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub target: String,
    pub report: AnalysisReport,
    /// Epoch millis of the data the report was generated from.
    pub timestamp: i64,
}

#[derive(Clone)]
pub struct ReportCache {
    store: Arc<dyn KeyValueStore>,
}

fn cache_key(connect_url: &str) -> String {
    format!("{CACHE_KEY_PREFIX}{connect_url}")
}

impl ReportCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, connect_url: &str) -> Result<Option<CacheEntry>> {
        let Some(raw) = self.store.get(&cache_key(connect_url)).await? else {
            return Ok(None);
        };
        let entry = serde_json::from_str(&raw)
            .with_context(|| format!("corrupt cached report for {connect_url}"))?;
        Ok(Some(entry))
    }

    pub async fn put(
        &self,
        connect_url: &str,
        report: AnalysisReport,
        timestamp: i64,
    ) -> Result<()> {
        let entry = CacheEntry {
            target: connect_url.to_string(),
            report,
            timestamp,
        };
        let serialized = serde_json::to_string(&entry)?;
        self.store
            .put(&cache_key(connect_url), serialized)
            .await
            .with_context(|| format!("failed to cache report for {connect_url}"))
    }

    pub async fn delete(&self, connect_url: &str) -> Result<()> {
        self.store
            .delete(&cache_key(connect_url))
            .await
            .with_context(|| format!("failed to delete cached report for {connect_url}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RuleEvaluation;
    use crate::store::MemoryStore;

    const TARGET: &str = "service:jmx:rmi:///jndi/rmi://localhost:9091/jmxrmi";

    fn cache() -> (ReportCache, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (ReportCache::new(store.clone()), store)
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let (cache, _) = cache();
        let report = vec![RuleEvaluation::new("gc", "GC Pauses", 42.0)];
        cache.put(TARGET, report.clone(), 1_700_000_000_000).await.unwrap();

        let entry = cache.get(TARGET).await.unwrap().unwrap();
        assert_eq!(entry.report, report);
        assert_eq!(entry.timestamp, 1_700_000_000_000);
        assert_eq!(entry.target, TARGET);
    }

    #[tokio::test]
    async fn put_overwrites_single_slot() {
        let (cache, store) = cache();
        cache.put(TARGET, vec![], 100).await.unwrap();
        cache
            .put(TARGET, vec![RuleEvaluation::new("io", "File Read", 1.0)], 200)
            .await
            .unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(cache.get(TARGET).await.unwrap().unwrap().timestamp, 200);
    }

    #[tokio::test]
    async fn delete_then_get_is_absent() {
        let (cache, _) = cache();
        cache.put(TARGET, vec![], 100).await.unwrap();
        cache.delete(TARGET).await.unwrap();
        assert!(cache.get(TARGET).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn entries_are_keyed_per_target() {
        let (cache, _) = cache();
        cache.put("a", vec![], 1).await.unwrap();
        cache.put("b", vec![], 2).await.unwrap();
        cache.delete("a").await.unwrap();
        assert!(cache.get("a").await.unwrap().is_none());
        assert_eq!(cache.get("b").await.unwrap().unwrap().timestamp, 2);
    }

    #[tokio::test]
    async fn corrupt_entry_is_an_error() {
        let (cache, store) = cache();
        store.put(&cache_key(TARGET), "{".into()).await.unwrap();
        assert!(cache.get(TARGET).await.is_err());
    }
}
