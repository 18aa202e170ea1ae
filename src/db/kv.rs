use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::store::KeyValueStore;

use super::Database;

impl Database {
    pub async fn get_entry(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.execute(move |conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM kv_entries WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()
                .with_context(|| format!("failed to read entry {key}"))?;
            Ok(value)
        })
        .await
    }

    pub async fn upsert_entry(&self, key: &str, value: String) -> Result<()> {
        let key = key.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO kv_entries (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("failed to write entry {key}"))?;
            Ok(())
        })
        .await
    }

    pub async fn delete_entry(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.execute(move |conn| {
            conn.execute("DELETE FROM kv_entries WHERE key = ?1", params![key])
                .with_context(|| format!("failed to delete entry {key}"))?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl KeyValueStore for Database {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.get_entry(key).await
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        self.upsert_entry(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.delete_entry(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_overwrites_and_delete_removes() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("cache.sqlite3")).unwrap();

        db.put("report:a", "first".into()).await.unwrap();
        db.put("report:a", "second".into()).await.unwrap();
        assert_eq!(db.get("report:a").await.unwrap(), Some("second".into()));

        db.delete("report:a").await.unwrap();
        assert_eq!(db.get("report:a").await.unwrap(), None);
        db.delete("report:a").await.unwrap();
    }

    #[tokio::test]
    async fn entries_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.sqlite3");
        {
            let db = Database::new(path.clone()).unwrap();
            db.put("filters:global", "{}".into()).await.unwrap();
        }
        let db = Database::new(path).unwrap();
        assert_eq!(db.path().file_name().unwrap(), "cache.sqlite3");
        assert_eq!(db.get("filters:global").await.unwrap(), Some("{}".into()));
    }
}
