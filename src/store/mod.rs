//! Injectable key-value persistence shared by the report cache and the
//! filter preferences.

mod json_file;
mod memory;

use anyhow::Result;
use async_trait::async_trait;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrites any existing value.
    async fn put(&self, key: &str, value: String) -> Result<()>;

    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}
