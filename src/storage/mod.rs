//! Key-value persistence backends.
//!
//! The folder store only ever talks to a [`KeyValueStore`]: a flat,
//! string-keyed, string-valued map with no cross-key transactions.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::StorageError;

/// Asynchronous string-keyed store.
///
/// Removing an absent key is not an error. `multi_get` returns one entry per
/// requested key, with `None` for keys that have no value.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Lists every key. Ordering is backend-defined.
    async fn all_keys(&self) -> Result<Vec<String>, StorageError>;

    async fn multi_get(
        &self,
        keys: &[String],
    ) -> Result<Vec<(String, Option<String>)>, StorageError> {
        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            entries.push((key.clone(), self.get(key).await?));
        }
        Ok(entries)
    }
}
