//! In-memory key-value store.
//!
//! Holds everything in a `HashMap`, so key listing order is arbitrary, the
//! same as a device store. Write failures can be injected to exercise the
//! folder store's error paths.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::KeyValueStore;
use crate::error::StorageError;

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, String>,
    /// Number of writes still allowed before every write fails
    writes_before_failure: Option<usize>,
}

/// In-memory store shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-filled with raw entries.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        if let Ok(mut inner) = store.inner.lock() {
            inner.entries = entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect();
        }
        store
    }

    /// Let `count` more writes (set or remove) succeed, then fail the rest.
    pub fn fail_writes_after(&self, count: usize) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.writes_before_failure = Some(count);
        }
    }

    /// Clear any injected write failure.
    pub fn heal(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.writes_before_failure = None;
        }
    }

    /// Copy of every raw entry, for assertions.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.inner
            .lock()
            .map(|inner| inner.entries.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StorageError> {
        self.inner
            .lock()
            .map_err(|_| StorageError::Backend("memory store lock poisoned".to_string()))
    }

    fn check_write(inner: &mut Inner) -> Result<(), StorageError> {
        match inner.writes_before_failure {
            Some(0) => Err(StorageError::Backend("injected write failure".to_string())),
            Some(n) => {
                inner.writes_before_failure = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        Self::check_write(&mut inner)?;
        inner.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        Self::check_write(&mut inner)?;
        inner.entries.remove(key);
        Ok(())
    }

    async fn all_keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.lock()?.entries.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").await.unwrap(), None);

        store.set("a", "1").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some("1".to_string()));

        store.remove("a").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remove_absent_key_is_ok() {
        let store = MemoryStore::new();
        assert!(store.remove("missing").await.is_ok());
    }

    #[tokio::test]
    async fn test_multi_get_reports_missing_keys() {
        let store = MemoryStore::with_entries([("a", "1")]);
        let entries = store
            .multi_get(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(
            entries,
            vec![
                ("a".to_string(), Some("1".to_string())),
                ("b".to_string(), None),
            ]
        );
    }

    #[tokio::test]
    async fn test_injected_write_failure() {
        let store = MemoryStore::new();
        store.fail_writes_after(1);

        store.set("a", "1").await.unwrap();
        assert!(store.set("b", "2").await.is_err());
        assert!(store.remove("a").await.is_err());
        // Reads still work
        assert_eq!(store.get("a").await.unwrap(), Some("1".to_string()));

        store.heal();
        store.set("b", "2").await.unwrap();
        assert_eq!(store.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.set("a", "1").await.unwrap();
        assert_eq!(other.get("a").await.unwrap(), Some("1".to_string()));
    }
}
