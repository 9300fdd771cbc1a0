//! Key-value store kept in a single JSON document on disk.
//!
//! The document is an object mapping keys to their string values. It is
//! loaded on first use and rewritten in full on every mutation, going through
//! a temporary file and a rename so readers never observe a torn document.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use super::KeyValueStore;
use crate::error::StorageError;

type Entries = BTreeMap<String, String>;

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    /// Cached document, `None` until first loaded
    entries: Mutex<Option<Entries>>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(path: &Path) -> Result<Entries, StorageError> {
        match fs::read_to_string(path).await {
            Ok(content) if content.trim().is_empty() => Ok(Entries::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn persist(&self, entries: &Entries) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(entries)?;
        let tmp = self
            .path
            .with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));

        fs::write(&tmp, content).await?;
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Applies `f` to a copy of the document and persists it. The cache is
    /// only updated once the write has succeeded.
    async fn mutate<F>(&self, f: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut Entries),
    {
        let mut guard = self.entries.lock().await;
        let mut next = match guard.as_ref() {
            Some(entries) => entries.clone(),
            None => Self::load(&self.path).await?,
        };
        f(&mut next);
        self.persist(&next).await?;
        *guard = Some(next);
        Ok(())
    }

    async fn read<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Entries) -> T,
    {
        let mut guard = self.entries.lock().await;
        if guard.is_none() {
            *guard = Some(Self::load(&self.path).await?);
        }
        match guard.as_ref() {
            Some(entries) => Ok(f(entries)),
            None => Err(StorageError::Backend("document not loaded".to_string())),
        }
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.read(|entries| entries.get(key).cloned()).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.get(key).await?.is_none() {
            return Ok(());
        }
        self.mutate(|entries| {
            entries.remove(key);
        })
        .await
    }

    async fn all_keys(&self) -> Result<Vec<String>, StorageError> {
        self.read(|entries| entries.keys().cloned().collect()).await
    }

    async fn multi_get(
        &self,
        keys: &[String],
    ) -> Result<Vec<(String, Option<String>)>, StorageError> {
        self.read(|entries| {
            keys.iter()
                .map(|k| (k.clone(), entries.get(k).cloned()))
                .collect()
        })
        .await
    }
}
