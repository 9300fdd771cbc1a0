use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::fs;

use super::{RemoteDocumentStore, UserSession};
use crate::error::RemoteError;

fn authorize(session: &UserSession) -> Result<(), RemoteError> {
    if session.token.is_empty() || session.user_id.is_empty() {
        return Err(RemoteError::Unauthenticated);
    }
    Ok(())
}

#[derive(Debug, Default)]
struct MemoryRemoteState {
    documents: HashMap<String, String>,
    failure: Option<String>,
    delay: Option<Duration>,
}

/// In-process document store, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    state: Arc<Mutex<MemoryRemoteState>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryRemoteState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    /// Store a raw payload for `user_id`.
    pub fn put(&self, user_id: &str, payload: &str) {
        self.with_state(|s| {
            s.documents.insert(user_id.to_string(), payload.to_string());
        });
    }

    pub fn document(&self, user_id: &str) -> Option<String> {
        self.with_state(|s| s.documents.get(user_id).cloned())
    }

    /// Make every request fail as unavailable.
    pub fn fail_with(&self, reason: &str) {
        self.with_state(|s| s.failure = Some(reason.to_string()));
    }

    /// Delay every request, to simulate a slow network.
    pub fn set_delay(&self, delay: Duration) {
        self.with_state(|s| s.delay = Some(delay));
    }

    async fn prepare(&self, session: &UserSession) -> Result<(), RemoteError> {
        if let Some(delay) = self.with_state(|s| s.delay) {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = self.with_state(|s| s.failure.clone()) {
            return Err(RemoteError::Unavailable(reason));
        }
        authorize(session)
    }
}

#[async_trait]
impl RemoteDocumentStore for MemoryRemote {
    async fn fetch(&self, session: &UserSession) -> Result<Option<String>, RemoteError> {
        self.prepare(session).await?;
        Ok(self.document(&session.user_id))
    }

    async fn update(&self, session: &UserSession, payload: &str) -> Result<(), RemoteError> {
        self.prepare(session).await?;
        self.put(&session.user_id, payload);
        Ok(())
    }
}

/// Document store backed by a local JSON file mapping user ids to payloads.
///
/// Stands in for the hosted account when running the command-line tool.
#[derive(Debug, Clone)]
pub struct FileRemote {
    path: PathBuf,
}

impl FileRemote {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> Result<BTreeMap<String, String>, RemoteError> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| RemoteError::Rejected(format!("corrupt remote document: {}", e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(RemoteError::Unavailable(e.to_string())),
        }
    }
}

#[async_trait]
impl RemoteDocumentStore for FileRemote {
    async fn fetch(&self, session: &UserSession) -> Result<Option<String>, RemoteError> {
        authorize(session)?;
        Ok(self.load().await?.remove(&session.user_id))
    }

    async fn update(&self, session: &UserSession, payload: &str) -> Result<(), RemoteError> {
        authorize(session)?;
        let mut documents = self.load().await?;
        documents.insert(session.user_id.clone(), payload.to_string());

        let content = serde_json::to_string_pretty(&documents)
            .map_err(|e| RemoteError::Rejected(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| RemoteError::Unavailable(e.to_string()))?;
        }
        fs::write(&self.path, content)
            .await
            .map_err(|e| RemoteError::Unavailable(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_memory_remote_is_per_user() {
        let remote = MemoryRemote::new();
        let alice = UserSession::new("alice", "t");
        let bob = UserSession::new("bob", "t");

        remote.update(&alice, "[]").await.unwrap();
        assert_eq!(remote.fetch(&alice).await.unwrap().as_deref(), Some("[]"));
        assert_eq!(remote.fetch(&bob).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_remote_round_trip() {
        let temp_dir = tempdir().unwrap();
        let remote = FileRemote::new(temp_dir.path().join("remote.json"));
        let session = UserSession::new("alice", "t");

        assert_eq!(remote.fetch(&session).await.unwrap(), None);
        remote.update(&session, "[]").await.unwrap();
        assert_eq!(remote.fetch(&session).await.unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_file_remote_requires_token() {
        let temp_dir = tempdir().unwrap();
        let remote = FileRemote::new(temp_dir.path().join("remote.json"));
        assert!(matches!(
            remote.fetch(&UserSession::new("alice", "")).await,
            Err(RemoteError::Unauthenticated)
        ));
    }
}
