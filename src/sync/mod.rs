//! Remote sync of folders to a per-user document.
//!
//! Upload replaces the user's document with every local folder. Download
//! fetches it, decodes it completely, and only then merges it into local
//! storage, so a network, auth or decoding failure never touches local
//! state.

mod payload;
mod remote;

pub use payload::{PayloadError, RemoteSnapshot};
pub use remote::{FileRemote, MemoryRemote};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::error::{FolderError, RemoteError, Result};
use crate::folders::FolderStore;
use crate::models::MergeReport;
use crate::storage::KeyValueStore;

/// A signed-in account, as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    pub user_id: String,
    pub token: String,
}

impl UserSession {
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: token.into(),
        }
    }
}

/// One JSON document per user, readable and writable by that user.
#[async_trait]
pub trait RemoteDocumentStore: Send + Sync {
    /// Fetch the user's sync payload. `None` if nothing was ever uploaded.
    async fn fetch(&self, session: &UserSession) -> std::result::Result<Option<String>, RemoteError>;

    /// Replace the user's sync payload.
    async fn update(
        &self,
        session: &UserSession,
        payload: &str,
    ) -> std::result::Result<(), RemoteError>;
}

/// Summary of a completed upload.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncReceipt {
    pub folder_count: usize,
    pub uploaded_at: DateTime<Utc>,
}

pub struct SyncService<R> {
    remote: R,
    timeout: Duration,
}

impl<R: RemoteDocumentStore> SyncService<R> {
    pub fn new(remote: R, timeout: Duration) -> Self {
        Self { remote, timeout }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, RemoteError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(FolderError::Timeout(self.timeout)),
        }
    }

    /// Uploads every local folder, replacing the remote document.
    pub async fn upload<S: KeyValueStore>(
        &self,
        session: &UserSession,
        folders: &FolderStore<S>,
    ) -> Result<SyncReceipt> {
        let snapshot = folders.export_snapshot().await?;
        let payload = snapshot
            .encode()
            .map_err(|e| FolderError::RemoteFailure(format!("could not encode payload: {}", e)))?;

        self.bounded(self.remote.update(session, &payload)).await?;
        log::info!(
            "Uploaded {} folder(s) for user {}",
            snapshot.len(),
            session.user_id
        );
        Ok(SyncReceipt {
            folder_count: snapshot.len(),
            uploaded_at: Utc::now(),
        })
    }

    /// Fetches and decodes the remote document without touching local state.
    pub async fn fetch_snapshot(&self, session: &UserSession) -> Result<RemoteSnapshot> {
        let payload = self.bounded(self.remote.fetch(session)).await?;
        let payload = match payload {
            Some(p) if !p.trim().is_empty() => p,
            _ => return Err(FolderError::RemoteFailure("no data found for this account".to_string())),
        };
        RemoteSnapshot::decode(&payload).map_err(|e| FolderError::RemoteFailure(e.to_string()))
    }

    /// Downloads the remote document and merges it into local storage.
    pub async fn download<S: KeyValueStore>(
        &self,
        session: &UserSession,
        folders: &FolderStore<S>,
    ) -> Result<MergeReport> {
        let snapshot = match self.fetch_snapshot(session).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::warn!("Sync download for user {} failed: {}", session.user_id, e);
                return Err(e);
            }
        };
        folders.merge_from_remote(&snapshot).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppRef, Folder, MergeOutcome};
    use crate::storage::MemoryStore;

    fn session() -> UserSession {
        UserSession::new("user-1", "token")
    }

    fn service(remote: MemoryRemote) -> SyncService<MemoryRemote> {
        SyncService::new(remote, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_upload_then_download_on_new_device() {
        let remote = MemoryRemote::new();
        let sync = service(remote.clone());

        let phone = FolderStore::new(MemoryStore::new());
        phone.create_folder("Work").await.unwrap();
        phone
            .add_app("Work", AppRef::new("com.a", "A", "x"))
            .await
            .unwrap();

        let receipt = sync.upload(&session(), &phone).await.unwrap();
        assert_eq!(receipt.folder_count, 1);

        let tablet = FolderStore::new(MemoryStore::new());
        let report = sync.download(&session(), &tablet).await.unwrap();
        assert_eq!(report.get("Work"), Some(MergeOutcome::Adopted));
        assert_eq!(
            tablet.list_folders().await.unwrap(),
            vec![Folder::with_apps("Work", vec![AppRef::new("com.a", "A", "x")])]
        );
    }

    #[tokio::test]
    async fn test_download_without_document() {
        let sync = service(MemoryRemote::new());
        let local = FolderStore::new(MemoryStore::new());

        let err = sync.download(&session(), &local).await.unwrap_err();
        assert!(matches!(err, FolderError::RemoteFailure(_)));
    }

    #[tokio::test]
    async fn test_empty_document_counts_as_no_data() {
        let remote = MemoryRemote::new();
        remote.put("user-1", "");
        let sync = service(remote);
        let local = FolderStore::new(MemoryStore::new());

        assert!(matches!(
            sync.download(&session(), &local).await,
            Err(FolderError::RemoteFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_remote_failure_leaves_local_untouched() {
        let remote = MemoryRemote::new();
        remote.fail_with("offline");
        let sync = service(remote);

        let backend = MemoryStore::new();
        let local = FolderStore::new(backend.clone());
        local.create_folder("Work").await.unwrap();
        let before = backend.snapshot();

        assert!(matches!(
            sync.download(&session(), &local).await,
            Err(FolderError::RemoteFailure(_))
        ));
        assert_eq!(backend.snapshot(), before);
    }

    #[tokio::test]
    async fn test_undecodable_payload_leaves_local_untouched() {
        let remote = MemoryRemote::new();
        remote.put(
            "user-1",
            r#"[["A","{\"appFolderName\":\"A\",\"apps\":[]}"],["B","oops"]]"#,
        );
        let sync = service(remote);
        let backend = MemoryStore::new();
        let local = FolderStore::new(backend.clone());

        assert!(matches!(
            sync.download(&session(), &local).await,
            Err(FolderError::RemoteFailure(_))
        ));
        assert!(backend.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_remote_times_out() {
        let remote = MemoryRemote::new();
        remote.put("user-1", "[]");
        remote.set_delay(Duration::from_secs(60));
        let sync = SyncService::new(remote, Duration::from_millis(500));

        let backend = MemoryStore::new();
        let local = FolderStore::new(backend.clone());
        let err = sync.download(&session(), &local).await.unwrap_err();

        assert!(matches!(err, FolderError::Timeout(d) if d == Duration::from_millis(500)));
        assert!(backend.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_unauthenticated_session_is_rejected() {
        let sync = service(MemoryRemote::new());
        let local = FolderStore::new(MemoryStore::new());
        let anonymous = UserSession::new("user-1", "");

        assert!(matches!(
            sync.upload(&anonymous, &local).await,
            Err(FolderError::RemoteFailure(_))
        ));
    }
}
