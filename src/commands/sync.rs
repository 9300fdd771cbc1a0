use crate::commands::failure;
use crate::folders::FolderStore;
use crate::models::ApiResult;
use crate::storage::KeyValueStore;
use crate::sync::{RemoteDocumentStore, RemoteSnapshot, SyncService, UserSession};

/// Uploads every folder to the signed-in account.
pub async fn sync_upload<S: KeyValueStore, R: RemoteDocumentStore>(
    sync: &SyncService<R>,
    session: &UserSession,
    folders: &FolderStore<S>,
) -> ApiResult {
    match sync.upload(session, folders).await {
        Ok(receipt) => ApiResult::with_message(format!(
            "Synced {} folder(s) at {}",
            receipt.folder_count,
            receipt.uploaded_at.format("%Y-%m-%d %H:%M:%S UTC")
        )),
        Err(e) => failure("sync data", e),
    }
}

/// Downloads the account's folders and merges them into local storage.
pub async fn sync_download<S: KeyValueStore, R: RemoteDocumentStore>(
    sync: &SyncService<R>,
    session: &UserSession,
    folders: &FolderStore<S>,
) -> ApiResult {
    match sync.download(session, folders).await {
        Ok(report) => ApiResult {
            message: Some(format!(
                "Data fetched and stored: {} of {} folder(s) changed",
                report.changed_folders(),
                report.len()
            )),
            outcomes: Some(report),
            ..ApiResult::success()
        },
        Err(e) => failure("fetch data", e),
    }
}

/// Merges a payload the caller already has, e.g. read from a backup file.
pub async fn import_payload<S: KeyValueStore>(folders: &FolderStore<S>, payload: &str) -> ApiResult {
    let snapshot = match RemoteSnapshot::decode(payload) {
        Ok(snapshot) => snapshot,
        Err(e) => return ApiResult::error(e.to_string()),
    };
    match folders.merge_from_remote(&snapshot).await {
        Ok(report) => ApiResult {
            outcomes: Some(report),
            ..ApiResult::success()
        },
        Err(e) => failure("import folders", e),
    }
}

/// Encodes every local folder in the sync payload format.
pub async fn export_payload<S: KeyValueStore>(folders: &FolderStore<S>) -> Result<String, ApiResult> {
    let snapshot = folders
        .export_snapshot()
        .await
        .map_err(|e| failure("export folders", e))?;
    snapshot
        .encode()
        .map_err(|e| ApiResult::error(format!("Failed to encode folders: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppRef, MergeOutcome};
    use crate::storage::MemoryStore;
    use crate::sync::MemoryRemote;
    use std::time::Duration;

    #[tokio::test]
    async fn test_upload_and_download_messages() {
        let remote = MemoryRemote::new();
        let sync = SyncService::new(remote, Duration::from_secs(1));
        let session = UserSession::new("u", "t");

        let folders = FolderStore::new(MemoryStore::new());
        folders
            .add_app_or_create("Work", AppRef::new("com.a", "A", ""))
            .await
            .unwrap();

        let up = sync_upload(&sync, &session, &folders).await;
        assert!(up.success);
        assert!(up.message.unwrap().starts_with("Synced 1 folder(s)"));

        let fresh = FolderStore::new(MemoryStore::new());
        let down = sync_download(&sync, &session, &fresh).await;
        assert!(down.success);
        assert_eq!(
            down.outcomes.unwrap().get("Work"),
            Some(MergeOutcome::Adopted)
        );
    }

    #[tokio::test]
    async fn test_download_failure_message() {
        let sync = SyncService::new(MemoryRemote::new(), Duration::from_secs(1));
        let folders = FolderStore::new(MemoryStore::new());
        let result = sync_download(&sync, &UserSession::new("u", "t"), &folders).await;

        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("Failed to fetch data"));
    }

    #[tokio::test]
    async fn test_export_then_import() {
        let source = FolderStore::new(MemoryStore::new());
        source.create_folder("Empty").await.unwrap();
        let payload = export_payload(&source).await.unwrap();

        let target = FolderStore::new(MemoryStore::new());
        let result = import_payload(&target, &payload).await;
        assert!(result.success);
        assert_eq!(target.list_folders().await.unwrap().len(), 1);

        let bad = import_payload(&target, "not a payload").await;
        assert!(!bad.success);
    }
}
