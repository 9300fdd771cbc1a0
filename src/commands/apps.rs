use crate::apps::{folder_install_status, store_listing_url, AppLauncher};
use crate::commands::failure;
use crate::folders::FolderStore;
use crate::models::{AppStatus, ApiResult};
use crate::storage::KeyValueStore;

/// Opens a saved app, or points at its store listing when it is gone.
pub async fn open_app<L: AppLauncher + ?Sized>(launcher: &L, package_name: &str) -> ApiResult {
    match launcher.is_installed(package_name).await {
        Ok(true) => match launcher.launch(package_name).await {
            Ok(()) => ApiResult::success(),
            Err(e) => {
                log::error!("Failed to launch {}: {}", package_name, e);
                ApiResult::error(e.to_string())
            }
        },
        Ok(false) => ApiResult {
            url: Some(store_listing_url(package_name)),
            ..ApiResult::error("App is not installed")
        },
        Err(e) => {
            log::error!("Error checking app installation: {}", e);
            ApiResult::error(e.to_string())
        }
    }
}

/// Every app in a folder with its installed flag.
pub async fn folder_apps<S: KeyValueStore, L: AppLauncher + ?Sized>(
    folders: &FolderStore<S>,
    launcher: &L,
    folder_name: &str,
) -> Result<Vec<AppStatus>, ApiResult> {
    let folder = folders
        .get_folder(folder_name)
        .await
        .map_err(|e| failure("load folder", e))?;
    Ok(folder_install_status(launcher, &folder).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apps::MemoryLauncher;
    use crate::models::{AppRef, InstalledApp};
    use crate::storage::MemoryStore;

    fn launcher() -> MemoryLauncher {
        MemoryLauncher::new([InstalledApp {
            package_name: "com.a".to_string(),
            label: "A".to_string(),
            icon: String::new(),
        }])
    }

    #[tokio::test]
    async fn test_open_installed_app() {
        let launcher = launcher();
        assert!(open_app(&launcher, "com.a").await.success);
        assert_eq!(launcher.launched(), vec!["com.a".to_string()]);
    }

    #[tokio::test]
    async fn test_open_missing_app_offers_store_listing() {
        let result = open_app(&launcher(), "com.b").await;
        assert!(!result.success);
        assert_eq!(result.url.as_deref(), Some("market://details?id=com.b"));
    }

    #[tokio::test]
    async fn test_folder_apps() {
        let folders = FolderStore::new(MemoryStore::new());
        folders
            .add_app_or_create("Work", AppRef::new("com.b", "B", ""))
            .await
            .unwrap();

        let statuses = folder_apps(&folders, &launcher(), "Work").await.unwrap();
        assert_eq!(statuses.len(), 1);
        assert!(!statuses[0].installed);

        assert!(folder_apps(&folders, &launcher(), "Nope").await.is_err());
    }
}
