use crate::commands::failure;
use crate::folders::FolderStore;
use crate::models::{AppRef, ApiResult};
use crate::storage::KeyValueStore;

/// Lists all folders.
pub async fn list_folders<S: KeyValueStore>(folders: &FolderStore<S>) -> ApiResult {
    match folders.list_folders().await {
        Ok(list) => ApiResult::with_folders(list),
        Err(e) => failure("load folders", e),
    }
}

/// Creates a new, empty folder.
///
/// # Arguments
/// * `name` - The name of the folder to create
pub async fn create_folder<S: KeyValueStore>(folders: &FolderStore<S>, name: &str) -> ApiResult {
    match folders.create_folder(name).await {
        Ok(folder) => ApiResult::with_folder(folder),
        Err(e) => failure("create folder", e),
    }
}

/// Deletes a folder and every shortcut in it.
///
/// # Arguments
/// * `name` - The name of the folder to delete
pub async fn delete_folder<S: KeyValueStore>(folders: &FolderStore<S>, name: &str) -> ApiResult {
    match folders.delete_folder(name).await {
        Ok(()) => ApiResult::with_message(format!("Folder \"{}\" deleted", name)),
        Err(e) => failure("delete folder", e),
    }
}

/// Renames a folder.
///
/// # Arguments
/// * `old_name` - The current name of the folder
/// * `new_name` - The new name for the folder
pub async fn rename_folder<S: KeyValueStore>(
    folders: &FolderStore<S>,
    old_name: &str,
    new_name: &str,
) -> ApiResult {
    match folders.rename_folder(old_name, new_name).await {
        Ok(folder) => ApiResult {
            message: Some(format!(
                "Folder \"{}\" renamed to \"{}\"",
                old_name, new_name
            )),
            ..ApiResult::with_folder(folder)
        },
        Err(e) => failure("rename folder", e),
    }
}

/// Saves an app shortcut to a folder.
///
/// # Arguments
/// * `folder_name` - Target folder
/// * `app` - The app to save
/// * `create_missing` - Create the folder if it does not exist yet
pub async fn save_app<S: KeyValueStore>(
    folders: &FolderStore<S>,
    folder_name: &str,
    app: AppRef,
    create_missing: bool,
) -> ApiResult {
    let result = if create_missing {
        folders.add_app_or_create(folder_name, app).await
    } else {
        folders.add_app(folder_name, app).await
    };
    match result {
        Ok(folder) => ApiResult {
            message: Some("App saved successfully".to_string()),
            ..ApiResult::with_folder(folder)
        },
        Err(e) => failure("save app", e),
    }
}

/// Removes an app shortcut from a folder.
pub async fn remove_app<S: KeyValueStore>(
    folders: &FolderStore<S>,
    folder_name: &str,
    package_name: &str,
) -> ApiResult {
    match folders.remove_app(folder_name, package_name).await {
        Ok(folder) => ApiResult::with_folder(folder),
        Err(e) => failure("remove app", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn store() -> FolderStore<MemoryStore> {
        FolderStore::new(MemoryStore::new())
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let folders = store();
        let created = create_folder(&folders, "Work").await;
        assert!(created.success);
        assert_eq!(created.folder.unwrap().name, "Work");

        let listed = list_folders(&folders).await;
        assert_eq!(listed.folders.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_folder_is_a_user_message() {
        let folders = store();
        create_folder(&folders, "Work").await;
        let again = create_folder(&folders, "Work").await;

        assert!(!again.success);
        assert_eq!(
            again.error.as_deref(),
            Some("Folder \"Work\" has already been created")
        );
    }

    #[tokio::test]
    async fn test_empty_name_message() {
        let result = create_folder(&store(), "  ").await;
        assert_eq!(result.error.as_deref(), Some("Folder name cannot be empty"));
    }

    #[tokio::test]
    async fn test_save_app_twice_reports_notice() {
        let folders = store();
        let app = AppRef::new("com.a", "A", "");

        let first = save_app(&folders, "Work", app.clone(), true).await;
        assert!(first.success);
        assert_eq!(first.message.as_deref(), Some("App saved successfully"));

        let second = save_app(&folders, "Work", app, true).await;
        assert!(!second.success);
        assert!(second.error.unwrap().contains("already been saved"));
    }

    #[tokio::test]
    async fn test_save_app_without_create_needs_folder() {
        let result = save_app(&store(), "Work", AppRef::new("com.a", "A", ""), false).await;
        assert_eq!(result.error.as_deref(), Some("Folder \"Work\" does not exist"));
    }

    #[tokio::test]
    async fn test_rename_and_delete_messages() {
        let folders = store();
        create_folder(&folders, "Old").await;

        let renamed = rename_folder(&folders, "Old", "New").await;
        assert_eq!(
            renamed.message.as_deref(),
            Some("Folder \"Old\" renamed to \"New\"")
        );

        let deleted = delete_folder(&folders, "New").await;
        assert!(deleted.success);
        let missing = delete_folder(&folders, "New").await;
        assert!(!missing.success);
    }

    #[tokio::test]
    async fn test_persistence_failure_is_reported() {
        let backend = MemoryStore::new();
        backend.fail_writes_after(0);
        let folders = FolderStore::new(backend);

        let result = create_folder(&folders, "Work").await;
        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("Failed to create folder"));
    }

    #[tokio::test]
    async fn test_remove_app() {
        let folders = store();
        save_app(&folders, "Work", AppRef::new("com.a", "A", ""), true).await;
        let result = remove_app(&folders, "Work", "com.a").await;
        assert!(result.folder.unwrap().apps.is_empty());
    }
}
