use std::fs;
use std::path::{Path, PathBuf};

/// Directory name under the platform data directory
const APP_DIR_NAME: &str = "shortcut-folders";

/// FileSystem describes the application's data directory layout.
///
/// The structure is:
/// - `{data_dir}/folders.json` - Folder records (the local key-value store)
/// - `{data_dir}/config.json` - User configuration
/// - `{data_dir}/remote.json` - Stand-in remote account documents
#[derive(Debug, Clone)]
pub struct FileSystem {
    /// Base data directory for the application
    pub base_dir: PathBuf,
    /// Key-value document holding every folder
    pub store_file: PathBuf,
    /// Path to the configuration file (config.json)
    pub config_file: PathBuf,
    /// Path to the local remote-account document (remote.json)
    pub remote_file: PathBuf,
}

impl FileSystem {
    /// Creates a new FileSystem instance using the platform-appropriate data directory.
    ///
    /// On Linux: ~/.local/share/shortcut-folders/
    /// On macOS: ~/Library/Application Support/shortcut-folders/
    /// On Windows: C:\Users\{user}\AppData\Roaming\shortcut-folders\
    pub fn new() -> Result<Self, String> {
        let base_dir = dirs::data_dir()
            .ok_or_else(|| "Could not determine data directory".to_string())?
            .join(APP_DIR_NAME);

        Ok(Self::new_with_base(&base_dir))
    }

    /// Creates a new FileSystem instance with a custom base directory.
    pub fn new_with_base(base_dir: &Path) -> Self {
        let base_dir = base_dir.to_path_buf();
        Self {
            store_file: base_dir.join("folders.json"),
            config_file: base_dir.join("config.json"),
            remote_file: base_dir.join("remote.json"),
            base_dir,
        }
    }

    /// Ensures the base directory exists, creating it if necessary.
    pub fn ensure_directories(&self) -> Result<(), String> {
        fs::create_dir_all(&self.base_dir)
            .map_err(|e| format!("Failed to create data directory: {}", e))
    }
}
