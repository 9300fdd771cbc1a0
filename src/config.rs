use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;
use std::time::Duration;

use crate::models::Config;

/// ConfigManager handles loading, saving, and updating application configuration.
///
/// Missing or unrecognised fields in the saved file fall back to defaults, so
/// configs written by older versions keep loading.
pub struct ConfigManager {
    /// The current configuration
    config: RwLock<Config>,
    /// Path to the configuration file
    config_path: PathBuf,
}

impl ConfigManager {
    /// Creates a new ConfigManager, loading the file at `config_path` if it exists.
    pub fn new(config_path: PathBuf) -> Result<Self, String> {
        let config = Self::load_from_file(&config_path)?;
        Ok(Self {
            config: RwLock::new(config),
            config_path,
        })
    }

    fn load_from_file(path: &PathBuf) -> Result<Config, String> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        merge_config_with_defaults(&content)
    }

    /// Gets a clone of the current configuration.
    pub fn get(&self) -> Config {
        self.config
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Updates the configuration using a closure. Call [`save_sync`](Self::save_sync)
    /// to persist.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.config.write().unwrap_or_else(|e| e.into_inner());
        f(&mut config);
    }

    /// Saves the configuration to disk immediately.
    pub fn save_sync(&self) -> Result<(), String> {
        let config = self.get();

        let content = serde_json::to_string_pretty(&config)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }
        fs::write(&self.config_path, content)
            .map_err(|e| format!("Failed to write config file: {}", e))
    }

    /// Timeout applied to each remote sync request.
    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.get().sync_timeout_ms)
    }

    pub fn remote_user_id(&self) -> Option<String> {
        self.get().remote_user_id
    }

    pub fn set_remote_user_id(&self, user_id: Option<String>) {
        self.update(|config| {
            config.remote_user_id = user_id;
        });
    }

    /// Returns the config file path.
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }
}

/// Merges a partial config JSON with defaults.
pub fn merge_config_with_defaults(partial_json: &str) -> Result<Config, String> {
    if partial_json.trim().is_empty() {
        return Ok(Config::default());
    }

    let json_value: serde_json::Value = serde_json::from_str(partial_json)
        .map_err(|e| format!("Failed to parse config: {}", e))?;

    let mut config = Config::default();

    if let Some(obj) = json_value.as_object() {
        if let Some(v) = obj.get("sync_timeout_ms").and_then(|v| v.as_u64()) {
            if v > 0 {
                config.sync_timeout_ms = v;
            }
        }
        if let Some(v) = obj.get("log_level").and_then(|v| v.as_str()) {
            config.log_level = v.to_string();
        }
        if let Some(v) = obj.get("remote_user_id") {
            config.remote_user_id = v.as_str().map(|s| s.to_string());
        }
    }

    Ok(config)
}
