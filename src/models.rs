use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Snapshot of an installed app, captured when it was saved to a folder.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppRef {
    pub package_name: String,
    pub label: String,
    /// Base64 image data, possibly with a `data:image/...;base64,` prefix
    pub icon: String,
}

impl AppRef {
    pub fn new(
        package_name: impl Into<String>,
        label: impl Into<String>,
        icon: impl Into<String>,
    ) -> Self {
        Self {
            package_name: package_name.into(),
            label: label.into(),
            icon: icon.into(),
        }
    }

    /// Decodes the icon into raw image bytes.
    ///
    /// Accepts plain base64 as well as a data URL.
    pub fn icon_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        let data = match self.icon.split_once(";base64,") {
            Some((_, payload)) => payload,
            None => self.icon.as_str(),
        };
        STANDARD.decode(data.trim())
    }
}

impl From<&InstalledApp> for AppRef {
    fn from(app: &InstalledApp) -> Self {
        Self {
            package_name: app.package_name.clone(),
            label: app.label.clone(),
            icon: app.icon.clone(),
        }
    }
}

/// A named, ordered collection of app shortcuts.
///
/// Serialized as `{"appFolderName": ..., "apps": [...]}`. The name doubles
/// as the storage key.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    #[serde(rename = "appFolderName")]
    pub name: String,
    pub apps: Vec<AppRef>,
    /// Set only while a rename is in flight; names the key being replaced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) renamed_from: Option<String>,
    /// Pairs the source and target records of an in-flight rename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) rename_token: Option<String>,
}

impl Folder {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_apps(name, Vec::new())
    }

    pub fn with_apps(name: impl Into<String>, apps: Vec<AppRef>) -> Self {
        Self {
            name: name.into(),
            apps,
            renamed_from: None,
            rename_token: None,
        }
    }

    pub fn contains(&self, package_name: &str) -> bool {
        self.apps.iter().any(|a| a.package_name == package_name)
    }

    pub(crate) fn clear_rename_state(&mut self) {
        self.renamed_from = None;
        self.rename_token = None;
    }

    pub(crate) fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub(crate) fn from_json(value: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(value)
    }
}

/// Result of merging one remote folder into local storage.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "outcome", content = "added")]
pub enum MergeOutcome {
    /// No local folder existed; the remote one was stored verbatim
    Adopted,
    /// The local folder gained this many apps
    Merged(usize),
    /// The local folder already had every remote app
    Unchanged,
}

/// Per-folder outcomes of a merge, in snapshot order.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct MergeReport {
    outcomes: Vec<(String, MergeOutcome)>,
}

impl MergeReport {
    pub(crate) fn push(&mut self, name: String, outcome: MergeOutcome) {
        self.outcomes.push((name, outcome));
    }

    pub fn get(&self, name: &str) -> Option<MergeOutcome> {
        self.outcomes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, outcome)| *outcome)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, MergeOutcome)> {
        self.outcomes.iter()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Number of folders that were adopted or gained apps.
    pub fn changed_folders(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| *o != MergeOutcome::Unchanged)
            .count()
    }
}

/// An app reported by the device launcher.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstalledApp {
    pub package_name: String,
    pub label: String,
    pub icon: String,
}

/// A saved shortcut together with whether its app is currently installed
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppStatus {
    #[serde(flatten)]
    pub app: AppRef,
    pub installed: bool,
}

/// Generic result handed to the presentation layer
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<Folder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folders: Option<Vec<Folder>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcomes: Option<MergeReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ApiResult {
    /// Create a successful result
    pub fn success() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    /// Create an error result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Create a success result with a user-facing message
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Create a success result carrying a folder
    pub fn with_folder(folder: Folder) -> Self {
        Self {
            success: true,
            folder: Some(folder),
            ..Default::default()
        }
    }

    /// Create a success result carrying every folder
    pub fn with_folders(folders: Vec<Folder>) -> Self {
        Self {
            success: true,
            folders: Some(folders),
            ..Default::default()
        }
    }
}

/// Application configuration
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Config {
    /// Upper bound on a remote fetch or update, in milliseconds
    pub sync_timeout_ms: u64,
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Account used for remote sync, if signed in
    pub remote_user_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sync_timeout_ms: 10_000,
            log_level: "info".to_string(),
            remote_user_id: None,
        }
    }
}
