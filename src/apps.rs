//! Device app-launcher capability and helpers over the installed-app list.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::models::{AppStatus, Folder, InstalledApp};

#[derive(Debug, thiserror::Error)]
#[error("launcher error: {0}")]
pub struct LauncherError(pub String);

/// What the host platform exposes about installed applications.
#[async_trait]
pub trait AppLauncher: Send + Sync {
    async fn installed_apps(&self) -> Result<Vec<InstalledApp>, LauncherError>;

    async fn launch(&self, package_name: &str) -> Result<(), LauncherError>;

    async fn is_installed(&self, package_name: &str) -> Result<bool, LauncherError>;
}

/// Store listing for an app, for offering a reinstall.
pub fn store_listing_url(package_name: &str) -> String {
    format!("market://details?id={}", package_name)
}

/// Drops repeated package names (keeping the first) and sorts by label.
pub fn unique_by_package(apps: Vec<InstalledApp>) -> Vec<InstalledApp> {
    let mut seen = HashSet::new();
    let mut unique: Vec<InstalledApp> = apps
        .into_iter()
        .filter(|app| seen.insert(app.package_name.clone()))
        .collect();
    unique.sort_by_key(|app| app.label.to_lowercase());
    unique
}

/// Case-insensitive label search.
pub fn search<'a>(apps: &'a [InstalledApp], query: &str) -> Vec<&'a InstalledApp> {
    let query = query.to_lowercase();
    apps.iter()
        .filter(|app| app.label.to_lowercase().contains(&query))
        .collect()
}

/// Pairs every app in a folder with whether it is still installed.
///
/// A launcher error counts as not installed.
pub async fn folder_install_status<L: AppLauncher + ?Sized>(
    launcher: &L,
    folder: &Folder,
) -> Vec<AppStatus> {
    let mut statuses = Vec::with_capacity(folder.apps.len());
    for app in &folder.apps {
        let installed = match launcher.is_installed(&app.package_name).await {
            Ok(installed) => installed,
            Err(e) => {
                log::error!("Error checking app installation for {}: {}", app.package_name, e);
                false
            }
        };
        statuses.push(AppStatus {
            app: app.clone(),
            installed,
        });
    }
    statuses
}

/// Launcher over a fixed app list. Records launches.
#[derive(Debug, Clone, Default)]
pub struct MemoryLauncher {
    apps: Arc<Mutex<HashMap<String, InstalledApp>>>,
    order: Arc<Mutex<Vec<String>>>,
    launched: Arc<Mutex<Vec<String>>>,
}

impl MemoryLauncher {
    pub fn new(apps: impl IntoIterator<Item = InstalledApp>) -> Self {
        let launcher = Self::default();
        for app in apps {
            launcher.install(app);
        }
        launcher
    }

    pub fn install(&self, app: InstalledApp) {
        let mut order = self.order.lock().unwrap_or_else(|e| e.into_inner());
        let mut apps = self.apps.lock().unwrap_or_else(|e| e.into_inner());
        if !order.contains(&app.package_name) {
            order.push(app.package_name.clone());
        }
        apps.insert(app.package_name.clone(), app);
    }

    pub fn uninstall(&self, package_name: &str) {
        self.apps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(package_name);
    }

    pub fn launched(&self) -> Vec<String> {
        self.launched
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl AppLauncher for MemoryLauncher {
    async fn installed_apps(&self) -> Result<Vec<InstalledApp>, LauncherError> {
        let order = self.order.lock().unwrap_or_else(|e| e.into_inner()).clone();
        let apps = self.apps.lock().unwrap_or_else(|e| e.into_inner());
        Ok(order
            .iter()
            .filter_map(|package| apps.get(package).cloned())
            .collect())
    }

    async fn launch(&self, package_name: &str) -> Result<(), LauncherError> {
        if !self.is_installed(package_name).await? {
            return Err(LauncherError(format!("{} is not installed", package_name)));
        }
        self.launched
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(package_name.to_string());
        Ok(())
    }

    async fn is_installed(&self, package_name: &str) -> Result<bool, LauncherError> {
        Ok(self
            .apps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(package_name))
    }
}
