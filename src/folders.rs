//! Shortcut folder store.
//!
//! Every folder is one record in the key-value store, keyed by its name.
//! There is no index: listing folders lists every key. Operations are
//! read-modify-write against one or two keys and hold an async lock per
//! folder name while they run, so concurrent callers in this process cannot
//! drop each other's updates. Separate processes sharing a backend are not
//! coordinated.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::error::{FolderError, Result};
use crate::models::{AppRef, Folder, MergeOutcome, MergeReport};
use crate::storage::KeyValueStore;
use crate::sync::RemoteSnapshot;

/// Async locks keyed by folder name. Entries nobody holds or waits on are
/// pruned on the next call, so the map stays as small as the set of names
/// currently in use.
#[derive(Debug, Default)]
struct KeyLocks {
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    /// Locks every distinct name, in sorted order so that overlapping
    /// callers always acquire in the same sequence.
    async fn lock<'a, I>(&self, names: I) -> Vec<OwnedMutexGuard<()>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut names: Vec<&str> = names.into_iter().collect();
        names.sort_unstable();
        names.dedup();

        let handles: Vec<Arc<Mutex<()>>> = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            names
                .iter()
                .map(|name| Arc::clone(locks.entry((*name).to_string()).or_default()))
                .collect()
        };

        let mut guards = Vec::with_capacity(handles.len());
        for handle in handles {
            guards.push(handle.lock_owned().await);
        }
        guards
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(FolderError::InvalidName);
    }
    Ok(())
}

/// Owner of folder persistence.
pub struct FolderStore<S> {
    store: S,
    locks: KeyLocks,
}

impl<S: KeyValueStore> FolderStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: KeyLocks::default(),
        }
    }

    /// The underlying key-value store.
    pub fn backend(&self) -> &S {
        &self.store
    }

    /// Reads the folder stored at `name`. A value that is not a folder
    /// record is treated as absent.
    async fn read_folder(&self, name: &str) -> Result<Option<Folder>> {
        let Some(raw) = self.store.get(name).await? else {
            return Ok(None);
        };
        match Folder::from_json(&raw) {
            Ok(mut folder) => {
                folder.name = name.to_string();
                Ok(Some(folder))
            }
            Err(e) => {
                log::warn!("Ignoring unreadable record at key {:?}: {}", name, e);
                Ok(None)
            }
        }
    }

    async fn write_folder(&self, folder: &Folder) -> Result<()> {
        let value = folder.to_json().map_err(crate::error::StorageError::from)?;
        self.store.set(&folder.name, &value).await?;
        Ok(())
    }

    async fn require_folder(&self, name: &str) -> Result<Folder> {
        self.read_folder(name)
            .await?
            .ok_or_else(|| FolderError::NotFound(name.to_string()))
    }

    /// Lists every folder.
    ///
    /// Values that do not parse as folder records are skipped. Ordering
    /// follows the backend's key listing and is not stable. A rename that was
    /// interrupted after writing the new key is completed here.
    pub async fn list_folders(&self) -> Result<Vec<Folder>> {
        let keys = self.store.all_keys().await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let entries = self.store.multi_get(&keys).await?;
        let mut folders = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let Some(value) = value else { continue };
            match Folder::from_json(&value) {
                Ok(mut folder) => {
                    if folder.name != key {
                        log::warn!(
                            "Folder record {:?} is stored under key {:?}; using the key",
                            folder.name,
                            key
                        );
                        folder.name = key;
                    }
                    folders.push(folder);
                }
                Err(e) => log::warn!("Skipping key {:?}: not a folder record ({})", key, e),
            }
        }

        let interrupted: Vec<(String, String)> = folders
            .iter()
            .filter_map(|f| Some((f.name.clone(), f.renamed_from.clone()?)))
            .collect();

        let mut superseded = HashSet::new();
        for (name, old_name) in interrupted {
            match self.finish_rename(&name, &old_name).await {
                Ok(Some((repaired, removed_source))) => {
                    if let Some(slot) = folders.iter_mut().find(|f| f.name == name) {
                        *slot = repaired;
                    }
                    if removed_source {
                        superseded.insert(old_name);
                    }
                }
                Ok(None) => {}
                Err(e) => log::warn!(
                    "Could not complete interrupted rename {:?} -> {:?}: {}",
                    old_name,
                    name,
                    e
                ),
            }
        }
        folders.retain(|f| !superseded.contains(&f.name));
        for folder in &mut folders {
            folder.clear_rename_state();
        }
        Ok(folders)
    }

    /// Completes a rename from `old_name` to `name`: the new key wins and the
    /// marker is cleared. The old key is removed only when its record carries
    /// the same rename token, so a folder created later under the old name
    /// survives. Returns the repaired folder and whether the old key was
    /// removed.
    async fn finish_rename(&self, name: &str, old_name: &str) -> Result<Option<(Folder, bool)>> {
        let _guards = self.locks.lock([name, old_name]).await;

        let Some(mut folder) = self.read_folder(name).await? else {
            return Ok(None);
        };
        if folder.renamed_from.as_deref() != Some(old_name) {
            return Ok(Some((folder, false)));
        }

        let mut removed_source = false;
        if old_name != name {
            let source_token = self
                .read_folder(old_name)
                .await?
                .and_then(|source| source.rename_token);
            if folder.rename_token.is_some() && source_token == folder.rename_token {
                log::info!("Completing interrupted rename {:?} -> {:?}", old_name, name);
                self.store.remove(old_name).await?;
                removed_source = true;
            } else if self.store.get(old_name).await?.is_some() {
                log::debug!(
                    "Key {:?} no longer holds the source of the rename to {:?}; keeping it",
                    old_name,
                    name
                );
            }
        }

        folder.clear_rename_state();
        if let Err(e) = self.write_folder(&folder).await {
            log::warn!("Could not clear rename marker on {:?}: {}", name, e);
        }
        Ok(Some((folder, removed_source)))
    }

    /// Reads one folder, failing with `NotFound` if it is missing.
    pub async fn get_folder(&self, name: &str) -> Result<Folder> {
        let mut folder = self.require_folder(name).await?;
        folder.clear_rename_state();
        Ok(folder)
    }

    /// Creates an empty folder. Fails if anything is already stored at `name`.
    pub async fn create_folder(&self, name: &str) -> Result<Folder> {
        validate_name(name)?;
        let _guards = self.locks.lock([name]).await;

        if self.store.get(name).await?.is_some() {
            return Err(FolderError::AlreadyExists(name.to_string()));
        }
        let folder = Folder::new(name);
        self.write_folder(&folder).await?;
        log::debug!("Created folder {:?}", name);
        Ok(folder)
    }

    /// Deletes a folder, reporting `NotFound` when there was nothing to delete.
    pub async fn delete_folder(&self, name: &str) -> Result<()> {
        let _guards = self.locks.lock([name]).await;

        if self.store.get(name).await?.is_none() {
            return Err(FolderError::NotFound(name.to_string()));
        }
        self.store.remove(name).await?;
        log::debug!("Deleted folder {:?}", name);
        Ok(())
    }

    /// Moves a folder to a new key.
    ///
    /// The old record is tagged with a fresh rename token, then the new
    /// record is written carrying the old name and the same token, and only
    /// then is the old key removed. If the process stops in between, the next
    /// [`list_folders`](Self::list_folders) completes the rename. Once the old
    /// key is gone the rename has happened: failing to clear the marker
    /// afterwards is logged, not returned.
    pub async fn rename_folder(&self, old_name: &str, new_name: &str) -> Result<Folder> {
        validate_name(new_name)?;
        let _guards = self.locks.lock([old_name, new_name]).await;

        let mut source = self.require_folder(old_name).await?;
        source.clear_rename_state();
        if old_name == new_name {
            return Ok(source);
        }
        if self.store.get(new_name).await?.is_some() {
            return Err(FolderError::AlreadyExists(new_name.to_string()));
        }

        let token = Uuid::new_v4().to_string();
        source.rename_token = Some(token.clone());
        self.write_folder(&source).await?;

        let mut target = source.clone();
        target.name = new_name.to_string();
        target.renamed_from = Some(old_name.to_string());
        target.rename_token = Some(token);
        if let Err(e) = self.write_folder(&target).await {
            source.clear_rename_state();
            if let Err(untag) = self.write_folder(&source).await {
                log::warn!("Could not clear rename token on {:?}: {}", old_name, untag);
            }
            return Err(e);
        }
        self.store.remove(old_name).await?;

        target.clear_rename_state();
        if let Err(e) = self.write_folder(&target).await {
            log::warn!(
                "Renamed folder {:?} -> {:?} but could not clear its rename marker: {}",
                old_name,
                new_name,
                e
            );
        }
        log::debug!("Renamed folder {:?} -> {:?}", old_name, new_name);
        Ok(target)
    }

    /// Appends an app to an existing folder.
    pub async fn add_app(&self, folder_name: &str, app: AppRef) -> Result<Folder> {
        let _guards = self.locks.lock([folder_name]).await;
        let folder = self.require_folder(folder_name).await?;
        self.append_app(folder, app).await
    }

    /// Appends an app, creating the folder first if it does not exist.
    pub async fn add_app_or_create(&self, folder_name: &str, app: AppRef) -> Result<Folder> {
        validate_name(folder_name)?;
        let _guards = self.locks.lock([folder_name]).await;
        let folder = match self.read_folder(folder_name).await? {
            Some(folder) => folder,
            None => Folder::new(folder_name),
        };
        self.append_app(folder, app).await
    }

    async fn append_app(&self, mut folder: Folder, app: AppRef) -> Result<Folder> {
        if folder.contains(&app.package_name) {
            return Err(FolderError::AlreadyPresent {
                folder: folder.name,
                package: app.package_name,
            });
        }
        folder.apps.push(app);
        self.write_folder(&folder).await?;
        Ok(folder)
    }

    /// Removes an app from a folder. Removing an app that is not there is a
    /// successful no-op.
    pub async fn remove_app(&self, folder_name: &str, package_name: &str) -> Result<Folder> {
        let _guards = self.locks.lock([folder_name]).await;
        let mut folder = self.require_folder(folder_name).await?;

        if !folder.contains(package_name) {
            return Ok(folder);
        }
        folder.apps.retain(|a| a.package_name != package_name);
        self.write_folder(&folder).await?;
        Ok(folder)
    }

    /// Additively merges a downloaded snapshot into local storage.
    ///
    /// Missing folders are adopted; existing folders gain the remote apps
    /// they lack, in remote order. Local apps and local metadata are never
    /// changed or removed. Every record is computed before anything is
    /// written, and if a write fails the keys already written are restored.
    ///
    /// A snapshot naming a blank folder is rejected with `InvalidName` before
    /// anything is written.
    pub async fn merge_from_remote(&self, snapshot: &RemoteSnapshot) -> Result<MergeReport> {
        for name in snapshot.names() {
            validate_name(name)?;
        }
        let _guards = self.locks.lock(snapshot.names()).await;

        let mut report = MergeReport::default();
        let mut writes: Vec<(Folder, Option<String>)> = Vec::new();

        for remote in snapshot.folders() {
            let previous = self.store.get(&remote.name).await?;
            let local = previous
                .as_deref()
                .and_then(|raw| Folder::from_json(raw).ok());

            match local {
                None => {
                    if previous.is_some() {
                        log::warn!(
                            "Replacing unreadable record at {:?} with remote folder",
                            remote.name
                        );
                    }
                    let mut adopted = Folder::new(remote.name.clone());
                    for app in &remote.apps {
                        if !adopted.contains(&app.package_name) {
                            adopted.apps.push(app.clone());
                        }
                    }
                    writes.push((adopted, previous));
                    report.push(remote.name.clone(), MergeOutcome::Adopted);
                }
                Some(mut folder) => {
                    folder.name = remote.name.clone();
                    let before = folder.apps.len();
                    for app in &remote.apps {
                        if !folder.contains(&app.package_name) {
                            folder.apps.push(app.clone());
                        }
                    }
                    let added = folder.apps.len() - before;
                    if added == 0 {
                        report.push(remote.name.clone(), MergeOutcome::Unchanged);
                    } else {
                        writes.push((folder, previous));
                        report.push(remote.name.clone(), MergeOutcome::Merged(added));
                    }
                }
            }
        }

        for (done, (folder, _)) in writes.iter().enumerate() {
            if let Err(e) = self.write_folder(folder).await {
                log::error!(
                    "Merge failed writing folder {:?}: {}; restoring {} earlier write(s)",
                    folder.name,
                    e,
                    done
                );
                self.restore(&writes[..done]).await;
                return Err(e);
            }
        }

        log::info!(
            "Merged remote snapshot: {} folder(s), {} written",
            snapshot.len(),
            writes.len()
        );
        Ok(report)
    }

    async fn restore(&self, written: &[(Folder, Option<String>)]) {
        for (folder, previous) in written.iter().rev() {
            let result = match previous {
                Some(raw) => self.store.set(&folder.name, raw).await,
                None => self.store.remove(&folder.name).await,
            };
            if let Err(e) = result {
                log::error!("Could not restore folder {:?}: {}", folder.name, e);
            }
        }
    }

    /// Every local folder, in the shape uploaded to the remote account.
    pub async fn export_snapshot(&self) -> Result<RemoteSnapshot> {
        Ok(RemoteSnapshot::from_folders(self.list_folders().await?))
    }
}
