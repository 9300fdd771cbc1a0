use thiserror::Error;

use crate::models::Folder;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("sync payload is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("sync payload contains a folder with a blank name")]
    BlankName,

    #[error("folder \"{name}\" in sync payload is malformed: {source}")]
    Record {
        name: String,
        source: serde_json::Error,
    },
}

/// Folders as uploaded to, or downloaded from, the remote account.
///
/// On the wire this is a JSON array of `[folderName, folderRecordJson]`
/// pairs, where the second element is itself a JSON-encoded string. Names
/// are unique and order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteSnapshot {
    folders: Vec<Folder>,
}

impl RemoteSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_folders(folders: impl IntoIterator<Item = Folder>) -> Self {
        let mut snapshot = Self::new();
        for folder in folders {
            snapshot.insert(folder);
        }
        snapshot
    }

    /// Adds a folder. A folder with the same name is replaced in place.
    pub fn insert(&mut self, mut folder: Folder) {
        folder.clear_rename_state();
        match self.folders.iter_mut().find(|f| f.name == folder.name) {
            Some(existing) => *existing = folder,
            None => self.folders.push(folder),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Folder> {
        self.folders.iter().find(|f| f.name == name)
    }

    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.folders.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    /// Parses a payload. Fails as a whole if any pair is malformed or names a
    /// blank folder; the pair's first element is authoritative for the name.
    pub fn decode(payload: &str) -> Result<Self, PayloadError> {
        let pairs: Vec<(String, String)> = serde_json::from_str(payload)?;
        let mut snapshot = Self::new();
        for (name, record) in pairs {
            if name.trim().is_empty() {
                return Err(PayloadError::BlankName);
            }
            let mut folder = Folder::from_json(&record).map_err(|source| PayloadError::Record {
                name: name.clone(),
                source,
            })?;
            folder.name = name;
            snapshot.insert(folder);
        }
        Ok(snapshot)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let pairs = self
            .folders
            .iter()
            .map(|f| Ok((f.name.clone(), f.to_json()?)))
            .collect::<Result<Vec<(String, String)>, serde_json::Error>>()?;
        serde_json::to_string(&pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppRef;

    #[test]
    fn test_decode_pairs_in_order() {
        let payload = r#"[
            ["Work", "{\"appFolderName\":\"Work\",\"apps\":[{\"packageName\":\"com.a\",\"label\":\"A\",\"icon\":\"x\"}]}"],
            ["Games", "{\"appFolderName\":\"Games\",\"apps\":[]}"]
        ]"#;
        let snapshot = RemoteSnapshot::decode(payload).unwrap();

        assert_eq!(snapshot.names().collect::<Vec<_>>(), vec!["Work", "Games"]);
        assert_eq!(
            snapshot.get("Work").unwrap().apps,
            vec![AppRef::new("com.a", "A", "x")]
        );
    }

    #[test]
    fn test_encode_matches_wire_format() {
        let snapshot = RemoteSnapshot::from_folders([Folder::new("Work")]);
        assert_eq!(
            snapshot.encode().unwrap(),
            r#"[["Work","{\"appFolderName\":\"Work\",\"apps\":[]}"]]"#
        );
    }

    #[test]
    fn test_pair_name_wins_over_record_name() {
        let payload = r#"[["Work", "{\"appFolderName\":\"Other\",\"apps\":[]}"]]"#;
        let snapshot = RemoteSnapshot::decode(payload).unwrap();
        assert_eq!(snapshot.folders()[0].name, "Work");
    }

    #[test]
    fn test_duplicate_names_keep_first_position_last_value() {
        let payload = r#"[
            ["A", "{\"appFolderName\":\"A\",\"apps\":[]}"],
            ["B", "{\"appFolderName\":\"B\",\"apps\":[]}"],
            ["A", "{\"appFolderName\":\"A\",\"apps\":[{\"packageName\":\"p\",\"label\":\"P\",\"icon\":\"\"}]}"]
        ]"#;
        let snapshot = RemoteSnapshot::decode(payload).unwrap();
        assert_eq!(snapshot.names().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(snapshot.get("A").unwrap().apps.len(), 1);
    }

    #[test]
    fn test_bad_record_fails_whole_payload() {
        let payload = r#"[
            ["A", "{\"appFolderName\":\"A\",\"apps\":[]}"],
            ["B", "not json"]
        ]"#;
        match RemoteSnapshot::decode(payload) {
            Err(PayloadError::Record { name, .. }) => assert_eq!(name, "B"),
            other => panic!("expected record error, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_folder_name_fails_whole_payload() {
        let payload = r#"[
            ["A", "{\"appFolderName\":\"A\",\"apps\":[]}"],
            ["  ", "{\"appFolderName\":\"\",\"apps\":[]}"]
        ]"#;
        assert!(matches!(
            RemoteSnapshot::decode(payload),
            Err(PayloadError::BlankName)
        ));
        assert!(matches!(
            RemoteSnapshot::decode(r#"[["", "{\"appFolderName\":\"\",\"apps\":[]}"]]"#),
            Err(PayloadError::BlankName)
        ));
    }

    #[test]
    fn test_non_array_payload_is_malformed() {
        assert!(matches!(
            RemoteSnapshot::decode(r#"{"Work": {}}"#),
            Err(PayloadError::Malformed(_))
        ));
    }

    #[test]
    fn test_rename_marker_is_never_uploaded() {
        let mut folder = Folder::new("New");
        folder.renamed_from = Some("Old".to_string());
        folder.rename_token = Some("t1".to_string());
        let snapshot = RemoteSnapshot::from_folders([folder]);
        let encoded = snapshot.encode().unwrap();
        assert!(!encoded.contains("renamedFrom"));
        assert!(!encoded.contains("renameToken"));
    }
}
