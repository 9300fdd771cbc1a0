use std::time::Duration;
use thiserror::Error;

/// Failure of the underlying key-value persistence.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage document is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage backend failed: {0}")]
    Backend(String),
}

/// Failure reported by the remote document store.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("not authenticated")]
    Unauthenticated,

    #[error("remote document store unavailable: {0}")]
    Unavailable(String),

    #[error("remote request rejected: {0}")]
    Rejected(String),
}

/// Errors returned by folder and sync operations.
///
/// `InvalidName`, `NotFound`, `AlreadyExists` and `AlreadyPresent` are expected
/// outcomes of normal use and are meant to be shown to the user as notices.
#[derive(Debug, Error)]
pub enum FolderError {
    #[error("Folder name cannot be empty")]
    InvalidName,

    #[error("Folder \"{0}\" does not exist")]
    NotFound(String),

    #[error("Folder \"{0}\" has already been created")]
    AlreadyExists(String),

    #[error("App {package} has already been saved in folder \"{folder}\"")]
    AlreadyPresent { folder: String, package: String },

    #[error(transparent)]
    Persistence(#[from] StorageError),

    #[error("sync failed: {0}")]
    RemoteFailure(String),

    #[error("sync timed out after {0:?}")]
    Timeout(Duration),
}

impl FolderError {
    /// Whether this is a structural outcome rather than an infrastructure failure.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            FolderError::InvalidName
                | FolderError::NotFound(_)
                | FolderError::AlreadyExists(_)
                | FolderError::AlreadyPresent { .. }
        )
    }
}

impl From<RemoteError> for FolderError {
    fn from(e: RemoteError) -> Self {
        FolderError::RemoteFailure(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FolderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_errors_are_expected() {
        assert!(FolderError::InvalidName.is_expected());
        assert!(FolderError::NotFound("Work".into()).is_expected());
        assert!(FolderError::AlreadyExists("Work".into()).is_expected());
        assert!(FolderError::AlreadyPresent {
            folder: "Work".into(),
            package: "com.a".into(),
        }
        .is_expected());
    }

    #[test]
    fn test_infrastructure_errors_are_not_expected() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert!(!FolderError::from(StorageError::from(io)).is_expected());
        assert!(!FolderError::Timeout(Duration::from_secs(1)).is_expected());
        assert!(!FolderError::from(RemoteError::Unauthenticated).is_expected());
    }

    #[test]
    fn test_remote_error_message_is_kept() {
        let err = FolderError::from(RemoteError::Unavailable("offline".into()));
        assert_eq!(err.to_string(), "sync failed: remote document store unavailable: offline");
    }
}
