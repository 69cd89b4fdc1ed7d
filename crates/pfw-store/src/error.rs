//! Store error types.
//!
//! All store subsystems surface errors through [`StoreError`], the single
//! error type returned by every public API in this crate.

use std::path::PathBuf;

/// Unified error type for the pfw store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    // -- Filesystem errors --------------------------------------------------
    /// The file or directory does not exist.
    #[error("no such file or directory: {}", path.display())]
    NotFound { path: PathBuf },

    /// A write targeted a directory that has not been created.
    #[error("directory not found: {}", path.display())]
    DirectoryNotFound { path: PathBuf },

    /// An exclusive create found an existing entry.
    #[error("already exists: {}", path.display())]
    AlreadyExists { path: PathBuf },

    /// An underlying I/O operation failed.
    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The user's home directory could not be determined.
    #[error("unable to determine the home directory")]
    HomeDirUnavailable,

    // -- Archive errors -----------------------------------------------------
    /// The archive could not be decoded.
    #[error("invalid archive: {reason}")]
    InvalidArchive { reason: String },

    /// An archive entry would land outside the extraction root.
    #[error("unsafe archive entry `{entry}`: {reason}")]
    UnsafeEntry { entry: String, reason: String },

    // -- Session errors -----------------------------------------------------
    /// Refused to persist an empty credential.
    #[error("refusing to save an empty token")]
    EmptyToken,

    /// Refused to persist a credential with leading or trailing whitespace.
    #[error("refusing to save a token with surrounding whitespace")]
    MalformedToken,

    /// No credential has been persisted.
    #[error("not logged in: no token at {}", path.display())]
    NotLoggedIn { path: PathBuf },
}

impl StoreError {
    /// Wrap an [`std::io::Error`] with the path it concerns.
    ///
    /// `NotFound` and `AlreadyExists` kinds are mapped onto their typed
    /// variants so callers can match on them without inspecting the source.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists { path },
            _ => Self::Io { path, source },
        }
    }

    /// Whether this error is an archive decoding or validation failure.
    pub fn is_archive_error(&self) -> bool {
        matches!(self, Self::InvalidArchive { .. } | Self::UnsafeEntry { .. })
    }
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_maps_not_found() {
        let err = StoreError::io(
            "/tmp/missing",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(err.to_string(), "no such file or directory: /tmp/missing");
    }

    #[test]
    fn io_keeps_other_kinds() {
        let err = StoreError::io(
            "/tmp/x",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn archive_errors_are_classified() {
        let err = StoreError::UnsafeEntry {
            entry: "../evil".into(),
            reason: "parent directory segment".into(),
        };
        assert!(err.is_archive_error());
        assert!(!StoreError::EmptyToken.is_archive_error());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StoreError>();
    }
}
