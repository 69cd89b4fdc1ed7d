//! Error types for the skills subsystem.

use std::path::PathBuf;

/// Errors from downloading or installing skills.
#[derive(Debug, thiserror::Error)]
pub enum SkillError {
    /// The server rejected the credential (HTTP 401/403).
    #[error("not logged in{}", detail(.message))]
    NotLoggedIn { message: Option<String> },

    /// Any other non-success HTTP status.
    #[error("server error{}", detail(.message))]
    Server { message: Option<String> },

    /// The response was not usable.
    #[error("invalid response from server")]
    InvalidResponse,

    #[error("failed to download skills: {reason}")]
    DownloadFailed { reason: String },

    /// The archive was corrupt or contained an unsafe entry.
    #[error("failed to extract skills: {reason}")]
    ExtractionFailed { reason: String },

    #[error("failed to install skills into `{}`: {reason}", path.display())]
    InstallWriteFailed { path: PathBuf, reason: String },

    #[error(transparent)]
    Store(#[from] pfw_store::StoreError),
}

fn detail(message: &Option<String>) -> String {
    match message {
        Some(message) => format!(": {message}"),
        None => String::new(),
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, SkillError>;
