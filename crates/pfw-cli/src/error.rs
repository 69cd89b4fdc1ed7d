//! Error types for the pfw command.
//!
//! Every failure a command can hit is folded into [`CliError`], whose
//! `Display` is the single line printed to stderr.

use pfw_auth_engine::AuthError;
use pfw_skills::SkillError;
use pfw_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// No usable token on disk.
    #[error("No token found. Run pfw login first.")]
    NotLoggedIn,

    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Skill(SkillError),
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotLoggedIn { .. } => Self::NotLoggedIn,
            other => Self::Store(other),
        }
    }
}

impl From<SkillError> for CliError {
    fn from(err: SkillError) -> Self {
        match err {
            SkillError::Store(store) => store.into(),
            other => Self::Skill(other),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn not_logged_in_message() {
        let err: CliError = StoreError::NotLoggedIn {
            path: PathBuf::from("/Users/blob/.pfw/token"),
        }
        .into();
        assert_eq!(err.to_string(), "No token found. Run pfw login first.");
    }

    #[test]
    fn skill_errors_pass_through() {
        let err: CliError = SkillError::Server {
            message: Some("maintenance".into()),
        }
        .into();
        assert_eq!(err.to_string(), "server error: maintenance");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CliError>();
    }
}
