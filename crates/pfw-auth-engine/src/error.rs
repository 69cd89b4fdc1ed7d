//! Error types for the auth engine crate.
//!
//! All auth engine operations surface errors through [`AuthError`]. Each
//! variant carries enough context for the CLI to print a single line.

use std::time::Duration;

/// Unified error type for the pfw auth engine.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The loopback listener could not be created or did not become ready.
    #[error("failed to start the login callback server: {reason}")]
    Bind {
        /// Why binding failed.
        reason: String,
    },

    /// The browser redirect was malformed or carried no token.
    #[error("login failed: {reason}")]
    Validation {
        /// What was wrong with the redirect.
        reason: String,
    },

    /// No redirect arrived before the wait timeout.
    #[error("timed out after {}s waiting for the browser to redirect back", waited.as_secs())]
    Timeout {
        /// How long we waited before giving up.
        waited: Duration,
    },

    /// `wait_for_token` was called without a running listener.
    #[error("the login callback server is not running")]
    NotStarted,

    /// `start` was called on a server that already ran.
    #[error("the login callback server was already started")]
    AlreadyStarted,

    /// The system browser could not be launched.
    #[error("failed to open the browser: {reason}")]
    Browser {
        /// Launcher error.
        reason: String,
    },

    /// A login URL could not be built.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Persisting the session failed.
    #[error(transparent)]
    Store(#[from] pfw_store::StoreError),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, AuthError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
