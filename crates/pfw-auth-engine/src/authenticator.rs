//! The seam between the login flow and whatever produces the token.

use std::sync::Mutex;

use async_trait::async_trait;
use url::Url;

use crate::error::{AuthError, Result};

/// A source of a login token delivered through a browser redirect.
///
/// [`crate::CallbackServer`] is the production implementation.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Begin listening and return the URL the browser should be sent back to.
    async fn start(&self) -> Result<Url>;

    /// Wait for the redirect and return the token it carried.
    async fn wait_for_token(&self) -> Result<String>;
}

/// Test double that answers immediately with a canned outcome.
pub struct StaticAuthenticator {
    redirect: Url,
    outcome: Mutex<Option<std::result::Result<String, String>>>,
}

impl StaticAuthenticator {
    /// Deliver `token` on the first wait.
    pub fn new(redirect: Url, token: impl Into<String>) -> Self {
        Self {
            redirect,
            outcome: Mutex::new(Some(Ok(token.into()))),
        }
    }

    /// Fail the first wait with [`AuthError::Validation`].
    pub fn failing(redirect: Url, reason: impl Into<String>) -> Self {
        Self {
            redirect,
            outcome: Mutex::new(Some(Err(reason.into()))),
        }
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn start(&self) -> Result<Url> {
        Ok(self.redirect.clone())
    }

    async fn wait_for_token(&self) -> Result<String> {
        let outcome = self
            .outcome
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take()
            .ok_or(AuthError::NotStarted)?;
        outcome.map_err(|reason| AuthError::Validation { reason })
    }
}
