//! End-to-end browser login.
//!
//! The [`AuthManager`] wires an [`Authenticator`] to a [`BrowserOpener`]
//! and persists whatever token comes back into the [`Session`].

use std::path::PathBuf;
use std::sync::Arc;

use pfw_store::Session;
use url::Url;
use uuid::Uuid;

use crate::authenticator::Authenticator;
use crate::browser::BrowserOpener;
use crate::error::Result;

/// Path of the login page, relative to the site root.
const LOGIN_PATH: &str = "account/the-way/login";

/// Query parameter that carries the loopback redirect URL.
const REDIRECT_PARAM: &str = "redirect";

/// What a successful login left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    /// Where the token was written.
    pub token_path: PathBuf,
    /// Machine identifier sent with subsequent downloads.
    pub machine: Uuid,
}

/// Build `<base>/account/the-way/login?redirect=<redirect>`.
///
/// A base URL with a path prefix keeps it, with or without a trailing slash.
pub fn authorization_url(base_url: &Url, redirect: &Url) -> Result<Url> {
    let mut base = base_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    let mut url = base.join(LOGIN_PATH)?;
    url.query_pairs_mut()
        .clear()
        .append_pair(REDIRECT_PARAM, redirect.as_str());
    Ok(url)
}

/// Orchestrates the browser login.
pub struct AuthManager {
    authenticator: Arc<dyn Authenticator>,
    browser: Arc<dyn BrowserOpener>,
}

impl AuthManager {
    pub fn new(authenticator: Arc<dyn Authenticator>, browser: Arc<dyn BrowserOpener>) -> Self {
        Self {
            authenticator,
            browser,
        }
    }

    /// Run the login flow and persist the resulting token.
    ///
    /// `notify` receives the authorization URL before the browser is asked to
    /// open it, so the user can copy it if no browser appears. A browser that
    /// fails to launch is not fatal.
    ///
    /// # Errors
    ///
    /// Propagates callback server failures (bind, validation, timeout) and
    /// session persistence failures.
    pub async fn login(
        &self,
        base_url: &Url,
        session: &Session,
        notify: impl FnOnce(&Url),
    ) -> Result<LoginOutcome> {
        let redirect = self.authenticator.start().await?;
        let url = authorization_url(base_url, &redirect)?;
        tracing::debug!(redirect = %redirect, url = %url, "login started");

        notify(&url);
        if let Err(e) = self.browser.open(&url) {
            tracing::warn!(error = %e, "could not open the browser; open the URL manually");
        }

        let token = self.authenticator.wait_for_token().await?;
        let machine = session.save(&token)?;

        tracing::info!(machine = %machine, "login completed");
        Ok(LoginOutcome {
            token_path: session.token_path(),
            machine,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authenticator::StaticAuthenticator;
    use crate::browser::RecordingBrowser;
    use crate::error::AuthError;
    use pfw_store::{FileSystem, InMemoryFileSystem, SequentialIds};
    use std::path::Path;

    fn redirect() -> Url {
        Url::parse("http://127.0.0.1:4242/callback").unwrap()
    }

    fn base() -> Url {
        Url::parse("https://www.pointfree.co").unwrap()
    }

    #[test]
    fn authorization_url_encodes_redirect() {
        let url = authorization_url(&base(), &redirect()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.pointfree.co/account/the-way/login?redirect=http%3A%2F%2F127.0.0.1%3A4242%2Fcallback"
        );
    }

    #[test]
    fn authorization_url_keeps_base_path() {
        let base = Url::parse("http://localhost:8080/staging").unwrap();
        let url = authorization_url(&base, &redirect()).unwrap();
        assert_eq!(url.path(), "/staging/account/the-way/login");
    }

    #[tokio::test]
    async fn login_persists_token_and_machine() {
        let fs = Arc::new(InMemoryFileSystem::default());
        let session = Session::new(fs.clone(), Arc::new(SequentialIds::new()));
        let browser = Arc::new(RecordingBrowser::new());
        let manager = AuthManager::new(
            Arc::new(StaticAuthenticator::new(redirect(), "deadbeef")),
            browser.clone(),
        );

        let mut notified = None;
        let outcome = manager
            .login(&base(), &session, |url| notified = Some(url.clone()))
            .await
            .unwrap();

        assert_eq!(outcome.token_path, Path::new("/Users/blob/.pfw/token"));
        assert_eq!(
            outcome.machine.to_string(),
            "00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(fs.read(&outcome.token_path).unwrap(), b"deadbeef");
        assert_eq!(browser.opened(), vec![notified.unwrap()]);
    }

    #[tokio::test]
    async fn failed_redirect_writes_nothing() {
        let fs = Arc::new(InMemoryFileSystem::default());
        let session = Session::new(fs.clone(), Arc::new(SequentialIds::new()));
        let manager = AuthManager::new(
            Arc::new(StaticAuthenticator::failing(redirect(), "missing token in redirect")),
            Arc::new(RecordingBrowser::new()),
        );

        let err = manager.login(&base(), &session, |_| {}).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation { .. }));
        assert!(!fs.exists(Path::new("/Users/blob/.pfw")));
    }
}
