//! Full login flow against a real loopback callback server.
//!
//! The browser double follows the `redirect` parameter of the authorization
//! URL the way the website would after a successful sign-in.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use pfw_auth_engine::{AuthError, AuthManager, BrowserOpener, CallbackServer};
use pfw_store::{FileSystem, InMemoryFileSystem, SequentialIds, Session};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use url::Url;

/// Redirects back to the callback with a fixed query string.
struct RedirectingBrowser {
    query: &'static str,
}

impl BrowserOpener for RedirectingBrowser {
    fn open(&self, url: &Url) -> pfw_auth_engine::Result<()> {
        let redirect = url
            .query_pairs()
            .find(|(key, _)| key == "redirect")
            .map(|(_, value)| Url::parse(&value).unwrap())
            .unwrap();
        let query = self.query;

        tokio::spawn(async move {
            let port = redirect.port().unwrap();
            let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
            let request = format!(
                "GET {}?{query} HTTP/1.1\r\nHost: 127.0.0.1:{port}\r\n\r\n",
                redirect.path()
            );
            stream.write_all(request.as_bytes()).await.unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).await.unwrap();
            assert!(response.starts_with("HTTP/1.1 200 OK"));
        });
        Ok(())
    }
}

/// Never redirects.
struct IdleBrowser;

impl BrowserOpener for IdleBrowser {
    fn open(&self, _url: &Url) -> pfw_auth_engine::Result<()> {
        Ok(())
    }
}

fn session() -> (Arc<InMemoryFileSystem>, Session) {
    let fs = Arc::new(InMemoryFileSystem::default());
    let session = Session::new(fs.clone(), Arc::new(SequentialIds::new()));
    (fs, session)
}

fn base() -> Url {
    Url::parse("https://www.pointfree.co").unwrap()
}

// ═══════════════════════════════════════════════════════════════════════
//  Happy path
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn login_saves_token_from_redirect() {
    let (fs, session) = session();
    let manager = AuthManager::new(
        Arc::new(CallbackServer::new()),
        Arc::new(RedirectingBrowser {
            query: "token=deadbeef",
        }),
    );

    let mut shown = None;
    let outcome = manager
        .login(&base(), &session, |url| shown = Some(url.clone()))
        .await
        .unwrap();

    let shown = shown.unwrap();
    assert_eq!(shown.path(), "/account/the-way/login");
    assert_eq!(outcome.token_path, Path::new("/Users/blob/.pfw/token"));
    assert_eq!(
        fs.to_string(),
        "Users/\n  blob/\n    .pfw/\n      machine \"00000000-0000-0000-0000-000000000000\"\n      token \"deadbeef\"\ntmp/"
    );
}

// ═══════════════════════════════════════════════════════════════════════
//  Failures
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn redirect_without_token_fails_and_writes_nothing() {
    let (fs, session) = session();
    let manager = AuthManager::new(
        Arc::new(CallbackServer::new()),
        Arc::new(RedirectingBrowser {
            query: "error=access_denied",
        }),
    );

    let err = manager.login(&base(), &session, |_| {}).await.unwrap_err();
    assert!(matches!(err, AuthError::Validation { .. }), "{err}");
    assert!(!fs.exists(Path::new("/Users/blob/.pfw/token")));
}

#[tokio::test]
async fn login_times_out_without_redirect() {
    let (fs, session) = session();
    let manager = AuthManager::new(
        Arc::new(CallbackServer::with_timeouts(
            Duration::from_secs(5),
            Duration::from_millis(100),
        )),
        Arc::new(IdleBrowser),
    );

    let err = manager.login(&base(), &session, |_| {}).await.unwrap_err();
    assert!(matches!(err, AuthError::Timeout { .. }), "{err}");
    assert!(!fs.exists(Path::new("/Users/blob/.pfw")));
}
