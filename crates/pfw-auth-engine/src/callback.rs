//! Single-use loopback HTTP server that receives the login redirect.
//!
//! [`CallbackServer::start`] binds `127.0.0.1:0` and hands the accept loop to
//! a spawned task that owns the listener. That task serves exactly one
//! connection, answers the browser with a small HTML page, drops the
//! listener, and only then publishes the outcome on a oneshot channel. The
//! channel buffers the outcome, so a redirect that lands before
//! [`CallbackServer::wait_for_token`] is called is not lost.
//!
//! The redirect looks like `GET /callback?token=<value> HTTP/1.1`.

use std::net::Ipv4Addr;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use url::Url;

use crate::authenticator::Authenticator;
use crate::error::{AuthError, Result};

/// Default bound on binding the listener.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on waiting for the browser redirect.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(120);

/// Path the browser is redirected to.
pub const CALLBACK_PATH: &str = "/callback";

/// Redirect requests are tiny; anything longer is truncated.
const MAX_REQUEST_BYTES: usize = 8_192;

const SUCCESS_MESSAGE: &str = "Login complete. You can return to the terminal.";
const FAILURE_MESSAGE: &str = "Login failed. Please return to the terminal.";

/// Token on success, failure reason otherwise.
type Outcome = std::result::Result<String, String>;

enum Phase {
    Idle,
    Binding,
    Listening {
        outcome: oneshot::Receiver<Outcome>,
        task: JoinHandle<()>,
    },
    Finished,
}

/// Loopback listener for one login attempt.
pub struct CallbackServer {
    startup_timeout: Duration,
    wait_timeout: Duration,
    phase: Mutex<Phase>,
}

impl CallbackServer {
    pub fn new() -> Self {
        Self::with_timeouts(DEFAULT_STARTUP_TIMEOUT, DEFAULT_WAIT_TIMEOUT)
    }

    pub fn with_timeouts(startup_timeout: Duration, wait_timeout: Duration) -> Self {
        Self {
            startup_timeout,
            wait_timeout,
            phase: Mutex::new(Phase::Idle),
        }
    }

    fn set_phase(&self, phase: Phase) {
        *self.phase.lock().unwrap_or_else(|p| p.into_inner()) = phase;
    }

    /// Bind the listener and return `http://127.0.0.1:<port>/callback`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Bind`] if the socket cannot be bound within the startup
    ///   timeout.
    /// - [`AuthError::AlreadyStarted`] on a second call.
    pub async fn start(&self) -> Result<Url> {
        {
            let mut phase = self.phase.lock().unwrap_or_else(|p| p.into_inner());
            if !matches!(*phase, Phase::Idle) {
                return Err(AuthError::AlreadyStarted);
            }
            *phase = Phase::Binding;
        }

        let bound = tokio::time::timeout(
            self.startup_timeout,
            TcpListener::bind((Ipv4Addr::LOCALHOST, 0)),
        )
        .await;

        let listener = match bound {
            Ok(Ok(listener)) => listener,
            Ok(Err(e)) => {
                self.set_phase(Phase::Finished);
                return Err(AuthError::Bind {
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                self.set_phase(Phase::Finished);
                return Err(AuthError::Bind {
                    reason: format!(
                        "listener was not ready after {}s",
                        self.startup_timeout.as_secs()
                    ),
                });
            }
        };

        let port = match listener.local_addr() {
            Ok(addr) => addr.port(),
            Err(e) => {
                self.set_phase(Phase::Finished);
                return Err(AuthError::Bind {
                    reason: format!("unable to determine callback port: {e}"),
                });
            }
        };

        let (tx, rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let outcome = serve_once(&listener).await;
            // Close the socket before anyone can observe the outcome.
            drop(listener);
            let _ = tx.send(outcome);
        });

        self.set_phase(Phase::Listening { outcome: rx, task });
        tracing::info!(port, "callback server listening");

        Ok(Url::parse(&format!("http://127.0.0.1:{port}{CALLBACK_PATH}"))?)
    }

    /// Wait for the single redirect and return its token.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Validation`] if the redirect was malformed or carried
    ///   no token.
    /// - [`AuthError::Timeout`] if nothing arrived within the wait timeout;
    ///   the listener is shut down.
    /// - [`AuthError::NotStarted`] if the server is not listening.
    pub async fn wait_for_token(&self) -> Result<String> {
        let (outcome, task) = {
            let mut phase = self.phase.lock().unwrap_or_else(|p| p.into_inner());
            match std::mem::replace(&mut *phase, Phase::Finished) {
                Phase::Listening { outcome, task } => (outcome, task),
                other => {
                    *phase = other;
                    return Err(AuthError::NotStarted);
                }
            }
        };

        match tokio::time::timeout(self.wait_timeout, outcome).await {
            Ok(Ok(Ok(token))) => {
                tracing::info!("login redirect received");
                Ok(token)
            }
            Ok(Ok(Err(reason))) => {
                tracing::warn!(reason = %reason, "login redirect rejected");
                Err(AuthError::Validation { reason })
            }
            Ok(Err(_)) => Err(AuthError::Validation {
                reason: "callback server stopped without a result".into(),
            }),
            Err(_) => {
                task.abort();
                // Wait for the abort so the port is released on return.
                let _ = task.await;
                tracing::warn!(
                    waited_secs = self.wait_timeout.as_secs(),
                    "gave up waiting for login redirect"
                );
                Err(AuthError::Timeout {
                    waited: self.wait_timeout,
                })
            }
        }
    }
}

impl Default for CallbackServer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        let phase = self.phase.get_mut().unwrap_or_else(|p| p.into_inner());
        if let Phase::Listening { task, .. } = phase {
            task.abort();
        }
    }
}

#[async_trait]
impl Authenticator for CallbackServer {
    async fn start(&self) -> Result<Url> {
        CallbackServer::start(self).await
    }

    async fn wait_for_token(&self) -> Result<String> {
        CallbackServer::wait_for_token(self).await
    }
}

// ---------------------------------------------------------------------------
// Connection handling
// ---------------------------------------------------------------------------

/// Accept one connection, answer it, and return what it carried.
async fn serve_once(listener: &TcpListener) -> Outcome {
    let (mut stream, peer) = listener
        .accept()
        .await
        .map_err(|e| format!("failed to accept callback connection: {e}"))?;

    tracing::debug!(peer = %peer, "accepted callback connection");

    let outcome = match read_request_head(&mut stream).await {
        Ok(raw) => match std::str::from_utf8(&raw) {
            Ok(request) => parse_callback_request(request),
            Err(_) => Err("request is not valid UTF-8".to_owned()),
        },
        Err(e) => Err(format!("failed to read request: {e}")),
    };

    let message = if outcome.is_ok() {
        SUCCESS_MESSAGE
    } else {
        FAILURE_MESSAGE
    };
    if let Err(e) = send_page(&mut stream, message).await {
        tracing::warn!(error = %e, "failed to answer the browser");
    }

    outcome
}

/// Read until the end of the request headers, EOF, or the size cap.
///
/// Draining the headers keeps the kernel from resetting the connection
/// while the response is still in flight.
async fn read_request_head(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    while buf.len() < MAX_REQUEST_BYTES {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }

    buf.truncate(MAX_REQUEST_BYTES);
    Ok(buf)
}

async fn send_page(stream: &mut TcpStream, message: &str) -> std::io::Result<()> {
    let body = format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>pfw</title></head>\
         <body><p>{message}</p></body></html>\n"
    );
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );

    stream.write_all(response.as_bytes()).await?;
    stream.flush().await?;
    stream.shutdown().await
}

/// Extract the token from the request line `GET /callback?token=<value> HTTP/1.1`.
///
/// Query values are percent-decoded. An empty token counts as missing.
fn parse_callback_request(request: &str) -> Outcome {
    let request_line = request
        .lines()
        .next()
        .filter(|line| !line.trim().is_empty())
        .ok_or_else(|| "empty HTTP request".to_owned())?;

    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        return Err(format!("malformed HTTP request line: {request_line}"));
    };

    if method != "GET" {
        return Err(format!("unexpected method {method}"));
    }

    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    if path != CALLBACK_PATH {
        return Err(format!("unexpected path {path}"));
    }

    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
        .filter(|token| !token.is_empty())
        .ok_or_else(|| "missing token in redirect".to_owned())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
