//! Remote skill source: the server endpoint that hands out the skills
//! archive to logged-in users.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;
use uuid::Uuid;

use crate::error::{Result, SkillError};

/// Path of the download endpoint, relative to the site root.
const DOWNLOAD_PATH: &str = "account/the-way/download";

/// Default request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Source of the skills archive.
#[async_trait]
pub trait SkillServer: Send + Sync {
    /// Fetch the archive for `token`, tagged with the machine identifier and
    /// the local username.
    async fn download_skills(&self, token: &str, machine: Uuid, whoami: &str) -> Result<Vec<u8>>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// [`SkillServer`] talking to the website over HTTPS.
pub struct HttpSkillServer {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpSkillServer {
    pub fn new(base_url: Url, timeout: Duration) -> Self {
        Self {
            base_url,
            http: reqwest::Client::builder()
                .user_agent(concat!("pfw/", env!("CARGO_PKG_VERSION")))
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    /// `<base>/account/the-way/download?token=…&machine=…&whoami=…`.
    pub fn download_url(&self, token: &str, machine: Uuid, whoami: &str) -> Result<Url> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut url = base
            .join(DOWNLOAD_PATH)
            .map_err(|e| SkillError::DownloadFailed {
                reason: format!("invalid base url: {e}"),
            })?;
        url.query_pairs_mut()
            .clear()
            .append_pair("token", token)
            .append_pair("machine", &machine.to_string())
            .append_pair("whoami", whoami);
        Ok(url)
    }
}

#[async_trait]
impl SkillServer for HttpSkillServer {
    async fn download_skills(&self, token: &str, machine: Uuid, whoami: &str) -> Result<Vec<u8>> {
        let url = self.download_url(token, machine, whoami)?;
        // The query carries the token; log the endpoint only.
        tracing::debug!(endpoint = %url.path(), machine = %machine, "downloading skills");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        tracing::debug!(status = %status, "download response");

        if status.is_success() {
            let bytes = response
                .bytes()
                .await
                .map_err(|_| SkillError::InvalidResponse)?;
            return Ok(bytes.to_vec());
        }

        let message = response
            .text()
            .await
            .ok()
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty());

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(SkillError::NotLoggedIn { message })
            }
            _ => Err(SkillError::Server { message }),
        }
    }
}

/// Failing to reach the server is a download failure; anything the server
/// said that was not usable HTTP is an invalid response.
fn classify_send_error(e: reqwest::Error) -> SkillError {
    if e.is_connect() || e.is_timeout() || e.is_builder() {
        // The URL carries the token.
        SkillError::DownloadFailed {
            reason: e.without_url().to_string(),
        }
    } else {
        tracing::debug!(error = %e.without_url(), "unusable response from server");
        SkillError::InvalidResponse
    }
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// A request seen by [`InMemorySkillServer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub token: String,
    pub machine: Uuid,
    pub whoami: String,
}

/// Replays queued results in order, then fails with
/// [`SkillError::InvalidResponse`].
#[derive(Default)]
pub struct InMemorySkillServer {
    results: Mutex<VecDeque<Result<Vec<u8>>>>,
    requests: Mutex<Vec<DownloadRequest>>,
}

impl InMemorySkillServer {
    pub fn new(results: impl IntoIterator<Item = Result<Vec<u8>>>) -> Self {
        Self {
            results: Mutex::new(results.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Serve `archive` once.
    pub fn with_archive(archive: Vec<u8>) -> Self {
        Self::new([Ok(archive)])
    }

    pub fn requests(&self) -> Vec<DownloadRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

#[async_trait]
impl SkillServer for InMemorySkillServer {
    async fn download_skills(&self, token: &str, machine: Uuid, whoami: &str) -> Result<Vec<u8>> {
        self.requests
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(DownloadRequest {
                token: token.to_owned(),
                machine,
                whoami: whoami.to_owned(),
            });

        self.results
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front()
            .unwrap_or(Err(SkillError::InvalidResponse))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
