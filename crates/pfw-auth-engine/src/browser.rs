//! Launching the user's browser.

use std::process::{Command, Stdio};
use std::sync::Mutex;

use url::Url;

use crate::error::{AuthError, Result};

/// Opens a URL for the user.
pub trait BrowserOpener: Send + Sync {
    fn open(&self, url: &Url) -> Result<()>;
}

/// Hands the URL to the platform's default browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl SystemBrowser {
    fn command(url: &Url) -> Command {
        #[cfg(target_os = "macos")]
        {
            let mut cmd = Command::new("open");
            cmd.arg(url.as_str());
            cmd
        }
        #[cfg(target_os = "windows")]
        {
            // `start` is a cmd builtin; the empty string is the window title.
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", "start", ""]).arg(url.as_str());
            cmd
        }
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        {
            let mut cmd = Command::new("xdg-open");
            cmd.arg(url.as_str());
            cmd
        }
    }
}

impl BrowserOpener for SystemBrowser {
    fn open(&self, url: &Url) -> Result<()> {
        Self::command(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
            .map_err(|e| AuthError::Browser {
                reason: e.to_string(),
            })
    }
}

/// Records every URL instead of opening it.
#[derive(Debug, Default)]
pub struct RecordingBrowser {
    opened: Mutex<Vec<Url>>,
}

impl RecordingBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> Vec<Url> {
        self.opened
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

impl BrowserOpener for RecordingBrowser {
    fn open(&self, url: &Url) -> Result<()> {
        self.opened
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(url.clone());
        Ok(())
    }
}
