//! Capability wiring.
//!
//! [`App`] holds one handle per side effect pfw performs. [`App::live`]
//! builds the production set; tests assemble in-memory doubles directly.

use std::io::Write;
use std::sync::Arc;

use pfw_auth_engine::{Authenticator, BrowserOpener, CallbackServer, SystemBrowser};
use pfw_skills::{HttpSkillServer, SkillServer};
use pfw_store::{DiskFileSystem, FileSystem, IdSource, RandomIds, Session};
use url::Url;

use crate::cli::Commands;
use crate::commands;
use crate::config::Config;
use crate::error::Result;
use crate::whoami::{SystemWhoAmI, WhoAmI};

pub struct App {
    pub base_url: Url,
    pub fs: Arc<dyn FileSystem>,
    pub ids: Arc<dyn IdSource>,
    pub authenticator: Arc<dyn Authenticator>,
    pub browser: Arc<dyn BrowserOpener>,
    pub server: Arc<dyn SkillServer>,
    pub whoami: Arc<dyn WhoAmI>,
}

impl App {
    /// Real disk, real network, real browser.
    pub fn live(config: &Config) -> Result<Self> {
        let fs = match &config.home {
            Some(home) => DiskFileSystem::with_home(home.clone()),
            None => DiskFileSystem::new()?,
        };
        tracing::debug!(home = %fs.home_dir().display(), base_url = %config.base_url, "using live capabilities");

        Ok(Self {
            base_url: config.base_url.clone(),
            fs: Arc::new(fs),
            ids: Arc::new(RandomIds),
            authenticator: Arc::new(CallbackServer::with_timeouts(
                config.callback_startup_timeout,
                config.callback_timeout,
            )),
            browser: Arc::new(SystemBrowser),
            server: Arc::new(HttpSkillServer::new(
                config.base_url.clone(),
                config.http_timeout,
            )),
            whoami: Arc::new(SystemWhoAmI),
        })
    }

    pub fn session(&self) -> Session {
        Session::new(self.fs.clone(), self.ids.clone())
    }

    /// Execute `command`, writing user-facing output to `out`.
    pub async fn run(&self, command: &Commands, out: &mut dyn Write) -> Result<()> {
        tracing::debug!(?command, "running command");
        match command {
            Commands::Login => commands::login(self, out).await,
            Commands::Install { tool } => commands::install(self, (*tool).into(), out).await,
            Commands::Logout { clean } => commands::logout(self, *clean, out),
            Commands::Status => commands::status(self, out),
            Commands::Version => commands::version(out),
        }
    }
}
