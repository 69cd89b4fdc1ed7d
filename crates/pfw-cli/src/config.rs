//! Configuration loading.
//!
//! Sources, lowest precedence first:
//!
//! 1. Built-in defaults.
//! 2. A TOML file: `$PFW_CONFIG`, else `<config dir>/pfw/config.toml`.
//! 3. Environment: `PFW_BASE_URL`, `PFW_HOME`, `PFW_CALLBACK_TIMEOUT_SECS`.
//!
//! ```toml
//! base_url = "https://www.pointfree.co"
//! home = "/Users/blob"
//! callback_startup_timeout_secs = 10
//! callback_timeout_secs = 120
//! http_timeout_secs = 60
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::{CliError, Result};

pub const DEFAULT_BASE_URL: &str = "https://www.pointfree.co";

pub const CONFIG_ENV: &str = "PFW_CONFIG";
pub const BASE_URL_ENV: &str = "PFW_BASE_URL";
pub const CALLBACK_TIMEOUT_ENV: &str = "PFW_CALLBACK_TIMEOUT_SECS";

/// Resolved configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Website root; login and download URLs are built below it.
    pub base_url: Url,
    /// Home directory override. `None` means the platform home.
    pub home: Option<PathBuf>,
    pub callback_startup_timeout: Duration,
    pub callback_timeout: Duration,
    pub http_timeout: Duration,
}

/// On-disk shape of the config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    base_url: Option<String>,
    home: Option<PathBuf>,
    callback_startup_timeout_secs: Option<u64>,
    callback_timeout_secs: Option<u64>,
    http_timeout_secs: Option<u64>,
}

impl Config {
    /// Load from the process environment and the config file it points at.
    pub fn load() -> Result<Self> {
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        let contents = match config_file(env(CONFIG_ENV), dirs::config_dir()) {
            Some((path, explicit)) => read_config_file(&path, explicit)?,
            None => None,
        };

        Self::from_sources(contents.as_deref(), env)
    }

    /// Merge defaults, the config file contents, and environment lookups.
    pub fn from_sources(file: Option<&str>, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let file: FileConfig = match file {
            Some(text) => toml::from_str(text).map_err(|e| CliError::Config {
                reason: format!("failed to parse config file: {e}"),
            })?,
            None => FileConfig::default(),
        };

        let base_url = env(BASE_URL_ENV)
            .or(file.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());

        let mut config = Self {
            base_url: parse_base_url(&base_url)?,
            home: env(pfw_store::HOME_ENV).map(PathBuf::from).or(file.home),
            callback_startup_timeout: pfw_auth_engine::DEFAULT_STARTUP_TIMEOUT,
            callback_timeout: pfw_auth_engine::DEFAULT_WAIT_TIMEOUT,
            http_timeout: pfw_skills::DEFAULT_HTTP_TIMEOUT,
        };

        if let Some(secs) = file.callback_startup_timeout_secs {
            config.callback_startup_timeout = seconds("callback_startup_timeout_secs", secs)?;
        }
        let callback_secs = match env(CALLBACK_TIMEOUT_ENV) {
            Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| CliError::Config {
                reason: format!("{CALLBACK_TIMEOUT_ENV} must be a whole number of seconds, got `{raw}`"),
            })?),
            None => file.callback_timeout_secs,
        };
        if let Some(secs) = callback_secs {
            config.callback_timeout = seconds("callback_timeout_secs", secs)?;
        }
        if let Some(secs) = file.http_timeout_secs {
            config.http_timeout = seconds("http_timeout_secs", secs)?;
        }

        Ok(config)
    }
}

/// Which file to read, and whether the user asked for it explicitly.
fn config_file(explicit: Option<String>, config_dir: Option<PathBuf>) -> Option<(PathBuf, bool)> {
    match explicit {
        Some(path) => Some((PathBuf::from(path), true)),
        None => config_dir.map(|dir| (dir.join("pfw").join("config.toml"), false)),
    }
}

/// A missing default file is fine; a missing explicit one is not.
fn read_config_file(path: &Path, explicit: bool) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            tracing::debug!(path = %path.display(), "configuration file loaded");
            Ok(Some(text))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !explicit => Ok(None),
        Err(e) => Err(CliError::Config {
            reason: format!("failed to read `{}`: {e}", path.display()),
        }),
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| CliError::Config {
        reason: format!("base_url `{raw}` is not a valid URL: {e}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CliError::Config {
            reason: format!("base_url `{raw}` must use http or https"),
        });
    }
    Ok(url)
}

fn seconds(key: &str, secs: u64) -> Result<Duration> {
    if secs == 0 {
        return Err(CliError::Config {
            reason: format!("{key} must be greater than zero"),
        });
    }
    Ok(Duration::from_secs(secs))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::from_sources(None, env(&[])).unwrap();
        assert_eq!(config.base_url.as_str(), "https://www.pointfree.co/");
        assert_eq!(config.home, None);
        assert_eq!(config.callback_startup_timeout, Duration::from_secs(10));
        assert_eq!(config.callback_timeout, Duration::from_secs(120));
        assert_eq!(config.http_timeout, Duration::from_secs(60));
    }

    #[test]
    fn file_values_apply() {
        let file = r#"
            base_url = "http://localhost:8080"
            home = "/srv/blob"
            callback_timeout_secs = 30
            http_timeout_secs = 5
        "#;
        let config = Config::from_sources(Some(file), env(&[])).unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:8080/");
        assert_eq!(config.home, Some(PathBuf::from("/srv/blob")));
        assert_eq!(config.callback_timeout, Duration::from_secs(30));
        assert_eq!(config.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn env_overrides_file() {
        let file = r#"
            base_url = "http://localhost:8080"
            home = "/srv/blob"
            callback_timeout_secs = 30
        "#;
        let config = Config::from_sources(
            Some(file),
            env(&[
                (BASE_URL_ENV, "https://staging.pointfree.co"),
                ("PFW_HOME", "/tmp/home"),
                (CALLBACK_TIMEOUT_ENV, "7"),
            ]),
        )
        .unwrap();
        assert_eq!(config.base_url.as_str(), "https://staging.pointfree.co/");
        assert_eq!(config.home, Some(PathBuf::from("/tmp/home")));
        assert_eq!(config.callback_timeout, Duration::from_secs(7));
    }

    #[test]
    fn invalid_values_are_config_errors() {
        let cases: [(Option<&str>, &[(&str, &str)]); 5] = [
            (Some("base_url = \"not a url\""), &[]),
            (Some("base_url = \"ftp://example.com\""), &[]),
            (Some("callback_timeout_secs = 0"), &[]),
            (Some("colour = \"blue\""), &[]),
            (None, &[(CALLBACK_TIMEOUT_ENV, "soon")]),
        ];
        for (file, vars) in cases {
            let err = Config::from_sources(file, env(vars)).unwrap_err();
            assert!(matches!(err, CliError::Config { .. }), "{err}");
        }
    }

    #[test]
    fn config_file_resolution() {
        assert_eq!(
            config_file(Some("/etc/pfw.toml".into()), Some(PathBuf::from("/home/blob/.config"))),
            Some((PathBuf::from("/etc/pfw.toml"), true))
        );
        assert_eq!(
            config_file(None, Some(PathBuf::from("/home/blob/.config"))),
            Some((PathBuf::from("/home/blob/.config/pfw/config.toml"), false))
        );
        assert_eq!(config_file(None, None), None);
    }

    #[test]
    fn missing_default_file_is_ignored_but_explicit_is_not() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("config.toml");
        assert_eq!(read_config_file(&missing, false).unwrap(), None);
        assert!(read_config_file(&missing, true).is_err());

        std::fs::write(&missing, "http_timeout_secs = 3").unwrap();
        assert_eq!(
            read_config_file(&missing, true).unwrap().as_deref(),
            Some("http_timeout_secs = 3")
        );
    }
}
