//! The local username sent along with downloads.

use std::process::{Command, Stdio};

/// Reports the name of the local user.
pub trait WhoAmI: Send + Sync {
    fn whoami(&self) -> String;
}

/// Asks `whoami`, then the environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemWhoAmI;

impl WhoAmI for SystemWhoAmI {
    fn whoami(&self) -> String {
        from_command()
            .or_else(from_env)
            .unwrap_or_else(|| "unknown".to_owned())
    }
}

fn from_command() -> Option<String> {
    let output = Command::new("whoami")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    non_empty(String::from_utf8_lossy(&output.stdout).as_ref())
}

fn from_env() -> Option<String> {
    ["USER", "USERNAME"]
        .iter()
        .find_map(|key| std::env::var(key).ok().and_then(|v| non_empty(&v)))
}

fn non_empty(value: &str) -> Option<String> {
    // `whoami` on Windows prints `DOMAIN\user`.
    let value = value.trim();
    let value = value.rsplit('\\').next().unwrap_or(value);
    (!value.is_empty()).then(|| value.to_owned())
}

/// Always answers with the same name.
#[derive(Debug, Clone)]
pub struct FixedWhoAmI(pub String);

impl FixedWhoAmI {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl WhoAmI for FixedWhoAmI {
    fn whoami(&self) -> String {
        self.0.clone()
    }
}
