//! Core types for the skills subsystem.

use std::fmt;
use std::path::{Path, PathBuf};

/// Directory name the skills are installed under, inside a tool's skills
/// directory.
pub const INSTALL_DIR_NAME: &str = "the-point-free-way";

/// An AI coding tool that skills can be installed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Codex,
    Claude,
}

impl Tool {
    pub const ALL: [Tool; 2] = [Tool::Codex, Tool::Claude];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Codex => "codex",
            Self::Claude => "claude",
        }
    }

    /// `<home>/.<tool>/skills/the-point-free-way`.
    pub fn install_dir(self, home: &Path) -> PathBuf {
        home.join(format!(".{}", self.as_str()))
            .join("skills")
            .join(INSTALL_DIR_NAME)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_dir_is_hidden_tool_dir() {
        assert_eq!(
            Tool::Codex.install_dir(Path::new("/Users/blob")),
            PathBuf::from("/Users/blob/.codex/skills/the-point-free-way")
        );
        assert_eq!(
            Tool::Claude.install_dir(Path::new("/Users/blob")),
            PathBuf::from("/Users/blob/.claude/skills/the-point-free-way")
        );
    }

    #[test]
    fn display_matches_cli_name() {
        assert_eq!(Tool::Codex.to_string(), "codex");
        assert_eq!(Tool::Claude.to_string(), "claude");
        assert_eq!(Tool::ALL, [Tool::Codex, Tool::Claude]);
    }
}
