//! CLI argument definitions for pfw.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! bootstrapping and dispatch.

use clap::{Parser, Subcommand, ValueEnum};
use pfw_skills::Tool;

/// pfw -- install Point-Free skills for AI coding tools.
#[derive(Parser, Debug)]
#[command(
    name = "pfw",
    version,
    about = "Log in to Point-Free and install skills for AI coding tools"
)]
pub struct Cli {
    /// Print debug logs to stderr.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Log in through the browser and save the token.
    Login,

    /// Download the skills and install them for a tool.
    Install {
        /// Tool to install the skills for.
        #[arg(long, value_enum)]
        tool: ToolArg,
    },

    /// Log out and remove the stored token.
    Logout {
        /// Remove the whole data directory, including the machine identifier.
        #[arg(long)]
        clean: bool,
    },

    /// Show login state and install locations.
    Status,

    /// Print the version.
    Version,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolArg {
    Codex,
    Claude,
}

impl From<ToolArg> for Tool {
    fn from(arg: ToolArg) -> Self {
        match arg {
            ToolArg::Codex => Tool::Codex,
            ToolArg::Claude => Tool::Claude,
        }
    }
}
