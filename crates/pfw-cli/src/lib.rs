//! The `pfw` command.
//!
//! Split into a library so the commands can be driven in-process by tests
//! with in-memory capabilities; `main.rs` only bootstraps logging and
//! configuration.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod whoami;

pub use app::App;
pub use cli::{Cli, Commands, ToolArg};
pub use config::Config;
pub use error::{CliError, Result};
pub use whoami::{FixedWhoAmI, SystemWhoAmI, WhoAmI};
