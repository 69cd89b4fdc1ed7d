//! Skill download and installation for pfw.
//!
//! Skills arrive as a single ZIP archive from the website's download
//! endpoint ([`SkillServer`]) and are installed into a tool-specific
//! directory ([`Tool::install_dir`]) by the [`Installer`], which swaps the
//! new tree in only after it has been fully extracted.

pub mod error;
pub mod installer;
pub mod server;
pub mod types;

pub use error::{Result, SkillError};
pub use installer::Installer;
pub use server::{DEFAULT_HTTP_TIMEOUT, DownloadRequest, HttpSkillServer, InMemorySkillServer, SkillServer};
pub use types::{INSTALL_DIR_NAME, Tool};
