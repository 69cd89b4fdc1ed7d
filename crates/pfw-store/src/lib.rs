//! Persistence layer for pfw.
//!
//! # Modules
//!
//! - [`fs`]: the [`FileSystem`] capability and its disk-backed implementation.
//! - [`memory_fs`]: an in-memory [`FileSystem`] for tests.
//! - [`archive`]: ZIP decoding with path-traversal defense.
//! - [`session`]: the persisted token and machine identifier.
//! - [`ids`]: identifier sources.
//! - [`error`]: unified error type.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use pfw_store::{DiskFileSystem, RandomIds, Session};
//!
//! # fn example() -> pfw_store::Result<()> {
//! let session = Session::new(Arc::new(DiskFileSystem::new()?), Arc::new(RandomIds));
//! let machine = session.save("deadbeef")?;
//! assert_eq!(session.load()?, "deadbeef");
//! assert_eq!(session.machine_id()?, machine);
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod error;
pub mod fs;
pub mod ids;
pub mod memory_fs;
pub mod session;

pub use archive::{ArchiveEntry, EntryKind, read_archive};
pub use error::{Result, StoreError};
pub use fs::{DiskFileSystem, FileSystem, HOME_ENV};
pub use ids::{IdSource, RandomIds, SequentialIds};
pub use memory_fs::InMemoryFileSystem;
pub use session::{DATA_DIR_NAME, DataLayout, Session};
