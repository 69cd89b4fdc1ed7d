//! Capability-scoped filesystem interface.
//!
//! Everything pfw persists goes through the [`FileSystem`] trait so commands
//! can run against the real disk ([`DiskFileSystem`]) or an in-memory double
//! ([`crate::InMemoryFileSystem`]) in tests.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::archive::{EntryKind, read_archive};
use crate::error::{Result, StoreError};

/// Environment variable overriding the home directory.
pub const HOME_ENV: &str = "PFW_HOME";

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Filesystem operations used by pfw.
///
/// Implementations must be `Send + Sync` so they can be shared across the
/// async tasks of a single invocation.
pub trait FileSystem: Send + Sync {
    /// Home directory of the current user.
    fn home_dir(&self) -> PathBuf;

    /// Directory for scratch files.
    fn temp_dir(&self) -> PathBuf;

    /// Create `path` and all missing parents.
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Remove a file or a whole directory tree.
    ///
    /// Returns [`StoreError::NotFound`] if nothing exists at `path`.
    fn remove(&self, path: &Path) -> Result<()>;

    fn exists(&self, path: &Path) -> bool;

    /// Write `data` to `path`, replacing any existing file.
    ///
    /// The parent directory must already exist.
    fn write(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Create `path` with `data`, failing with [`StoreError::AlreadyExists`]
    /// if it already exists.
    fn write_new(&self, path: &Path, data: &[u8]) -> Result<()>;

    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Move a file or directory. The destination must not exist.
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Extract the ZIP archive at `archive` into `destination`.
    ///
    /// Every entry is validated before the first write, so an unsafe archive
    /// leaves `destination` untouched.
    fn unzip(&self, archive: &Path, destination: &Path) -> Result<()> {
        let bytes = self.read(archive)?;
        let entries = read_archive(&bytes)?;

        self.create_dir_all(destination)?;
        for entry in entries {
            let target = destination.join(&entry.path);
            match entry.kind {
                EntryKind::Directory => self.create_dir_all(&target)?,
                EntryKind::File(data) => {
                    if let Some(parent) = target.parent() {
                        self.create_dir_all(parent)?;
                    }
                    self.write(&target, &data)?;
                }
            }
        }

        tracing::debug!(
            archive = %archive.display(),
            destination = %destination.display(),
            "archive extracted"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Disk implementation
// ---------------------------------------------------------------------------

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Clone)]
pub struct DiskFileSystem {
    home: PathBuf,
    temp: PathBuf,
}

impl DiskFileSystem {
    /// Use the platform home directory, or `$PFW_HOME` when set.
    pub fn new() -> Result<Self> {
        let home = std::env::var_os(HOME_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(dirs::home_dir)
            .ok_or(StoreError::HomeDirUnavailable)?;
        Ok(Self::with_home(home))
    }

    /// Use an explicit home directory.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            temp: std::env::temp_dir(),
        }
    }

    /// Override the scratch directory.
    pub fn with_temp_dir(mut self, temp: impl Into<PathBuf>) -> Self {
        self.temp = temp.into();
        self
    }

    /// Sibling path used for write-then-rename.
    fn staging_path(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::new_v4()))
    }

    fn create_exclusive(path: &Path, data: &[u8]) -> Result<()> {
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path).map_err(|e| StoreError::io(path, e))?;
        file.write_all(data).map_err(|e| StoreError::io(path, e))?;
        file.sync_all().map_err(|e| StoreError::io(path, e))?;
        Ok(())
    }

    fn require_parent(path: &Path) -> Result<()> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
                Err(StoreError::DirectoryNotFound {
                    path: parent.to_path_buf(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl FileSystem for DiskFileSystem {
    fn home_dir(&self) -> PathBuf {
        self.home.clone()
    }

    fn temp_dir(&self) -> PathBuf {
        self.temp.clone()
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path).map_err(|e| StoreError::io(path, e))
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let metadata = std::fs::symlink_metadata(path).map_err(|e| StoreError::io(path, e))?;
        let result = if metadata.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        };
        result.map_err(|e| StoreError::io(path, e))
    }

    fn exists(&self, path: &Path) -> bool {
        std::fs::symlink_metadata(path).is_ok()
    }

    fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        Self::require_parent(path)?;

        // Write to a private sibling, then swap it in, so readers never see
        // a half-written file.
        let staging = Self::staging_path(path);
        if let Err(e) = Self::create_exclusive(&staging, data) {
            let _ = std::fs::remove_file(&staging);
            return Err(e);
        }
        std::fs::rename(&staging, path).map_err(|e| {
            let _ = std::fs::remove_file(&staging);
            StoreError::io(path, e)
        })
    }

    fn write_new(&self, path: &Path, data: &[u8]) -> Result<()> {
        Self::require_parent(path)?;
        Self::create_exclusive(path, data).inspect_err(|e| {
            if !matches!(e, StoreError::AlreadyExists { .. }) {
                let _ = std::fs::remove_file(path);
            }
        })
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|e| StoreError::io(path, e))
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        if self.exists(to) {
            return Err(StoreError::AlreadyExists {
                path: to.to_path_buf(),
            });
        }
        std::fs::rename(from, to).map_err(|e| StoreError::io(from, e))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
