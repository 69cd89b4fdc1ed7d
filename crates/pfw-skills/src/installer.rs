//! Atomic installation of a downloaded skills archive.
//!
//! ```text
//! <temp>/<uuid>                                  scratch copy of the archive
//! <parent>/.<name>.<uuid>.staging/               extraction target
//! <parent>/<name>/                               swapped in once extraction succeeded
//! ```
//!
//! The destination is only touched after the whole archive has been
//! extracted, so a corrupt or hostile archive leaves the prior install as it
//! was.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pfw_store::{FileSystem, IdSource, StoreError};

use crate::error::{Result, SkillError};
use crate::types::Tool;

/// Installs archives through a [`FileSystem`].
pub struct Installer {
    fs: Arc<dyn FileSystem>,
    ids: Arc<dyn IdSource>,
}

impl Installer {
    pub fn new(fs: Arc<dyn FileSystem>, ids: Arc<dyn IdSource>) -> Self {
        Self { fs, ids }
    }

    /// Install into the default directory for `tool` under the home directory.
    pub fn install_for_tool(&self, tool: Tool, archive: &[u8]) -> Result<PathBuf> {
        let destination = tool.install_dir(&self.fs.home_dir());
        self.install(archive, &destination)
    }

    /// Replace `destination` with the contents of `archive`.
    ///
    /// # Errors
    ///
    /// - [`SkillError::DownloadFailed`] if the scratch copy cannot be written.
    /// - [`SkillError::ExtractionFailed`] for corrupt archives and unsafe
    ///   entries (traversal, absolute paths, symlinks).
    /// - [`SkillError::InstallWriteFailed`] for I/O failures while staging or
    ///   swapping the directory.
    pub fn install(&self, archive: &[u8], destination: &Path) -> Result<PathBuf> {
        let scratch = self.write_scratch(archive)?;
        let result = self.extract_and_swap(&scratch, destination);

        if let Err(e) = self.fs.remove(&scratch) {
            tracing::debug!(path = %scratch.display(), error = %e, "could not remove scratch archive");
        }

        result.map(|()| {
            tracing::info!(destination = %destination.display(), "skills installed");
            destination.to_path_buf()
        })
    }

    fn write_scratch(&self, archive: &[u8]) -> Result<PathBuf> {
        let temp = self.fs.temp_dir();
        let scratch = temp.join(self.ids.next_id().to_string());

        self.fs
            .create_dir_all(&temp)
            .and_then(|()| self.fs.write(&scratch, archive))
            .map_err(|e| SkillError::DownloadFailed {
                reason: format!("could not save the archive: {e}"),
            })?;

        tracing::debug!(path = %scratch.display(), bytes = archive.len(), "archive saved");
        Ok(scratch)
    }

    fn extract_and_swap(&self, scratch: &Path, destination: &Path) -> Result<()> {
        let write_failed = |e: StoreError| SkillError::InstallWriteFailed {
            path: destination.to_path_buf(),
            reason: e.to_string(),
        };

        let (Some(parent), Some(name)) = (destination.parent(), destination.file_name()) else {
            return Err(SkillError::InstallWriteFailed {
                path: destination.to_path_buf(),
                reason: "destination has no parent directory".into(),
            });
        };

        self.fs.create_dir_all(parent).map_err(write_failed)?;

        let staging = parent.join(format!(
            ".{}.{}.staging",
            name.to_string_lossy(),
            self.ids.next_id()
        ));

        if let Err(e) = self.fs.unzip(scratch, &staging) {
            self.discard(&staging);
            return Err(if e.is_archive_error() {
                SkillError::ExtractionFailed {
                    reason: e.to_string(),
                }
            } else {
                write_failed(e)
            });
        }

        if self.fs.exists(destination) {
            if let Err(e) = self.fs.remove(destination) {
                self.discard(&staging);
                return Err(write_failed(e));
            }
            tracing::debug!(path = %destination.display(), "removed previous install");
        }

        self.fs.rename(&staging, destination).map_err(|e| {
            self.discard(&staging);
            write_failed(e)
        })
    }

    /// Best-effort removal of a staging directory.
    fn discard(&self, staging: &Path) {
        match self.fs.remove(staging) {
            Ok(()) | Err(StoreError::NotFound { .. }) => {}
            Err(e) => {
                tracing::warn!(path = %staging.display(), error = %e, "could not remove staging directory");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
