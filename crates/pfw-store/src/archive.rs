//! ZIP archive reader with path-traversal defense.
//!
//! [`read_archive`] decodes every entry up front and validates its name
//! before anything touches the filesystem, so a single unsafe entry rejects
//! the whole archive and no partial extraction can happen.

use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};

use crate::error::{Result, StoreError};

/// Largest uncompressed size accepted for a single entry (64 MiB).
const MAX_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

/// Largest uncompressed size accepted for the whole archive (256 MiB).
const MAX_TOTAL_BYTES: u64 = 256 * 1024 * 1024;

/// Uncompressed size bounds applied while decoding.
#[derive(Debug, Clone, Copy)]
struct Limits {
    entry: u64,
    total: u64,
}

impl Limits {
    const DEFAULT: Self = Self {
        entry: MAX_ENTRY_BYTES,
        total: MAX_TOTAL_BYTES,
    };
}

/// Unix file type bits for a symbolic link.
const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;

/// A validated archive entry, relative to the extraction root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Relative path with only normal components.
    pub path: PathBuf,
    pub kind: EntryKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File(Vec<u8>),
}

/// Decode a ZIP archive and validate every entry.
///
/// # Errors
///
/// - [`StoreError::InvalidArchive`] if the bytes are not a readable ZIP or an
///   entry is corrupt, an entry exceeds 64 MiB, or the entries together
///   exceed 256 MiB.
/// - [`StoreError::UnsafeEntry`] if any entry is absolute, contains a `..`
///   segment, or is a symbolic link.
pub fn read_archive(bytes: &[u8]) -> Result<Vec<ArchiveEntry>> {
    read_archive_within(bytes, Limits::DEFAULT)
}

fn read_archive_within(bytes: &[u8], limits: Limits) -> Result<Vec<ArchiveEntry>> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| StoreError::InvalidArchive {
            reason: e.to_string(),
        })?;

    let mut entries = Vec::with_capacity(archive.len());
    let mut total: u64 = 0;

    for index in 0..archive.len() {
        let mut file = archive
            .by_index(index)
            .map_err(|e| StoreError::InvalidArchive {
                reason: format!("entry {index}: {e}"),
            })?;

        let name = file.name().to_owned();

        if file
            .unix_mode()
            .is_some_and(|mode| mode & S_IFMT == S_IFLNK)
        {
            return Err(StoreError::UnsafeEntry {
                entry: name,
                reason: "symbolic links are not allowed".into(),
            });
        }

        let Some(path) = sanitize_entry_name(&name)? else {
            // `./` and friends name the root itself.
            continue;
        };

        if file.is_dir() {
            entries.push(ArchiveEntry {
                path,
                kind: EntryKind::Directory,
            });
            continue;
        }

        let too_large = |limit: &str| StoreError::InvalidArchive {
            reason: format!("entry `{name}` exceeds the {limit}"),
        };
        let remaining = limits.total - total;
        if file.size() > limits.entry {
            return Err(too_large(&format!("{} byte entry limit", limits.entry)));
        }
        if file.size() > remaining {
            return Err(too_large(&format!("{} byte archive limit", limits.total)));
        }

        // Declared sizes can lie; bound the actual read as well.
        let cap = limits.entry.min(remaining);
        let mut data = Vec::with_capacity(file.size() as usize);
        (&mut file)
            .take(cap + 1)
            .read_to_end(&mut data)
            .map_err(|e| StoreError::InvalidArchive {
                reason: format!("entry `{name}`: {e}"),
            })?;
        let read = data.len() as u64;
        if read > limits.entry {
            return Err(too_large(&format!("{} byte entry limit", limits.entry)));
        }
        if read > remaining {
            return Err(too_large(&format!("{} byte archive limit", limits.total)));
        }
        total += read;

        entries.push(ArchiveEntry {
            path,
            kind: EntryKind::File(data),
        });
    }

    tracing::debug!(entries = entries.len(), "archive decoded");
    Ok(entries)
}

/// Turn a raw entry name into a relative path that cannot escape the
/// extraction root.
///
/// Both `/` and `\` are treated as separators. Returns `Ok(None)` for names
/// that resolve to the root itself (e.g. `./`).
pub fn sanitize_entry_name(name: &str) -> Result<Option<PathBuf>> {
    let unsafe_entry = |reason: &str| StoreError::UnsafeEntry {
        entry: name.to_owned(),
        reason: reason.to_owned(),
    };

    if name.contains('\0') {
        return Err(unsafe_entry("contains a NUL byte"));
    }
    if name.starts_with('/') || name.starts_with('\\') {
        return Err(unsafe_entry("absolute path"));
    }

    let mut path = PathBuf::new();
    for (index, segment) in name.split(['/', '\\']).enumerate() {
        match segment {
            "" | "." => continue,
            ".." => return Err(unsafe_entry("parent directory segment")),
            s if index == 0 && s.contains(':') => {
                return Err(unsafe_entry("drive or scheme prefix"));
            }
            s => path.push(s),
        }
    }

    // Reject anything the platform would parse as a non-normal component.
    if !path
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        return Err(unsafe_entry("non-normal path component"));
    }

    Ok((path != Path::new("")).then_some(path))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
