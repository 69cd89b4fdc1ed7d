//! In-memory [`FileSystem`] for tests.
//!
//! State is a set of directory paths plus a map from normalized file path to
//! bytes. Every path is normalized (`.`/`..` collapsed, trailing slash
//! stripped) before it is used as a key.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::{Result, StoreError};
use crate::fs::FileSystem;

#[derive(Debug, Default)]
struct State {
    files: BTreeMap<String, Vec<u8>>,
    directories: BTreeSet<String>,
}

/// Mapping-based filesystem double.
#[derive(Debug)]
pub struct InMemoryFileSystem {
    home: PathBuf,
    temp: PathBuf,
    state: Mutex<State>,
}

impl InMemoryFileSystem {
    /// Create an empty filesystem whose home and temp directories exist.
    pub fn new(home: impl Into<PathBuf>) -> Self {
        let fs = Self {
            home: home.into(),
            temp: PathBuf::from("/tmp"),
            state: Mutex::new(State::default()),
        };
        fs.insert_dir_all(&normalize(&fs.home));
        fs.insert_dir_all(&normalize(&fs.temp));
        fs
    }

    /// Seed a file, creating its parent directories.
    pub fn set_file(&self, path: impl AsRef<Path>, data: impl Into<Vec<u8>>) {
        let key = normalize(path.as_ref());
        if let Some(parent) = parent_key(&key) {
            self.insert_dir_all(&parent);
        }
        self.lock().files.insert(key, data.into());
    }

    /// All file paths currently stored.
    pub fn file_paths(&self) -> Vec<String> {
        self.lock().files.keys().cloned().collect()
    }

    /// File paths below `root`, relative to it, with their contents.
    pub fn files_under(&self, root: impl AsRef<Path>) -> BTreeMap<String, Vec<u8>> {
        let prefix = dir_prefix(&normalize(root.as_ref()));
        self.lock()
            .files
            .iter()
            .filter_map(|(key, data)| {
                key.strip_prefix(&prefix)
                    .map(|rel| (rel.to_owned(), data.clone()))
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic in another test thread must not cascade into this one.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn insert_dir_all(&self, key: &str) {
        let mut state = self.lock();
        for prefix in path_prefixes(key) {
            state.directories.insert(prefix);
        }
    }
}

impl Default for InMemoryFileSystem {
    fn default() -> Self {
        Self::new("/Users/blob")
    }
}

impl FileSystem for InMemoryFileSystem {
    fn home_dir(&self) -> PathBuf {
        self.home.clone()
    }

    fn temp_dir(&self) -> PathBuf {
        self.temp.clone()
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let key = normalize(path);
        if self.lock().files.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        self.insert_dir_all(&key);
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let key = normalize(path);
        let mut state = self.lock();

        let removed_file = state.files.remove(&key).is_some();
        let removed_dir = state.directories.remove(&key);
        if !removed_file && !removed_dir {
            return Err(StoreError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let prefix = dir_prefix(&key);
        state.files.retain(|k, _| !k.starts_with(&prefix));
        state.directories.retain(|d| !d.starts_with(&prefix));
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let key = normalize(path);
        let state = self.lock();
        state.files.contains_key(&key) || state.directories.contains(&key)
    }

    fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        let key = normalize(path);
        let mut state = self.lock();

        if let Some(parent) = parent_key(&key)
            && !state.directories.contains(&parent)
        {
            return Err(StoreError::DirectoryNotFound {
                path: PathBuf::from(parent),
            });
        }
        if state.directories.contains(&key) {
            return Err(StoreError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }

        state.files.insert(key, data.to_vec());
        Ok(())
    }

    fn write_new(&self, path: &Path, data: &[u8]) -> Result<()> {
        if self.exists(path) {
            return Err(StoreError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        self.write(path, data)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let key = normalize(path);
        self.lock()
            .files
            .get(&key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                path: path.to_path_buf(),
            })
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from_key = normalize(from);
        let to_key = normalize(to);
        let mut state = self.lock();

        if state.files.contains_key(&to_key) || state.directories.contains(&to_key) {
            return Err(StoreError::AlreadyExists {
                path: to.to_path_buf(),
            });
        }
        if let Some(parent) = parent_key(&to_key)
            && !state.directories.contains(&parent)
        {
            return Err(StoreError::DirectoryNotFound {
                path: PathBuf::from(parent),
            });
        }

        if let Some(data) = state.files.remove(&from_key) {
            state.files.insert(to_key, data);
            return Ok(());
        }
        if !state.directories.remove(&from_key) {
            return Err(StoreError::NotFound {
                path: from.to_path_buf(),
            });
        }

        let from_prefix = dir_prefix(&from_key);
        let to_prefix = dir_prefix(&to_key);
        let moved_files: Vec<_> = state
            .files
            .keys()
            .filter(|k| k.starts_with(&from_prefix))
            .cloned()
            .collect();
        for key in moved_files {
            if let Some(data) = state.files.remove(&key) {
                state
                    .files
                    .insert(format!("{to_prefix}{}", &key[from_prefix.len()..]), data);
            }
        }
        let moved_dirs: Vec<_> = state
            .directories
            .iter()
            .filter(|d| d.starts_with(&from_prefix))
            .cloned()
            .collect();
        for dir in moved_dirs {
            state.directories.remove(&dir);
            state
                .directories
                .insert(format!("{to_prefix}{}", &dir[from_prefix.len()..]));
        }
        state.directories.insert(to_key);
        Ok(())
    }
}

/// Renders the tree below `/`, one entry per line, two spaces per level.
///
/// Directories end with `/`; text files show their content quoted, other
/// files show their size.
impl fmt::Display for InMemoryFileSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();

        let mut children: BTreeMap<String, BTreeSet<(String, bool)>> = BTreeMap::new();
        for dir in &state.directories {
            if let Some(parent) = parent_key(dir) {
                children
                    .entry(parent)
                    .or_default()
                    .insert((leaf(dir).to_owned(), true));
            }
        }
        for file in state.files.keys() {
            if let Some(parent) = parent_key(file) {
                children
                    .entry(parent)
                    .or_default()
                    .insert((leaf(file).to_owned(), false));
            }
        }

        let mut lines = Vec::new();
        render(&state, &children, "/", 0, &mut lines);
        write!(f, "{}", lines.join("\n"))
    }
}

fn render(
    state: &State,
    children: &BTreeMap<String, BTreeSet<(String, bool)>>,
    dir: &str,
    depth: usize,
    lines: &mut Vec<String>,
) {
    let Some(entries) = children.get(dir) else {
        return;
    };
    let indent = "  ".repeat(depth);
    for (name, is_dir) in entries {
        let key = if dir == "/" {
            format!("/{name}")
        } else {
            format!("{dir}/{name}")
        };
        if *is_dir {
            lines.push(format!("{indent}{name}/"));
            render(state, children, &key, depth + 1, lines);
        } else {
            let data = state.files.get(&key).map(Vec::as_slice).unwrap_or_default();
            lines.push(format!("{indent}{name} {}", describe(data)));
        }
    }
}

fn describe(data: &[u8]) -> String {
    match std::str::from_utf8(data) {
        Ok(text) if !text.chars().any(|c| c.is_control() && c != '\n' && c != '\t') => {
            format!("{text:?}")
        }
        _ => format!("({} bytes)", data.len()),
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// Collapse `.` and `..`, drop trailing slashes, and render with `/`.
pub fn normalize(path: &Path) -> String {
    let mut absolute = false;
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::RootDir | Component::Prefix(_) => absolute = true,
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.last().is_some_and(|p| p != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..".to_owned());
                }
            }
            Component::Normal(name) => parts.push(name.to_string_lossy().into_owned()),
        }
    }

    let joined = parts.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_owned(),
        (false, false) => joined,
    }
}

fn parent_key(key: &str) -> Option<String> {
    if key == "/" {
        return None;
    }
    match key.rfind('/') {
        Some(0) => Some("/".to_owned()),
        Some(index) => Some(key[..index].to_owned()),
        None => None,
    }
}

fn leaf(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

fn dir_prefix(key: &str) -> String {
    if key.ends_with('/') {
        key.to_owned()
    } else {
        format!("{key}/")
    }
}

fn path_prefixes(key: &str) -> Vec<String> {
    let mut prefixes = Vec::new();
    let mut current = parent_key(key);
    prefixes.push(key.to_owned());
    while let Some(parent) = current {
        current = parent_key(&parent);
        prefixes.push(parent);
    }
    prefixes.reverse();
    prefixes
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
