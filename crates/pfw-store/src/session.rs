//! Persisted identity: the login token and the machine identifier.
//!
//! Layout under the home directory:
//!
//! ```text
//! <home>/.pfw/
//!   token     -- credential, raw bytes
//!   machine   -- machine identifier, UUID string
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::fs::FileSystem;
use crate::ids::IdSource;

/// Name of the data directory below the home directory.
pub const DATA_DIR_NAME: &str = ".pfw";

const TOKEN_FILE: &str = "token";
const MACHINE_FILE: &str = "machine";

/// Paths of the persisted session files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    data_dir: PathBuf,
}

impl DataLayout {
    pub fn new(home: &Path) -> Self {
        Self {
            data_dir: home.join(DATA_DIR_NAME),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn token_path(&self) -> PathBuf {
        self.data_dir.join(TOKEN_FILE)
    }

    pub fn machine_path(&self) -> PathBuf {
        self.data_dir.join(MACHINE_FILE)
    }
}

/// Reads and writes the persisted credential and machine identifier.
pub struct Session {
    fs: Arc<dyn FileSystem>,
    ids: Arc<dyn IdSource>,
    layout: DataLayout,
}

impl Session {
    pub fn new(fs: Arc<dyn FileSystem>, ids: Arc<dyn IdSource>) -> Self {
        let layout = DataLayout::new(&fs.home_dir());
        Self { fs, ids, layout }
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    pub fn data_dir(&self) -> &Path {
        self.layout.data_dir()
    }

    pub fn token_path(&self) -> PathBuf {
        self.layout.token_path()
    }

    /// Persist `token` exactly as given and make sure a machine identifier
    /// exists.
    ///
    /// Returns the machine identifier that subsequent installs will send.
    ///
    /// # Errors
    ///
    /// [`StoreError::EmptyToken`] for a blank token and
    /// [`StoreError::MalformedToken`] for one with surrounding whitespace,
    /// which [`Session::load`] could not hand back unchanged.
    pub fn save(&self, token: &str) -> Result<Uuid> {
        if token.trim().is_empty() {
            return Err(StoreError::EmptyToken);
        }
        if token.trim() != token {
            return Err(StoreError::MalformedToken);
        }

        self.fs.create_dir_all(self.layout.data_dir())?;
        self.fs.write(&self.layout.token_path(), token.as_bytes())?;
        tracing::info!(path = %self.layout.token_path().display(), "token saved");

        self.machine_id()
    }

    /// Load the persisted token.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotLoggedIn`] if no token file exists or it is empty.
    pub fn load(&self) -> Result<String> {
        let path = self.layout.token_path();
        let bytes = match self.fs.read(&path) {
            Ok(bytes) => bytes,
            Err(StoreError::NotFound { .. }) => return Err(StoreError::NotLoggedIn { path }),
            Err(e) => return Err(e),
        };

        let token = String::from_utf8_lossy(&bytes).trim().to_owned();
        if token.is_empty() {
            return Err(StoreError::NotLoggedIn { path });
        }
        Ok(token)
    }

    pub fn is_logged_in(&self) -> bool {
        self.load().is_ok()
    }

    /// The persisted machine identifier, generating and persisting one if
    /// none exists yet.
    ///
    /// A file that does not hold a valid UUID is replaced.
    pub fn machine_id(&self) -> Result<Uuid> {
        let path = self.layout.machine_path();

        match self.fs.read(&path) {
            Ok(bytes) => {
                let raw = String::from_utf8_lossy(&bytes);
                if let Ok(id) = Uuid::parse_str(raw.trim()) {
                    return Ok(id);
                }
                tracing::warn!(path = %path.display(), "machine identifier is corrupt, regenerating");
                let id = self.ids.next_id();
                self.fs.write(&path, id.to_string().as_bytes())?;
                Ok(id)
            }
            Err(StoreError::NotFound { .. }) => {
                self.fs.create_dir_all(self.layout.data_dir())?;
                let id = self.ids.next_id();
                match self.fs.write_new(&path, id.to_string().as_bytes()) {
                    Ok(()) => {
                        tracing::info!(path = %path.display(), machine = %id, "machine identifier created");
                        Ok(id)
                    }
                    // Another invocation won the race; use its identifier.
                    Err(StoreError::AlreadyExists { .. }) => self.machine_id(),
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Remove the token. Returns `false` if there was none.
    pub fn clear(&self) -> Result<bool> {
        remove_if_present(self.fs.as_ref(), &self.layout.token_path())
    }

    /// Remove the whole data directory. Returns `false` if there was none.
    pub fn clear_all(&self) -> Result<bool> {
        remove_if_present(self.fs.as_ref(), self.layout.data_dir())
    }
}

fn remove_if_present(fs: &dyn FileSystem, path: &Path) -> Result<bool> {
    match fs.remove(path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "removed");
            Ok(true)
        }
        Err(StoreError::NotFound { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::memory_fs::InMemoryFileSystem;

    fn session() -> (Arc<InMemoryFileSystem>, Session) {
        let fs = Arc::new(InMemoryFileSystem::default());
        let session = Session::new(fs.clone(), Arc::new(SequentialIds::new()));
        (fs, session)
    }

    #[test]
    fn layout_paths() {
        let layout = DataLayout::new(Path::new("/Users/blob"));
        assert_eq!(layout.data_dir(), Path::new("/Users/blob/.pfw"));
        assert_eq!(layout.token_path(), PathBuf::from("/Users/blob/.pfw/token"));
        assert_eq!(layout.machine_path(), PathBuf::from("/Users/blob/.pfw/machine"));
    }

    #[test]
    fn save_then_load() {
        let (fs, session) = session();
        let machine = session.save("deadbeef").unwrap();

        assert_eq!(session.load().unwrap(), "deadbeef");
        assert_eq!(machine.to_string(), "00000000-0000-0000-0000-000000000000");
        assert_eq!(
            fs.to_string(),
            "Users/\n  blob/\n    .pfw/\n      machine \"00000000-0000-0000-0000-000000000000\"\n      token \"deadbeef\"\ntmp/"
        );
    }

    #[test]
    fn save_rejects_empty_token() {
        let (_fs, session) = session();
        assert!(matches!(session.save("  \n"), Err(StoreError::EmptyToken)));
    }

    #[test]
    fn save_rejects_surrounding_whitespace() {
        let (fs, session) = session();
        for token in ["deadbeef ", " deadbeef", "deadbeef\n"] {
            assert!(
                matches!(session.save(token), Err(StoreError::MalformedToken)),
                "expected {token:?} to be rejected"
            );
        }
        assert!(!fs.exists(Path::new("/Users/blob/.pfw")));
    }

    #[test]
    fn save_keeps_token_bytes() {
        let (fs, session) = session();
        session.save("a+b/c=").unwrap();
        assert_eq!(fs.read(Path::new("/Users/blob/.pfw/token")).unwrap(), b"a+b/c=");
        assert_eq!(session.load().unwrap(), "a+b/c=");
    }

    #[test]
    fn load_without_token_is_not_logged_in() {
        let (fs, session) = session();
        assert!(matches!(session.load(), Err(StoreError::NotLoggedIn { .. })));

        fs.set_file("/Users/blob/.pfw/token", "");
        assert!(matches!(session.load(), Err(StoreError::NotLoggedIn { .. })));
        assert!(!session.is_logged_in());
    }

    #[test]
    fn machine_id_is_stable_across_logins() {
        let (_fs, session) = session();
        let first = session.save("one").unwrap();
        let second = session.save("two").unwrap();
        assert_eq!(first, second);
        assert_eq!(session.machine_id().unwrap(), first);
    }

    #[test]
    fn machine_id_created_when_token_predates_it() {
        let (fs, session) = session();
        fs.set_file("/Users/blob/.pfw/token", "expired-deadbeef");

        let id = session.machine_id().unwrap();
        assert_eq!(
            fs.read(Path::new("/Users/blob/.pfw/machine")).unwrap(),
            id.to_string().as_bytes()
        );
    }

    #[test]
    fn corrupt_machine_id_is_replaced() {
        let (fs, session) = session();
        fs.set_file("/Users/blob/.pfw/machine", "not-a-uuid");

        let id = session.machine_id().unwrap();
        assert_eq!(id.to_string(), "00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn clear_keeps_machine_id() {
        let (fs, session) = session();
        session.save("deadbeef").unwrap();

        assert!(session.clear().unwrap());
        assert!(!session.clear().unwrap());
        assert!(fs.exists(Path::new("/Users/blob/.pfw/machine")));
    }

    #[test]
    fn clear_all_removes_data_dir() {
        let (fs, session) = session();
        session.save("deadbeef").unwrap();

        assert!(session.clear_all().unwrap());
        assert!(!fs.exists(Path::new("/Users/blob/.pfw")));
        assert!(!session.clear_all().unwrap());
    }
}
