//! Persisted favorites.
//!
//! Favorites are stored as a JSON array of ids under a single key of a
//! [KeyValueStore]. The ledger treats its storage as the source of truth
//! only while loading; afterwards the in-memory set is authoritative and
//! every change is written through.

use std::collections::{BTreeSet, HashMap};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use fslock::LockFile;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::FavoritesError;

/// Storage key of the favorites set.
pub const FAVORITES_KEY: &str = "favorites";

/// A set of favorite ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FavoriteSet(BTreeSet<u32>);

impl FavoriteSet {
    /// Decode a stored value.
    ///
    /// Anything but a JSON array of non-negative integers fitting a `u32` is
    /// rejected.
    pub fn decode(value: &str) -> Result<Self, FavoritesError> {
        serde_json::from_str(value).map_err(FavoritesError::Decode)
    }

    /// Encode as a JSON array in ascending order.
    pub fn encode(&self) -> String {
        let ids = self.0.iter().map(u32::to_string).collect::<Vec<_>>();
        format!("[{}]", ids.join(","))
    }

    pub fn contains(&self, id: u32) -> bool {
        self.0.contains(&id)
    }

    /// Flip membership of `id`, returning the new membership.
    pub fn toggle(&mut self, id: u32) -> bool {
        if self.0.remove(&id) {
            false
        } else {
            self.0.insert(id);
            true
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<u32> for FavoriteSet {
    fn from_iter<T: IntoIterator<Item = u32>>(iter: T) -> Self {
        FavoriteSet(iter.into_iter().collect())
    }
}

/// Durable string storage addressed by key.
pub trait KeyValueStore {
    /// Returns `None` if nothing is stored under `key`.
    fn read(&self, key: &str) -> Result<Option<String>, FavoritesError>;

    fn write(&self, key: &str, value: &str) -> Result<(), FavoritesError>;
}

/// Stores each key as `<key>.json` in a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn lock(&self, key: &str) -> Result<LockFile, FavoritesError> {
        let lock_path = self.path(key).with_extension("lock");
        let mut lock = LockFile::open(lock_path.as_os_str()).map_err(FavoritesError::Lock)?;
        lock.lock().map_err(FavoritesError::Lock)?;
        Ok(lock)
    }
}

impl KeyValueStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, FavoritesError> {
        let path = self.path(key);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no stored value");
                Ok(None)
            },
            Err(e) => Err(FavoritesError::Read(e)),
        }
    }

    /// Write the value atomically.
    ///
    /// The value is written to a temporary file in the same directory which
    /// is then renamed over the target, while holding a lock file so
    /// concurrent writers don't interleave.
    fn write(&self, key: &str, value: &str) -> Result<(), FavoritesError> {
        std::fs::create_dir_all(&self.dir).map_err(FavoritesError::Write)?;
        let path = self.path(key);
        let parent = path
            .parent()
            .ok_or_else(|| FavoritesError::InvalidLocation(path.clone()))?;

        let _lock = self.lock(key)?;
        let temp_file = tempfile::NamedTempFile::new_in(parent).map_err(FavoritesError::Write)?;
        {
            let mut writer = BufWriter::new(&temp_file);
            writer
                .write_all(value.as_bytes())
                .and_then(|_| writer.flush())
                .map_err(FavoritesError::Write)?;
        }
        temp_file.persist(&path).map_err(FavoritesError::Persist)?;
        debug!(path = %path.display(), "stored value");
        Ok(())
    }
}

/// Keeps values in memory, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::default();
        store
            .entries
            .lock()
            .expect("couldn't acquire store lock")
            .insert(key.to_string(), value.to_string());
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, FavoritesError> {
        Ok(self
            .entries
            .lock()
            .expect("couldn't acquire store lock")
            .get(key)
            .cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), FavoritesError> {
        self.entries
            .lock()
            .expect("couldn't acquire store lock")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// The favorites of the current user.
#[derive(Debug)]
pub struct FavoritesLedger<S> {
    storage: S,
    favorites: FavoriteSet,
}

impl<S: KeyValueStore> FavoritesLedger<S> {
    /// Load favorites from `storage`.
    ///
    /// Missing, unreadable or malformed values all yield an empty set.
    pub fn load(storage: S) -> Self {
        let favorites = match storage.read(FAVORITES_KEY) {
            Ok(Some(value)) => FavoriteSet::decode(&value).unwrap_or_else(|e| {
                warn!(error = %e, "ignoring malformed favorites");
                FavoriteSet::default()
            }),
            Ok(None) => FavoriteSet::default(),
            Err(e) => {
                warn!(error = %e, "failed to load favorites");
                FavoriteSet::default()
            },
        };
        debug!(n_favorites = favorites.len(), "loaded favorites");
        Self { storage, favorites }
    }

    /// Flip membership of `id` and persist the whole set.
    ///
    /// Returns the new membership. A failure to persist is logged; the
    /// in-memory set keeps the change.
    pub fn toggle(&mut self, id: u32) -> bool {
        let is_favorite = self.favorites.toggle(id);
        if let Err(e) = self.storage.write(FAVORITES_KEY, &self.favorites.encode()) {
            error!(id, error = %e, "failed to save favorites");
        }
        is_favorite
    }

    pub fn is_favorite(&self, id: u32) -> bool {
        self.favorites.contains(id)
    }

    pub fn favorites(&self) -> &FavoriteSet {
        &self.favorites
    }
}
