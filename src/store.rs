//! Local key-value persistence for the last selected verse.

use crate::error::StoreError;
use crate::verse::Verse;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const SELECTED_VERSE_KEY: &str = "selectedVerse";

pub trait SelectionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
}

/// Reads the persisted selection. An entry that no longer parses as a verse
/// is ignored.
pub fn load_selection(store: &dyn SelectionStore) -> Option<Verse> {
    let raw = store.get(SELECTED_VERSE_KEY)?;
    match serde_json::from_str(&raw) {
        Ok(verse) => Some(verse),
        Err(err) => {
            warn!(error = %err, "ignoring unreadable stored selection");
            None
        }
    }
}

pub fn save_selection(store: &dyn SelectionStore, verse: &Verse) -> Result<(), StoreError> {
    let raw = serde_json::to_string(verse)?;
    store.set(SELECTED_VERSE_KEY, raw)
}

#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }
}

/// JSON object file holding string values. Every write replaces the file
/// through a temporary sibling and a rename.
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "store file is corrupt; starting empty");
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        debug!(path = %path.display(), entries = entries.len(), "opened store");
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let bytes = serde_json::to_vec_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SelectionStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut guard = self.entries.write();
        guard.insert(key.to_string(), value);
        self.persist(&guard)
    }
}
