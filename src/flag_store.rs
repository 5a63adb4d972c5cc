//! Persistent boolean flags that survive a reload of the view.
//!
//! The game view only persists one flag (`startGame` by default), read once at
//! mount and written whenever a server verdict changes it.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::error::{GameViewError, Result};

/// Key/value store for boolean flags.
pub trait FlagStore: Send + 'static {
    /// Read a flag. `Ok(None)` if it was never written.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn load(&self, key: &str) -> Result<Option<bool>>;

    /// Write a flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn store(&mut self, key: &str, value: bool) -> Result<()>;
}

/// In-process flag store. Clones share the same map, so a store can outlive
/// one mount and be handed to the next.
#[derive(Debug, Clone, Default)]
pub struct MemoryFlagStore {
    flags: Arc<Mutex<HashMap<String, bool>>>,
}

impl MemoryFlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store with one flag already set.
    pub fn with_flag(key: impl Into<String>, value: bool) -> Self {
        let store = Self::new();
        store
            .flags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value);
        store
    }

    /// Current value of `key` without going through the trait.
    pub fn get(&self, key: &str) -> Option<bool> {
        self.flags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
    }
}

impl FlagStore for MemoryFlagStore {
    fn load(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.get(key))
    }

    fn store(&mut self, key: &str, value: bool) -> Result<()> {
        self.flags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value);
        Ok(())
    }
}

/// Flags kept as a JSON object in a single file.
///
/// A missing file is an empty store. Each write rewrites the whole file through
/// a temporary sibling and a rename.
#[derive(Debug, Clone)]
pub struct JsonFileFlagStore {
    path: PathBuf,
}

impl JsonFileFlagStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<HashMap<String, bool>> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(GameViewError::FlagStore(format!(
                "reading {}: {e}",
                self.path.display()
            ))),
        }
    }
}

impl FlagStore for JsonFileFlagStore {
    fn load(&self, key: &str) -> Result<Option<bool>> {
        Ok(self.read_all()?.get(key).copied())
    }

    fn store(&mut self, key: &str, value: bool) -> Result<()> {
        let mut flags = self.read_all()?;
        flags.insert(key.to_owned(), value);
        let json = serde_json::to_string_pretty(&flags)?;

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(key, value, path = %self.path.display(), "flag persisted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pong-view-flags-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{name}.json"));
        let _ = std::fs::remove_file(&path);
        path
    }

    #[test]
    fn memory_store_is_shared_between_clones() {
        let store = MemoryFlagStore::new();
        let mut writer = store.clone();
        assert_eq!(store.load("startGame").unwrap(), None);
        writer.store("startGame", true).unwrap();
        assert_eq!(store.load("startGame").unwrap(), Some(true));
        assert_eq!(MemoryFlagStore::with_flag("x", false).get("x"), Some(false));
    }

    #[test]
    fn file_store_missing_file_reads_empty() {
        let store = JsonFileFlagStore::new(scratch_path("missing"));
        assert_eq!(store.load("startGame").unwrap(), None);
    }

    #[test]
    fn file_store_survives_a_new_instance() {
        let path = scratch_path("reload");
        let mut store = JsonFileFlagStore::new(&path);
        store.store("startGame", true).unwrap();
        store.store("other", false).unwrap();

        let reopened = JsonFileFlagStore::new(&path);
        assert_eq!(reopened.load("startGame").unwrap(), Some(true));
        assert_eq!(reopened.load("other").unwrap(), Some(false));

        store.store("startGame", false).unwrap();
        assert_eq!(reopened.load("startGame").unwrap(), Some(false));
    }

    #[test]
    fn file_store_rejects_garbage() {
        let path = scratch_path("garbage");
        std::fs::write(&path, "not json").unwrap();
        let store = JsonFileFlagStore::new(&path);
        assert!(matches!(
            store.load("startGame"),
            Err(GameViewError::Serialization(_))
        ));
    }
}
