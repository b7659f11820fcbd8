//! Persisted registry and group data
//!
//! The settings store is a flat key-value store whose values are JSON
//! documents:
//!
//! - `repositories`: `{ "<name>": { "path": "<path>" } }`
//! - `groups`: `{ "<group>": ["<checkout>", ...] }`
//! - `groups_expanded`: `["<group>", ...]`, may contain `"All"`
//!
//! Missing or malformed keys load as empty values.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const REPOSITORIES_KEY: &str = "repositories";
pub const GROUPS_KEY: &str = "groups";
pub const GROUPS_EXPANDED_KEY: &str = "groups_expanded";

/// Placeholder older settings files store for a group with no members
const LEGACY_EMPTY_MEMBER: &str = "empty";

/// Key-value storage for settings blobs
pub trait ConfigStore {
    /// Stored value for `key`, if any
    fn load(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, persisting it
    fn save(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Settings kept in memory only
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    values: BTreeMap<String, String>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Settings stored as one JSON object of string values in a file
#[derive(Debug)]
pub struct FileConfigStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileConfigStore {
    /// Open the store at `path`; a missing file is an empty store
    ///
    /// An unreadable document is logged and treated as empty; it is only
    /// overwritten on the next save.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let values = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            match serde_json::from_str(&contents) {
                Ok(values) => values,
                Err(e) => {
                    tracing::warn!(
                        "Settings file {} is not valid, starting empty: {}",
                        path.display(),
                        e
                    );
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

/// One `repositories` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryEntry {
    pub path: PathBuf,
}

/// Everything Roost persists
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedState {
    pub repositories: BTreeMap<String, RepositoryEntry>,
    pub groups: BTreeMap<String, Vec<String>>,
    pub groups_expanded: Vec<String>,
}

impl PersistedState {
    /// Read all keys, falling back to empty values for missing or bad ones
    pub fn load(store: &dyn ConfigStore) -> Self {
        let repositories = load_key(store, REPOSITORIES_KEY);
        let mut groups: BTreeMap<String, Vec<String>> = load_key(store, GROUPS_KEY);
        let groups_expanded = load_key(store, GROUPS_EXPANDED_KEY);

        for members in groups.values_mut() {
            if members.len() == 1 && members[0] == LEGACY_EMPTY_MEMBER {
                members.clear();
            }
        }

        Self {
            repositories,
            groups,
            groups_expanded,
        }
    }

    /// Write the `repositories` key
    pub fn save_repositories(&self, store: &mut dyn ConfigStore) -> Result<()> {
        store.save(REPOSITORIES_KEY, &serde_json::to_string(&self.repositories)?)
    }

    /// Write the `groups` key
    pub fn save_groups(&self, store: &mut dyn ConfigStore) -> Result<()> {
        store.save(GROUPS_KEY, &serde_json::to_string(&self.groups)?)
    }

    /// Write the `groups_expanded` key
    pub fn save_expanded(&self, store: &mut dyn ConfigStore) -> Result<()> {
        store.save(
            GROUPS_EXPANDED_KEY,
            &serde_json::to_string(&self.groups_expanded)?,
        )
    }

    /// Write every key
    pub fn save(&self, store: &mut dyn ConfigStore) -> Result<()> {
        self.save_repositories(store)?;
        self.save_groups(store)?;
        self.save_expanded(store)
    }
}

/// Parse one key, reporting malformed JSON as [`Error::ConfigParse`]
pub fn parse_key<T: for<'de> Deserialize<'de>>(key: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| Error::ConfigParse {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn load_key<T: for<'de> Deserialize<'de> + Default>(store: &dyn ConfigStore, key: &str) -> T {
    let Some(raw) = store.load(key) else {
        return T::default();
    };

    match parse_key(key, &raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("{}; using empty value", e);
            T::default()
        }
    }
}
