//! Registry of known checkouts, keyed by name

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::checkout::Checkout;
use crate::git::GitClient;
use crate::selection::WorkSet;
use crate::{Error, Result};

/// Immutable view of one checkout handed to a batch worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub name: String,
    pub path: PathBuf,
}

/// Owns every registered checkout
#[derive(Debug, Clone, Default)]
pub struct RepositoryRegistry {
    checkouts: BTreeMap<String, Checkout>,
}

impl RepositoryRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Name a checkout gets from its path: the final path segment
    pub fn name_for(path: &Path) -> Option<String> {
        path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .filter(|n| !n.is_empty())
    }

    /// Validate `path` and register it under its canonical absolute form
    ///
    /// A checkout with the same name is replaced: the new entry starts from
    /// a fresh state bound to the new path.
    pub fn add(&mut self, path: impl AsRef<Path>, client: &dyn GitClient) -> Result<&Checkout> {
        let given = path.as_ref();

        if !given.exists() {
            return Err(Error::PathInvalid {
                path: given.to_path_buf(),
                reason: "path does not exist".to_string(),
            });
        }

        let canonical = given.canonicalize().map_err(|e| Error::PathInvalid {
            path: given.to_path_buf(),
            reason: format!("cannot resolve path: {}", e),
        })?;
        let path = canonical.as_path();

        let name = Self::name_for(path).ok_or_else(|| Error::PathInvalid {
            path: path.to_path_buf(),
            reason: "path has no final segment to name it by".to_string(),
        })?;

        if !client.is_valid_repo(path) {
            return Err(Error::PathInvalid {
                path: path.to_path_buf(),
                reason: "not a git repository root".to_string(),
            });
        }

        if let Some(previous) = self.checkouts.get(&name) {
            tracing::info!(
                name = %name,
                old = %previous.path().display(),
                new = %path.display(),
                "Replacing checkout path"
            );
        }

        Ok(self.restore(name, path))
    }

    /// Insert an entry without validation (used when loading settings)
    pub fn restore(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> &Checkout {
        let name = name.into();
        self.checkouts
            .insert(name.clone(), Checkout::new(name.clone(), path));
        &self.checkouts[&name]
    }

    /// Remove a checkout; absent names are ignored
    pub fn remove(&mut self, name: &str) -> Option<Checkout> {
        self.checkouts.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Checkout> {
        self.checkouts.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Checkout> {
        self.checkouts.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.checkouts.contains_key(name)
    }

    /// Every registered name (the membership of "All")
    pub fn all_names(&self) -> BTreeSet<String> {
        self.checkouts.keys().cloned().collect()
    }

    /// Checkouts in name order
    pub fn iter(&self) -> impl Iterator<Item = &Checkout> {
        self.checkouts.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Checkout> {
        self.checkouts.values_mut()
    }

    pub fn len(&self) -> usize {
        self.checkouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkouts.is_empty()
    }

    /// Snapshot the checkouts of a work-set for dispatch
    pub fn work_items(&self, work_set: &WorkSet) -> Vec<WorkItem> {
        work_set
            .iter()
            .filter_map(|name| self.checkouts.get(name))
            .map(|c| WorkItem {
                name: c.name().to_string(),
                path: c.path().to_path_buf(),
            })
            .collect()
    }
}
