//! In-memory [`GitClient`] for tests

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::branch::BranchRef;
use super::client::{BranchName, GitClient};
use super::pull::PullOutcome;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub(crate) struct FakeRepo {
    pub branches: Vec<String>,
    pub current: Option<String>,
    pub dirty: bool,
    pub head: u32,
    pub remote: Option<String>,
    /// Pull advances HEAD by one commit when true
    pub behind: bool,
    pub pull_error: Option<String>,
    pub checkout_error: Option<String>,
}

impl Default for FakeRepo {
    fn default() -> Self {
        Self {
            branches: vec!["master".to_string()],
            current: Some("master".to_string()),
            dirty: false,
            head: 1,
            remote: Some("https://example.com/repo.git".to_string()),
            behind: false,
            pull_error: None,
            checkout_error: None,
        }
    }
}

/// Repositories keyed by path, plus a log of pulls performed
#[derive(Debug, Default)]
pub(crate) struct FakeGitClient {
    repos: Mutex<HashMap<PathBuf, FakeRepo>>,
    pulls: Mutex<Vec<PathBuf>>,
}

impl FakeGitClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(self, path: impl Into<PathBuf>, repo: FakeRepo) -> Self {
        self.repos.lock().unwrap().insert(path.into(), repo);
        self
    }

    pub fn update(&self, path: impl AsRef<Path>, f: impl FnOnce(&mut FakeRepo)) {
        let mut repos = self.repos.lock().unwrap();
        f(repos.get_mut(path.as_ref()).expect("unknown fake repo"));
    }

    pub fn repo(&self, path: impl AsRef<Path>) -> FakeRepo {
        self.repos.lock().unwrap()[path.as_ref()].clone()
    }

    pub fn pulled(&self) -> Vec<PathBuf> {
        self.pulls.lock().unwrap().clone()
    }

    fn with<T>(&self, path: &Path, f: impl FnOnce(&mut FakeRepo) -> Result<T>) -> Result<T> {
        let mut repos = self.repos.lock().unwrap();
        match repos.get_mut(path) {
            Some(repo) => f(repo),
            None => Err(Error::GitOperation(format!(
                "not a repository: {}",
                path.display()
            ))),
        }
    }
}

impl GitClient for FakeGitClient {
    fn is_valid_repo(&self, path: &Path) -> bool {
        self.repos.lock().unwrap().contains_key(path)
    }

    fn is_dirty(&self, path: &Path) -> Result<bool> {
        self.with(path, |r| Ok(r.dirty))
    }

    fn active_branch_name(&self, path: &Path) -> Result<BranchName> {
        self.with(path, |r| Ok(r.current.clone().into()))
    }

    fn list_branches(&self, path: &Path) -> Result<Vec<String>> {
        self.with(path, |r| Ok(r.branches.clone()))
    }

    fn create_branch(&self, path: &Path, name: &str) -> Result<BranchRef> {
        self.with(path, |r| {
            let created = !r.branches.iter().any(|b| b == name);
            if created {
                r.branches.push(name.to_string());
            }
            Ok(BranchRef {
                name: name.to_string(),
                commit: r.head.to_string(),
                created,
            })
        })
    }

    fn checkout_branch(&self, path: &Path, name: &str) -> Result<()> {
        self.with(path, |r| {
            if let Some(message) = &r.checkout_error {
                return Err(Error::GitOperation(message.clone()));
            }
            if !r.branches.iter().any(|b| b == name) {
                return Err(Error::GitOperation(format!("no branch {}", name)));
            }
            r.current = Some(name.to_string());
            Ok(())
        })
    }

    fn pull(&self, path: &Path) -> Result<PullOutcome> {
        self.pulls.lock().unwrap().push(path.to_path_buf());
        self.with(path, |r| {
            if let Some(message) = &r.pull_error {
                return Err(Error::GitOperation(message.clone()));
            }
            if r.remote.is_none() {
                return Ok(PullOutcome::NoRemote);
            }
            if r.behind {
                r.behind = false;
                r.head += 1;
                Ok(PullOutcome::FastForwarded)
            } else {
                Ok(PullOutcome::UpToDate)
            }
        })
    }

    fn remote_url(&self, path: &Path) -> Result<Option<String>> {
        self.with(path, |r| Ok(r.remote.clone()))
    }

    fn head_commit(&self, path: &Path) -> Result<Option<String>> {
        self.with(path, |r| Ok(Some(r.head.to_string())))
    }
}
