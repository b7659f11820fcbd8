//! The per-checkout git primitives the rest of Roost is written against

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::branch::BranchRef;
use super::pull::PullOutcome;
use super::repo::GitRepo;
use crate::Result;

/// The branch a checkout has checked out
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BranchName {
    /// A named local branch
    Named(String),
    /// No branch checked out (detached HEAD) or not yet known
    #[default]
    Detached,
}

impl BranchName {
    /// The branch name, if one is checked out
    pub fn as_str(&self) -> Option<&str> {
        match self {
            BranchName::Named(name) => Some(name),
            BranchName::Detached => None,
        }
    }
}

impl From<Option<String>> for BranchName {
    fn from(name: Option<String>) -> Self {
        name.map(BranchName::Named).unwrap_or(BranchName::Detached)
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchName::Named(name) => write!(f, "{}", name),
            BranchName::Detached => write!(f, "(detached)"),
        }
    }
}

/// Git primitives for a single checkout, addressed by working tree path
///
/// Implementations must be shareable across worker threads: the batch
/// executor calls them from the blocking pool.
pub trait GitClient: Send + Sync {
    /// Whether `path` is the root of a usable (non-bare) repository
    fn is_valid_repo(&self, path: &Path) -> bool;

    /// Whether the working tree has uncommitted modifications
    fn is_dirty(&self, path: &Path) -> Result<bool>;

    /// The checked out branch
    fn active_branch_name(&self, path: &Path) -> Result<BranchName>;

    /// Local branch names
    fn list_branches(&self, path: &Path) -> Result<Vec<String>>;

    /// Create a local branch at HEAD, returning the existing one if present
    fn create_branch(&self, path: &Path, name: &str) -> Result<BranchRef>;

    /// Check out an existing local branch
    fn checkout_branch(&self, path: &Path, name: &str) -> Result<()>;

    /// Fast-forward the current branch from `origin`
    fn pull(&self, path: &Path) -> Result<PullOutcome>;

    /// URL of `origin`
    fn remote_url(&self, path: &Path) -> Result<Option<String>>;

    /// Commit HEAD points at
    fn head_commit(&self, path: &Path) -> Result<Option<String>>;
}

/// [`GitClient`] backed by libgit2
///
/// Every call opens the repository afresh; `git2::Repository` handles are
/// not shared between threads.
#[derive(Debug, Clone, Default)]
pub struct Git2Client {
    include_untracked: bool,
}

impl Git2Client {
    /// Create a client
    pub fn new() -> Self {
        Self::default()
    }

    /// Count untracked files when checking for a dirty working tree
    pub fn with_untracked(mut self, include_untracked: bool) -> Self {
        self.include_untracked = include_untracked;
        self
    }
}

impl GitClient for Git2Client {
    fn is_valid_repo(&self, path: &Path) -> bool {
        GitRepo::is_repo_root(path)
    }

    fn is_dirty(&self, path: &Path) -> Result<bool> {
        GitRepo::open(path)?.is_dirty(self.include_untracked)
    }

    fn active_branch_name(&self, path: &Path) -> Result<BranchName> {
        Ok(GitRepo::open(path)?.current_branch()?.into())
    }

    fn list_branches(&self, path: &Path) -> Result<Vec<String>> {
        GitRepo::open(path)?.list_local_branches()
    }

    fn create_branch(&self, path: &Path, name: &str) -> Result<BranchRef> {
        GitRepo::open(path)?.create_branch(name)
    }

    fn checkout_branch(&self, path: &Path, name: &str) -> Result<()> {
        GitRepo::open(path)?.checkout_branch(name)
    }

    fn pull(&self, path: &Path) -> Result<PullOutcome> {
        GitRepo::open(path)?.pull()
    }

    fn remote_url(&self, path: &Path) -> Result<Option<String>> {
        GitRepo::open(path)?.origin_url()
    }

    fn head_commit(&self, path: &Path) -> Result<Option<String>> {
        GitRepo::open(path)?.head_commit()
    }
}
