//! Git repository access and working tree state

use std::path::{Path, PathBuf};

use git2::{Repository, StatusOptions};

use crate::{Error, Result};

/// A git checkout wrapper providing the queries Roost needs
pub struct GitRepo {
    /// The underlying git2 repository
    repo: Repository,
    /// Path to the working tree root
    root: PathBuf,
}

impl std::fmt::Debug for GitRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepo")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl GitRepo {
    /// Open the repository whose working tree root is `path`
    ///
    /// Unlike discovery, this does not search parent directories: a
    /// subdirectory of a checkout is not accepted.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let repo = Repository::open(path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                Error::PathInvalid {
                    path: path.to_path_buf(),
                    reason: "not a git repository root".to_string(),
                }
            } else {
                Error::GitOperation(format!("Failed to open {}: {}", path.display(), e.message()))
            }
        })?;

        let root = repo
            .workdir()
            .ok_or_else(|| Error::PathInvalid {
                path: path.to_path_buf(),
                reason: "bare repositories are not supported".to_string(),
            })?
            .to_path_buf();

        Ok(Self { repo, root })
    }

    /// Get the working tree root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check if the given path is the root of a non-bare repository
    pub fn is_repo_root(path: impl AsRef<Path>) -> bool {
        Self::open(path).is_ok()
    }

    /// Check for uncommitted modifications
    ///
    /// Ignored files never count; untracked files count only when asked.
    pub fn is_dirty(&self, include_untracked: bool) -> Result<bool> {
        let mut options = StatusOptions::new();
        options
            .include_untracked(include_untracked)
            .recurse_untracked_dirs(include_untracked)
            .include_ignored(false)
            .exclude_submodules(true);

        let statuses = self
            .repo
            .statuses(Some(&mut options))
            .map_err(|e| Error::GitOperation(format!("Failed to read status: {}", e.message())))?;

        Ok(statuses.iter().any(|entry| {
            let status = entry.status();
            !status.is_ignored() && (include_untracked || !status.is_wt_new())
        }))
    }

    /// Get the current branch name
    ///
    /// Returns `None` for a detached HEAD. An unborn branch reports the
    /// name HEAD points at.
    pub fn current_branch(&self) -> Result<Option<String>> {
        let head = match self.repo.head() {
            Ok(h) => h,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => {
                let head = self.repo.find_reference("HEAD")?;
                return Ok(head
                    .symbolic_target()
                    .and_then(|t| t.strip_prefix("refs/heads/"))
                    .map(|s| s.to_string()));
            }
            Err(e) => {
                return Err(Error::GitOperation(format!(
                    "Failed to get HEAD: {}",
                    e.message()
                )))
            }
        };

        if head.is_branch() {
            Ok(head.shorthand().map(|s| s.to_string()))
        } else {
            Ok(None)
        }
    }

    /// Get the commit HEAD points at, `None` on an unborn branch
    pub fn head_commit(&self) -> Result<Option<String>> {
        match self.repo.head() {
            Ok(head) => Ok(head.target().map(|oid| oid.to_string())),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => Ok(None),
            Err(e) => Err(Error::GitOperation(format!(
                "Failed to get HEAD: {}",
                e.message()
            ))),
        }
    }

    /// URL of the `origin` remote, if configured
    pub fn origin_url(&self) -> Result<Option<String>> {
        match self.repo.find_remote("origin") {
            Ok(remote) => Ok(remote.url().map(|u| u.to_string())),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(Error::GitOperation(format!(
                "Failed to read remote: {}",
                e.message()
            ))),
        }
    }

    /// Get access to the underlying git2 repository
    pub fn inner(&self) -> &Repository {
        &self.repo
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::init_repo;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_repo_root() {
        let temp = TempDir::new().unwrap();
        init_repo(temp.path());

        let repo = GitRepo::open(temp.path()).unwrap();
        assert!(repo.root().exists());
        assert!(GitRepo::is_repo_root(temp.path()));
    }

    #[test]
    fn test_subdirectory_is_not_root() {
        let temp = TempDir::new().unwrap();
        init_repo(temp.path());
        let sub = temp.path().join("sub");
        std::fs::create_dir(&sub).unwrap();

        assert!(!GitRepo::is_repo_root(&sub));
    }

    #[test]
    fn test_open_non_git_dir() {
        let temp = TempDir::new().unwrap();
        let result = GitRepo::open(temp.path());
        assert!(matches!(result, Err(Error::PathInvalid { .. })));
    }

    #[test]
    fn test_dirty_detection() {
        let temp = TempDir::new().unwrap();
        init_repo(temp.path());
        let repo = GitRepo::open(temp.path()).unwrap();
        assert!(!repo.is_dirty(false).unwrap());

        // untracked files only count when asked
        std::fs::write(temp.path().join("new.txt"), "x").unwrap();
        assert!(!repo.is_dirty(false).unwrap());
        assert!(repo.is_dirty(true).unwrap());

        std::fs::write(temp.path().join("README"), "changed\n").unwrap();
        assert!(repo.is_dirty(false).unwrap());
    }

    #[test]
    fn test_current_branch_and_detached() {
        let temp = TempDir::new().unwrap();
        let raw = init_repo(temp.path());
        let repo = GitRepo::open(temp.path()).unwrap();
        assert_eq!(repo.current_branch().unwrap(), Some("master".to_string()));

        let head = raw.head().unwrap().target().unwrap();
        raw.set_head_detached(head).unwrap();
        assert_eq!(repo.current_branch().unwrap(), None);
        assert_eq!(repo.head_commit().unwrap(), Some(head.to_string()));
    }

    #[test]
    fn test_origin_url() {
        let temp = TempDir::new().unwrap();
        let raw = init_repo(temp.path());
        let repo = GitRepo::open(temp.path()).unwrap();
        assert_eq!(repo.origin_url().unwrap(), None);

        raw.remote("origin", "https://example.com/roost.git").unwrap();
        assert_eq!(
            repo.origin_url().unwrap(),
            Some("https://example.com/roost.git".to_string())
        );
    }
}
