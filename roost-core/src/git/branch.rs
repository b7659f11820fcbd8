//! Local branch listing, creation and checkout

use git2::{build::CheckoutBuilder, BranchType};

use super::repo::GitRepo;
use crate::{Error, Result};

/// A local branch as returned by branch creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef {
    /// Branch name (e.g., "main")
    pub name: String,
    /// Commit SHA the branch points at
    pub commit: String,
    /// Whether this call created the branch
    pub created: bool,
}

impl GitRepo {
    /// List all local branches
    pub fn list_local_branches(&self) -> Result<Vec<String>> {
        let mut branches = Vec::new();

        for branch in self
            .inner()
            .branches(Some(BranchType::Local))
            .map_err(|e| Error::GitOperation(format!("Failed to list branches: {}", e.message())))?
        {
            let (branch, _) = branch
                .map_err(|e| Error::GitOperation(format!("Failed to read branch: {}", e.message())))?;
            if let Some(name) = branch.name().ok().flatten() {
                branches.push(name.to_string());
            }
        }

        Ok(branches)
    }

    /// Check whether a local branch exists
    pub fn has_local_branch(&self, name: &str) -> bool {
        self.inner().find_branch(name, BranchType::Local).is_ok()
    }

    /// Create a local branch at HEAD
    ///
    /// Returns the existing branch untouched if one with this name exists.
    pub fn create_branch(&self, name: &str) -> Result<BranchRef> {
        let repo = self.inner();

        if let Ok(existing) = repo.find_branch(name, BranchType::Local) {
            let commit = existing
                .get()
                .peel_to_commit()
                .map_err(|e| Error::GitOperation(format!("Failed to resolve {}: {}", name, e.message())))?;
            return Ok(BranchRef {
                name: name.to_string(),
                commit: commit.id().to_string(),
                created: false,
            });
        }

        let head = repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .map_err(|e| {
                Error::GitOperation(format!(
                    "Cannot create '{}' without a HEAD commit: {}",
                    name,
                    e.message()
                ))
            })?;

        let branch = repo.branch(name, &head, false).map_err(|e| {
            Error::GitOperation(format!("Failed to create branch '{}': {}", name, e.message()))
        })?;

        tracing::debug!(branch = name, root = %self.root().display(), "Created branch");

        Ok(BranchRef {
            name: name.to_string(),
            commit: branch
                .get()
                .target()
                .map(|oid| oid.to_string())
                .unwrap_or_else(|| head.id().to_string()),
            created: true,
        })
    }

    /// Check out a local branch
    ///
    /// Uses a safe checkout: local modifications that would be overwritten
    /// make the checkout fail instead of being discarded.
    pub fn checkout_branch(&self, name: &str) -> Result<()> {
        let repo = self.inner();
        if !self.has_local_branch(name) {
            return Err(Error::GitOperation(format!("Branch '{}' not found", name)));
        }

        let refname = format!("refs/heads/{}", name);
        let target = repo
            .revparse_single(&refname)
            .map_err(|e| Error::GitOperation(format!("Failed to resolve '{}': {}", name, e.message())))?;

        let mut checkout = CheckoutBuilder::new();
        checkout.safe();

        repo.checkout_tree(&target, Some(&mut checkout))
            .map_err(|e| Error::GitOperation(format!("Checkout of '{}' failed: {}", name, e.message())))?;

        repo.set_head(&refname)
            .map_err(|e| Error::GitOperation(format!("Failed to move HEAD to '{}': {}", name, e.message())))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::repo::test_support::{commit_all, init_repo};
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_list_branches() {
        let temp = TempDir::new().unwrap();
        init_repo(temp.path());
        let repo = GitRepo::open(temp.path()).unwrap();

        assert_eq!(repo.list_local_branches().unwrap(), vec!["master".to_string()]);
    }

    #[test]
    fn test_create_branch_is_idempotent() {
        let temp = TempDir::new().unwrap();
        init_repo(temp.path());
        let repo = GitRepo::open(temp.path()).unwrap();

        let first = repo.create_branch("feature").unwrap();
        assert!(first.created);
        assert!(repo.has_local_branch("feature"));

        let second = repo.create_branch("feature").unwrap();
        assert!(!second.created);
        assert_eq!(first.commit, second.commit);
        // creating does not switch
        assert_eq!(repo.current_branch().unwrap(), Some("master".to_string()));
    }

    #[test]
    fn test_checkout_branch() {
        let temp = TempDir::new().unwrap();
        let raw = init_repo(temp.path());
        let repo = GitRepo::open(temp.path()).unwrap();

        repo.create_branch("release").unwrap();
        repo.checkout_branch("release").unwrap();
        assert_eq!(repo.current_branch().unwrap(), Some("release".to_string()));

        std::fs::write(temp.path().join("release.txt"), "r\n").unwrap();
        commit_all(&raw, "release only");

        repo.checkout_branch("master").unwrap();
        assert_eq!(repo.current_branch().unwrap(), Some("master".to_string()));
        assert!(!temp.path().join("release.txt").exists());
    }

    #[test]
    fn test_checkout_missing_branch_fails() {
        let temp = TempDir::new().unwrap();
        init_repo(temp.path());
        let repo = GitRepo::open(temp.path()).unwrap();

        let err = repo.checkout_branch("nope").unwrap_err();
        assert!(matches!(err, Error::GitOperation(ref m) if m == "Branch 'nope' not found"));
        assert_eq!(repo.current_branch().unwrap(), Some("master".to_string()));
    }
}
