//! Fast-forward pull from `origin`

use git2::{build::CheckoutBuilder, Cred, CredentialType, FetchOptions, RemoteCallbacks};

use super::repo::GitRepo;
use crate::{Error, Result};

/// Remote pulled from
const PULL_REMOTE: &str = "origin";

/// What a pull did to a checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    /// Already at the remote commit
    UpToDate,
    /// Branch was fast-forwarded
    FastForwarded,
    /// No `origin` remote configured; nothing attempted
    NoRemote,
}

impl GitRepo {
    /// Fetch the current branch from `origin` and fast-forward to it
    ///
    /// Histories that diverged are reported as an error; no merge is made.
    pub fn pull(&self) -> Result<PullOutcome> {
        let repo = self.inner();

        let mut remote = match repo.find_remote(PULL_REMOTE) {
            Ok(remote) => remote,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(PullOutcome::NoRemote),
            Err(e) => {
                return Err(Error::GitOperation(format!(
                    "Remote '{}' unusable: {}",
                    PULL_REMOTE,
                    e.message()
                )))
            }
        };

        let head = repo
            .head()
            .map_err(|e| Error::GitOperation(format!("Failed to get HEAD: {}", e.message())))?;
        if !head.is_branch() {
            return Err(Error::GitOperation(
                "HEAD is detached; check out a branch before pulling".to_string(),
            ));
        }
        let branch = head
            .shorthand()
            .ok_or_else(|| Error::GitOperation("Branch name is not valid UTF-8".to_string()))?
            .to_string();

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(credential_callbacks());

        remote
            .fetch(&[branch.as_str()], Some(&mut fetch_options), None)
            .map_err(|e| Error::GitOperation(format!("Fetch failed: {}", e.message())))?;

        let fetch_head = repo
            .find_reference("FETCH_HEAD")
            .map_err(|e| Error::GitOperation(format!("Nothing fetched for '{}': {}", branch, e.message())))?;
        let incoming = repo.reference_to_annotated_commit(&fetch_head)?;

        let (analysis, _) = repo.merge_analysis(&[&incoming])?;

        if analysis.is_up_to_date() {
            return Ok(PullOutcome::UpToDate);
        }

        if !analysis.is_fast_forward() {
            return Err(Error::GitOperation(format!(
                "'{}' has diverged from {}/{}; fast-forward not possible",
                branch, PULL_REMOTE, branch
            )));
        }

        let refname = format!("refs/heads/{}", branch);
        let mut reference = repo.find_reference(&refname)?;
        let target = repo.find_object(incoming.id(), None)?;

        let mut checkout = CheckoutBuilder::new();
        checkout.safe();
        repo.checkout_tree(&target, Some(&mut checkout))
            .map_err(|e| Error::GitOperation(format!("Checkout after fetch failed: {}", e.message())))?;

        reference.set_target(incoming.id(), &format!("roost: fast-forward {}", branch))?;
        repo.set_head(&refname)?;

        tracing::debug!(branch = %branch, root = %self.root().display(), "Fast-forwarded");

        Ok(PullOutcome::FastForwarded)
    }
}

/// Credentials from the ssh agent or the git credential helper
fn credential_callbacks<'a>() -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(|url, username, allowed| {
        if allowed.contains(CredentialType::SSH_KEY) {
            Cred::ssh_key_from_agent(username.unwrap_or("git"))
        } else if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) {
            let config = git2::Config::open_default()?;
            Cred::credential_helper(&config, url, username)
        } else {
            Cred::default()
        }
    });
    callbacks.transfer_progress(|_| true);
    callbacks
}
