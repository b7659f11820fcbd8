//! Git operations for Roost
//!
//! This module provides repository validation, working tree status, branch
//! management and fast-forward pulls, exposed to the rest of the crate
//! through the [`GitClient`] trait.

mod branch;
mod client;
#[cfg(test)]
pub(crate) mod fake;
mod pull;
mod repo;

pub use branch::BranchRef;
pub use client::{BranchName, Git2Client, GitClient};
pub use pull::PullOutcome;
pub use repo::GitRepo;
