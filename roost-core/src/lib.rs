//! Roost Core - Core library for managing groups of local git checkouts
//!
//! This crate provides the checkout registry, user-defined groups with the
//! synthetic "All" group, selection resolution, a bounded concurrent batch
//! executor for pull and branch operations, and status polling.

pub mod batch;
pub mod checkout;
pub mod config;
pub mod error;
pub mod git;
pub mod groups;
pub mod notifier;
pub mod registry;
pub mod selection;
pub mod settings;
pub mod status;
pub mod workspace;

pub use batch::{BatchEvent, BatchExecutor, BatchResult, ItemOutcome, Operation, SkipReason};
pub use checkout::{Checkout, CheckoutStatus, Indicator};
pub use config::Config;
pub use error::{Error, Result};
pub use git::{BranchName, Git2Client, GitClient};
pub use groups::{Group, GroupIndex, GroupSnapshot, ALL_GROUP};
pub use notifier::UpdateNotifier;
pub use registry::{RepositoryRegistry, WorkItem};
pub use selection::{resolve, SelectionEntry, WorkSet};
pub use settings::{ConfigStore, FileConfigStore, MemoryConfigStore};
pub use status::{Focus, PollSchedule, RefreshSummary, StatusTracker};
pub use workspace::Workspace;
