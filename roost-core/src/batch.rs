//! Concurrent batch operations over a work-set
//!
//! Every checkout in the work-set gets its own task. Tasks run the blocking
//! git calls on tokio's blocking pool, bounded by a semaphore, and only ever
//! see an immutable [`WorkItem`]. [`BatchExecutor::run`] is the join barrier:
//! it returns once every task has reported, and the caller applies the
//! outcomes back onto the registry.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

use crate::git::{BranchName, GitClient, PullOutcome};
use crate::registry::WorkItem;

/// Branch promoted in the set-branch pick list
const PROMOTED_BRANCH: &str = "master";

/// The action applied to every checkout of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Fast-forward from `origin`
    Pull,
    /// Switch to `name`, creating it first when `force` is set
    SetBranch { name: String, force: bool },
    /// Create `name` at HEAD without switching
    CreateBranch { name: String },
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Pull => write!(f, "pull"),
            Operation::SetBranch { name, force: false } => write!(f, "set branch '{}'", name),
            Operation::SetBranch { name, force: true } => {
                write!(f, "set branch '{}' (force)", name)
            }
            Operation::CreateBranch { name } => write!(f, "create branch '{}'", name),
        }
    }
}

/// Why an item was left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Working tree had uncommitted modifications
    Dirty,
    /// No `origin` remote to pull from
    NoRemote,
    /// Branch to switch to does not exist and force was not set
    BranchMissing,
    /// Branch to create already exists
    BranchExists,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::Dirty => "working tree is dirty",
            SkipReason::NoRemote => "no origin remote",
            SkipReason::BranchMissing => "branch does not exist",
            SkipReason::BranchExists => "branch already exists",
        };
        write!(f, "{}", reason)
    }
}

/// Result for one checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Operation applied; `branch` is the branch checked out afterwards
    Done { branch: BranchName, updated: bool },
    /// Nothing to do for this checkout; counts as success
    Skipped(SkipReason),
    /// Git reported an error
    Failed(String),
}

impl ItemOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ItemOutcome::Failed(_))
    }

    /// Error message to store on the checkout, `None` on success
    pub fn error(&self) -> Option<&str> {
        match self {
            ItemOutcome::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Progress sent to the control side while a batch runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    Started(String),
    Finished(String),
}

/// Outcome of every checkout in a batch
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub operation: Operation,
    pub outcomes: BTreeMap<String, ItemOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchResult {
    /// One `(checkout, message)` per failing checkout
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes
            .iter()
            .filter_map(|(name, outcome)| outcome.error().map(|e| (name.as_str(), e)))
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.values().any(ItemOutcome::is_failure)
    }

    /// Checkouts a pull moved forward
    pub fn updated(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().filter_map(|(name, outcome)| match outcome {
            ItemOutcome::Done { updated: true, .. } => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&str, SkipReason)> {
        self.outcomes.iter().filter_map(|(name, outcome)| match outcome {
            ItemOutcome::Skipped(reason) => Some((name.as_str(), *reason)),
            _ => None,
        })
    }

    /// Aggregated report: one line per failing checkout
    pub fn report(&self) -> BatchReport<'_> {
        BatchReport { result: self }
    }
}

/// Display adapter for [`BatchResult::report`]
pub struct BatchReport<'a> {
    result: &'a BatchResult,
}

impl fmt::Display for BatchReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = self.result;
        let failed = result.failures().count();
        let elapsed = result.finished_at - result.started_at;

        writeln!(
            f,
            "{}: {} checkout(s), {} failed ({} ms)",
            result.operation,
            result.outcomes.len(),
            failed,
            elapsed.num_milliseconds()
        )?;
        for (name, message) in result.failures() {
            writeln!(f, "  {}: {}", name, message)?;
        }
        Ok(())
    }
}

/// Runs an [`Operation`] over a work-set with a bounded number of workers
#[derive(Clone)]
pub struct BatchExecutor {
    client: Arc<dyn GitClient>,
    max_workers: usize,
}

impl fmt::Debug for BatchExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchExecutor")
            .field("max_workers", &self.max_workers)
            .finish_non_exhaustive()
    }
}

impl BatchExecutor {
    /// Create an executor; `max_workers` of zero is treated as one
    pub fn new(client: Arc<dyn GitClient>, max_workers: usize) -> Self {
        Self {
            client,
            max_workers: max_workers.max(1),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Apply `operation` to every item and wait for all of them
    ///
    /// A failing item never affects its siblings. Items whose task dies
    /// without reporting are recorded as failed.
    pub async fn run(
        &self,
        items: Vec<WorkItem>,
        operation: Operation,
        events: Option<mpsc::UnboundedSender<BatchEvent>>,
    ) -> BatchResult {
        let started_at = Utc::now();
        let permits = Arc::new(Semaphore::new(self.max_workers));
        let expected: Vec<String> = items.iter().map(|i| i.name.clone()).collect();
        let mut tasks = JoinSet::new();

        tracing::info!(
            operation = %operation,
            checkouts = items.len(),
            workers = self.max_workers,
            "Starting batch"
        );

        for item in items {
            let permits = Arc::clone(&permits);
            let client = Arc::clone(&self.client);
            let operation = operation.clone();
            let events = events.clone();

            tasks.spawn(async move {
                // The semaphore is never closed, so a permit always arrives.
                let _permit = permits.acquire_owned().await.ok();
                let name = item.name.clone();

                if let Some(tx) = &events {
                    let _ = tx.send(BatchEvent::Started(name.clone()));
                }

                let outcome = match tokio::task::spawn_blocking(move || {
                    apply(client.as_ref(), &item, &operation)
                })
                .await
                {
                    Ok(outcome) => outcome,
                    Err(e) => ItemOutcome::Failed(format!("worker failed: {}", e)),
                };

                if let Some(tx) = &events {
                    let _ = tx.send(BatchEvent::Finished(name.clone()));
                }

                (name, outcome)
            });
        }

        let mut outcomes = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((name, outcome)) => {
                    if let ItemOutcome::Failed(message) = &outcome {
                        tracing::warn!(checkout = %name, "{}", message);
                    }
                    outcomes.insert(name, outcome);
                }
                Err(e) => tracing::error!("Batch task aborted: {}", e),
            }
        }

        for name in expected {
            outcomes
                .entry(name)
                .or_insert_with(|| ItemOutcome::Failed("task aborted before reporting".to_string()));
        }

        let result = BatchResult {
            operation,
            outcomes,
            started_at,
            finished_at: Utc::now(),
        };

        tracing::info!(
            operation = %result.operation,
            failed = result.failures().count(),
            "Batch finished"
        );

        result
    }
}

/// Apply one operation to one checkout (runs on the blocking pool)
pub fn apply(client: &dyn GitClient, item: &WorkItem, operation: &Operation) -> ItemOutcome {
    let path = item.path.as_path();

    let result = match operation {
        Operation::Pull => pull(client, path),
        Operation::SetBranch { name, force } => set_branch(client, path, name, *force),
        Operation::CreateBranch { name } => create_branch(client, path, name),
    };

    match result {
        Ok(outcome) => {
            if let ItemOutcome::Skipped(reason) = &outcome {
                tracing::debug!(checkout = %item.name, %reason, "Skipped");
            }
            outcome
        }
        Err(e) => ItemOutcome::Failed(e.to_string()),
    }
}

fn pull(client: &dyn GitClient, path: &std::path::Path) -> crate::Result<ItemOutcome> {
    if client.is_dirty(path)? {
        return Ok(ItemOutcome::Skipped(SkipReason::Dirty));
    }

    let updated = match client.pull(path)? {
        PullOutcome::NoRemote => return Ok(ItemOutcome::Skipped(SkipReason::NoRemote)),
        PullOutcome::UpToDate => false,
        PullOutcome::FastForwarded => true,
    };

    Ok(ItemOutcome::Done {
        branch: client.active_branch_name(path)?,
        updated,
    })
}

fn set_branch(
    client: &dyn GitClient,
    path: &std::path::Path,
    name: &str,
    force: bool,
) -> crate::Result<ItemOutcome> {
    let exists = client.list_branches(path)?.iter().any(|b| b == name);

    if !exists {
        if !force {
            return Ok(ItemOutcome::Skipped(SkipReason::BranchMissing));
        }
        client.create_branch(path, name)?;
    }

    client.checkout_branch(path, name)?;

    Ok(ItemOutcome::Done {
        branch: client.active_branch_name(path)?,
        updated: false,
    })
}

fn create_branch(
    client: &dyn GitClient,
    path: &std::path::Path,
    name: &str,
) -> crate::Result<ItemOutcome> {
    if client.list_branches(path)?.iter().any(|b| b == name) {
        return Ok(ItemOutcome::Skipped(SkipReason::BranchExists));
    }

    client.create_branch(path, name)?;

    Ok(ItemOutcome::Done {
        branch: client.active_branch_name(path)?,
        updated: false,
    })
}

/// Union of branch names offered when switching a work-set
///
/// Names keep the order they were first seen in. If "master" is among them
/// it is moved to the second slot, right after the first name seen.
pub fn branch_pick_list<I, L>(branch_lists: I) -> Vec<String>
where
    I: IntoIterator<Item = L>,
    L: IntoIterator<Item = String>,
{
    let mut names: Vec<String> = Vec::new();
    for list in branch_lists {
        for name in list {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }

    if let Some(pos) = names.iter().position(|n| n == PROMOTED_BRANCH) {
        let promoted = names.remove(pos);
        names.insert(names.len().min(1), promoted);
    }

    names
}
