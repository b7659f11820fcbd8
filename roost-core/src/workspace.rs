//! The control-side model: registry, groups and their persistence
//!
//! All structural mutation goes through [`Workspace`], which writes the
//! affected settings keys back to its [`ConfigStore`] after each change.
//! Batch operations read a snapshot, run on the executor, and have their
//! outcomes applied back here on the caller's task.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::batch::{branch_pick_list, BatchEvent, BatchExecutor, BatchResult, ItemOutcome, Operation};
use crate::checkout::{Checkout, Indicator};
use crate::git::GitClient;
use crate::groups::{Group, GroupIndex, GroupSnapshot, ALL_GROUP};
use crate::notifier::UpdateNotifier;
use crate::registry::{RepositoryRegistry, WorkItem};
use crate::selection::{resolve, SelectionEntry, WorkSet};
use crate::settings::{ConfigStore, PersistedState, RepositoryEntry};
use crate::status::{RefreshSummary, StatusTracker};
use crate::Result;

/// Registry, groups and the store they persist to
pub struct Workspace<S: ConfigStore> {
    registry: RepositoryRegistry,
    groups: GroupIndex,
    store: S,
    client: Arc<dyn GitClient>,
}

impl<S: ConfigStore> std::fmt::Debug for Workspace<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("checkouts", &self.registry.len())
            .field("groups", &self.groups.iter().count())
            .finish_non_exhaustive()
    }
}

impl<S: ConfigStore> Workspace<S> {
    /// Load the workspace from `store`
    pub fn open(store: S, client: Arc<dyn GitClient>) -> Self {
        let mut workspace = Self {
            registry: RepositoryRegistry::new(),
            groups: GroupIndex::new(),
            store,
            client,
        };
        workspace.load_from_store();
        workspace
    }

    fn load_from_store(&mut self) {
        let state = PersistedState::load(&self.store);

        let mut registry = RepositoryRegistry::new();
        for (name, entry) in state.repositories {
            registry.restore(name, entry.path);
        }

        self.groups = GroupIndex::from_parts(state.groups, &state.groups_expanded);
        self.registry = registry;

        tracing::debug!(
            checkouts = self.registry.len(),
            groups = self.groups.iter().count(),
            "Loaded settings"
        );
    }

    /// Re-read the store, prune stale group entries and refresh statuses
    pub fn reload(&mut self, tracker: &StatusTracker) -> Result<RefreshSummary> {
        self.load_from_store();
        let pruned = self.groups.prune_unknown(&self.registry.all_names());
        if pruned > 0 {
            tracing::info!(pruned, "Pruned stale group members");
            self.flush_groups()?;
        }
        Ok(self.refresh_status(tracker))
    }

    pub fn registry(&self) -> &RepositoryRegistry {
        &self.registry
    }

    pub fn groups(&self) -> &GroupIndex {
        &self.groups
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn client(&self) -> &Arc<dyn GitClient> {
        &self.client
    }

    pub fn checkout(&self, name: &str) -> Option<&Checkout> {
        self.registry.get(name)
    }

    /// Indicator for a checkout, including the update blink
    pub fn indicator(&self, name: &str, notifier: &UpdateNotifier) -> Option<Indicator> {
        self.registry
            .get(name)
            .map(|c| c.indicator(notifier.is_active(name)))
    }

    /// Register a checkout
    pub fn add_checkout(&mut self, path: impl AsRef<Path>) -> Result<String> {
        let name = self
            .registry
            .add(path.as_ref(), self.client.as_ref())?
            .name()
            .to_string();
        self.flush_repositories()?;
        tracing::info!(checkout = %name, "Added checkout");
        Ok(name)
    }

    /// Register several checkouts, continuing past invalid paths
    pub fn add_checkouts<P: AsRef<Path>>(&mut self, paths: &[P]) -> Vec<(PathBuf, Result<String>)> {
        let mut results = Vec::new();
        let mut added_any = false;

        for path in paths {
            let path = path.as_ref();
            let result = self
                .registry
                .add(path, self.client.as_ref())
                .map(|c| c.name().to_string());
            added_any |= result.is_ok();
            results.push((path.to_path_buf(), result));
        }

        if added_any {
            if let Err(e) = self.flush_repositories() {
                // Surface the flush failure on every entry that was added
                let message = e.to_string();
                for (_, result) in results.iter_mut().filter(|(_, r)| r.is_ok()) {
                    *result = Err(crate::Error::Other(message.clone()));
                }
            }
        }

        results
    }

    /// Remove a checkout from the registry and from every group
    ///
    /// Returns false when no such checkout was registered.
    pub fn remove_checkout(&mut self, name: &str) -> Result<bool> {
        let removed = self.registry.remove(name).is_some();
        self.groups.prune_member(name);

        if removed {
            tracing::info!(checkout = name, "Removed checkout");
        }
        self.flush_repositories()?;
        self.flush_groups()?;
        Ok(removed)
    }

    /// Remove checkouts from a group
    ///
    /// Removing from "All" unregisters the checkouts entirely.
    pub fn remove_from_group<N: AsRef<str>>(&mut self, group: &str, names: &[N]) -> Result<usize> {
        if group == ALL_GROUP {
            let mut removed = 0;
            for name in names {
                if self.remove_checkout(name.as_ref())? {
                    removed += 1;
                }
            }
            return Ok(removed);
        }

        let removed = self.groups.remove_members(group, names)?;
        self.flush_groups()?;
        Ok(removed)
    }

    /// Add registered checkouts to each of `groups`
    ///
    /// Names that are not registered are ignored. Every target group is
    /// checked before any is changed, so a rejected call changes nothing.
    pub fn add_to_groups<G: AsRef<str>, N: AsRef<str>>(
        &mut self,
        groups: &[G],
        names: &[N],
    ) -> Result<usize> {
        let known: Vec<&str> = names
            .iter()
            .map(AsRef::as_ref)
            .filter(|n| self.registry.contains(n))
            .collect();

        for group in groups {
            let group = group.as_ref();
            if group == ALL_GROUP {
                return Err(crate::Error::ProtectedGroup(group.to_string()));
            }
            if self.groups.get(group).is_none() {
                return Err(crate::Error::GroupNotFound(group.to_string()));
            }
        }

        let mut added = 0;
        for group in groups {
            added += self.groups.add_members(group.as_ref(), &known)?;
        }
        self.flush_groups()?;
        Ok(added)
    }

    pub fn create_group(&mut self, name: &str) -> Result<Group> {
        let group = self.groups.create(name)?.clone();
        self.flush_groups()?;
        Ok(group)
    }

    pub fn rename_group(&mut self, old: &str, new: &str) -> Result<Group> {
        let group = self.groups.rename(old, new)?.clone();
        self.flush_groups()?;
        self.flush_expanded()?;
        Ok(group)
    }

    pub fn delete_group(&mut self, name: &str) -> Result<Group> {
        let group = self.groups.delete(name)?;
        self.flush_groups()?;
        self.flush_expanded()?;
        Ok(group)
    }

    pub fn set_expanded(&mut self, name: &str, expanded: bool) -> Result<()> {
        self.groups.set_expanded(name, expanded)?;
        self.flush_expanded()
    }

    /// Membership snapshot for resolving a selection
    pub fn snapshot(&self) -> GroupSnapshot {
        self.groups.snapshot(self.registry.all_names())
    }

    /// Expand a selection into a work-set
    pub fn resolve(&self, selection: &[SelectionEntry]) -> Result<WorkSet> {
        resolve(selection, &self.snapshot())
    }

    /// Branch names offered for switching `work_set`
    ///
    /// Checkouts git cannot list branches for are left out.
    pub fn branch_pick_list(&self, work_set: &WorkSet) -> Vec<String> {
        let lists = self
            .registry
            .work_items(work_set)
            .into_iter()
            .filter_map(|item| match self.client.list_branches(&item.path) {
                Ok(branches) => Some(branches),
                Err(e) => {
                    tracing::debug!(checkout = %item.name, "Cannot list branches: {}", e);
                    None
                }
            });
        branch_pick_list(lists)
    }

    /// Refresh dirty/branch state for every checkout
    pub fn refresh_status(&mut self, tracker: &StatusTracker) -> RefreshSummary {
        tracker.refresh(&mut self.registry, self.client.as_ref())
    }

    /// Resolve `selection`, run `operation` over it and apply the outcomes
    ///
    /// Progress events are applied as they arrive, and `progress` sees each
    /// one together with the updated checkout. Checkouts fast-forwarded by a
    /// pull are triggered on `notifier` for `blink_cycles` ticks.
    pub async fn run_batch<F>(
        &mut self,
        executor: &BatchExecutor,
        selection: &[SelectionEntry],
        operation: Operation,
        notifier: &mut UpdateNotifier,
        blink_cycles: u32,
        mut progress: F,
    ) -> Result<BatchResult>
    where
        F: FnMut(&BatchEvent, &Checkout),
    {
        let work_set = self.resolve(selection)?;
        let items = self.begin_batch(&work_set);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let run = executor.run(items, operation, Some(tx));
        tokio::pin!(run);

        let result = loop {
            tokio::select! {
                biased;
                Some(event) = rx.recv() => self.handle_event(&event, &mut progress),
                result = &mut run => break result,
            }
        };

        while let Ok(event) = rx.try_recv() {
            self.handle_event(&event, &mut progress);
        }
        self.apply_result(&result, notifier, blink_cycles);

        Ok(result)
    }

    fn handle_event<F>(&mut self, event: &BatchEvent, progress: &mut F)
    where
        F: FnMut(&BatchEvent, &Checkout),
    {
        self.apply_event(event);
        let name = match event {
            BatchEvent::Started(name) | BatchEvent::Finished(name) => name,
        };
        if let Some(checkout) = self.registry.get(name) {
            progress(event, checkout);
        }
    }

    /// Snapshot a work-set and mark its checkouts busy
    pub fn begin_batch(&mut self, work_set: &WorkSet) -> Vec<WorkItem> {
        let items = self.registry.work_items(work_set);
        for item in &items {
            if let Some(checkout) = self.registry.get_mut(&item.name) {
                checkout.busy = true;
            }
        }
        items
    }

    /// Reflect a progress event on the busy flag
    pub fn apply_event(&mut self, event: &BatchEvent) {
        let (name, busy) = match event {
            BatchEvent::Started(name) => (name, true),
            BatchEvent::Finished(name) => (name, false),
        };
        if let Some(checkout) = self.registry.get_mut(name) {
            checkout.busy = busy;
        }
    }

    /// Write batch outcomes back onto the checkouts
    ///
    /// Checkouts removed while the batch ran are ignored.
    pub fn apply_result(
        &mut self,
        result: &BatchResult,
        notifier: &mut UpdateNotifier,
        blink_cycles: u32,
    ) {
        for (name, outcome) in &result.outcomes {
            let Some(checkout) = self.registry.get_mut(name) else {
                continue;
            };
            checkout.busy = false;
            match outcome {
                ItemOutcome::Done { branch, updated } => {
                    checkout.branch = branch.clone();
                    checkout.last_error = None;
                    if *updated {
                        notifier.trigger(name, blink_cycles);
                    }
                }
                ItemOutcome::Skipped(_) => checkout.last_error = None,
                ItemOutcome::Failed(message) => checkout.last_error = Some(message.clone()),
            }
        }
    }

    fn flush_repositories(&mut self) -> Result<()> {
        let state = PersistedState {
            repositories: self
                .registry
                .iter()
                .map(|c| {
                    (
                        c.name().to_string(),
                        RepositoryEntry {
                            path: c.path().to_path_buf(),
                        },
                    )
                })
                .collect(),
            ..Default::default()
        };
        state.save_repositories(&mut self.store)
    }

    fn flush_groups(&mut self) -> Result<()> {
        let groups: BTreeMap<String, Vec<String>> = self
            .groups
            .iter()
            .map(|g| (g.name().to_string(), g.members().to_vec()))
            .collect();
        let state = PersistedState {
            groups,
            ..Default::default()
        };
        state.save_groups(&mut self.store)
    }

    fn flush_expanded(&mut self) -> Result<()> {
        let state = PersistedState {
            groups_expanded: self.groups.expanded_names(),
            ..Default::default()
        };
        state.save_expanded(&mut self.store)
    }
}
