//! Dirty/clean and branch polling
//!
//! The tracker never infers state from batch results: status only changes
//! when [`StatusTracker::refresh`] asks git.

use std::time::Duration;

use crate::checkout::CheckoutStatus;
use crate::git::GitClient;
use crate::registry::RepositoryRegistry;

/// Whether the operator is currently looking at the checkouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Focused,
    Unfocused,
}

/// Poll periods per [`Focus`] state
///
/// One knob, `poll_interval`, drives both: the unfocused period is the
/// focused one times `unfocused_factor`. Defaults are 5 s and ×3 (15 s).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    poll_interval: Duration,
    unfocused_factor: u32,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), 3)
    }
}

impl PollSchedule {
    /// `poll_interval` is clamped to at least 100 ms and the factor to at least 1
    pub fn new(poll_interval: Duration, unfocused_factor: u32) -> Self {
        Self {
            poll_interval: poll_interval.max(Duration::from_millis(100)),
            unfocused_factor: unfocused_factor.max(1),
        }
    }

    pub fn focused(&self) -> Duration {
        self.poll_interval
    }

    pub fn unfocused(&self) -> Duration {
        self.poll_interval * self.unfocused_factor
    }

    pub fn interval(&self, focus: Focus) -> Duration {
        match focus {
            Focus::Focused => self.focused(),
            Focus::Unfocused => self.unfocused(),
        }
    }
}

/// What a refresh pass found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Checkouts whose dirty/clean state changed
    pub changed: Vec<String>,
    /// Checkouts whose HEAD moved since the previous refresh
    pub moved: Vec<String>,
    /// Checkouts git could not be queried for
    pub failed: Vec<String>,
}

/// Polls every checkout's working tree state on a focus-dependent period
#[derive(Debug, Clone, Default)]
pub struct StatusTracker {
    schedule: PollSchedule,
    focus: Focus,
}

impl StatusTracker {
    pub fn new(schedule: PollSchedule) -> Self {
        Self {
            schedule,
            focus: Focus::Focused,
        }
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    /// Current poll period
    pub fn interval(&self) -> Duration {
        self.schedule.interval(self.focus)
    }

    /// Switch focus state
    ///
    /// Returns true when focus was gained, in which case the caller should
    /// refresh immediately and restart its timer with [`Self::interval`].
    pub fn set_focus(&mut self, focus: Focus) -> bool {
        let gained = self.focus == Focus::Unfocused && focus == Focus::Focused;
        if self.focus != focus {
            tracing::debug!(?focus, interval = ?self.schedule.interval(focus), "Poll period changed");
        }
        self.focus = focus;
        gained
    }

    /// Query git for every checkout and rewrite status, branch and HEAD
    ///
    /// A checkout git cannot be queried for goes back to `Unknown` and gets
    /// the error recorded in `status_error`; batch errors are left alone.
    pub fn refresh(
        &self,
        registry: &mut RepositoryRegistry,
        client: &dyn GitClient,
    ) -> RefreshSummary {
        let mut summary = RefreshSummary::default();

        for checkout in registry.iter_mut() {
            let path = checkout.path().to_path_buf();
            let probe = client.is_dirty(&path).and_then(|dirty| {
                Ok((
                    dirty,
                    client.active_branch_name(&path)?,
                    client.head_commit(&path)?,
                ))
            });

            match probe {
                Ok((dirty, branch, head)) => {
                    let status = CheckoutStatus::from_dirty(dirty);
                    if status != checkout.status {
                        summary.changed.push(checkout.name().to_string());
                    }
                    if checkout.head.is_some() && head.is_some() && checkout.head != head {
                        summary.moved.push(checkout.name().to_string());
                    }
                    checkout.status = status;
                    checkout.branch = branch;
                    checkout.head = head;
                    checkout.status_error = None;
                }
                Err(e) => {
                    tracing::debug!(checkout = %checkout.name(), "Status refresh failed: {}", e);
                    if checkout.status != CheckoutStatus::Unknown {
                        summary.changed.push(checkout.name().to_string());
                    }
                    checkout.status = CheckoutStatus::Unknown;
                    checkout.status_error = Some(e.to_string());
                    summary.failed.push(checkout.name().to_string());
                }
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::fake::{FakeGitClient, FakeRepo};
    use crate::git::BranchName;

    fn setup() -> (RepositoryRegistry, FakeGitClient) {
        let mut registry = RepositoryRegistry::new();
        registry.restore("a", "/src/a");
        registry.restore("b", "/src/b");
        let client = FakeGitClient::new()
            .with_repo("/src/a", FakeRepo::default())
            .with_repo("/src/b", FakeRepo::default());
        (registry, client)
    }

    #[test]
    fn test_schedule_defaults() {
        let schedule = PollSchedule::default();
        assert_eq!(schedule.interval(Focus::Focused), Duration::from_secs(5));
        assert_eq!(schedule.interval(Focus::Unfocused), Duration::from_secs(15));
    }

    #[test]
    fn test_schedule_clamps() {
        let schedule = PollSchedule::new(Duration::ZERO, 0);
        assert_eq!(schedule.focused(), Duration::from_millis(100));
        assert_eq!(schedule.unfocused(), Duration::from_millis(100));
    }

    #[test]
    fn test_focus_changes_interval() {
        let mut tracker = StatusTracker::new(PollSchedule::default());
        assert_eq!(tracker.interval(), Duration::from_secs(5));

        assert!(!tracker.set_focus(Focus::Unfocused));
        assert_eq!(tracker.interval(), Duration::from_secs(15));

        assert!(tracker.set_focus(Focus::Focused));
        assert!(!tracker.set_focus(Focus::Focused));
    }

    #[test]
    fn test_refresh_moves_unknown_to_clean_or_dirty() {
        let (mut registry, client) = setup();
        client.update("/src/b", |r| {
            r.dirty = true;
            r.current = None;
        });

        let tracker = StatusTracker::default();
        let summary = tracker.refresh(&mut registry, &client);

        assert_eq!(summary.changed, vec!["a".to_string(), "b".to_string()]);
        assert!(summary.moved.is_empty());
        assert_eq!(registry.get("a").unwrap().status, CheckoutStatus::Clean);
        assert_eq!(registry.get("b").unwrap().status, CheckoutStatus::Dirty);
        assert_eq!(
            registry.get("a").unwrap().branch,
            BranchName::Named("master".into())
        );
        assert_eq!(registry.get("b").unwrap().branch, BranchName::Detached);

        // nothing changed on disk: nothing reported
        let again = tracker.refresh(&mut registry, &client);
        assert_eq!(again, RefreshSummary::default());
    }

    #[test]
    fn test_refresh_reports_moved_head() {
        let (mut registry, client) = setup();
        let tracker = StatusTracker::default();
        tracker.refresh(&mut registry, &client);

        client.update("/src/a", |r| r.head += 1);
        let summary = tracker.refresh(&mut registry, &client);
        assert_eq!(summary.moved, vec!["a".to_string()]);
    }

    #[test]
    fn test_refresh_failure_resets_to_unknown() {
        let (mut registry, client) = setup();
        registry.restore("gone", "/src/gone");
        let tracker = StatusTracker::default();

        let summary = tracker.refresh(&mut registry, &client);
        assert_eq!(summary.failed, vec!["gone".to_string()]);
        let gone = registry.get("gone").unwrap();
        assert_eq!(gone.status, CheckoutStatus::Unknown);
        assert!(gone.status_error.is_some());
        assert!(gone.last_error.is_none());
    }

    #[test]
    fn test_refresh_recovery_clears_status_error() {
        let (mut registry, client) = setup();
        registry.get_mut("a").unwrap().last_error = Some("conflict".into());
        registry.restore("late", "/src/late");
        let tracker = StatusTracker::default();

        tracker.refresh(&mut registry, &client);
        assert!(registry.get("late").unwrap().status_error.is_some());

        // the checkout shows up on disk later
        let client = client.with_repo("/src/late", FakeRepo::default());
        let summary = tracker.refresh(&mut registry, &client);

        assert!(summary.failed.is_empty());
        let late = registry.get("late").unwrap();
        assert_eq!(late.status, CheckoutStatus::Clean);
        assert_eq!(late.status_error, None);
        assert_eq!(late.error(), None);
        // a refresh never clears a batch failure
        assert_eq!(registry.get("a").unwrap().last_error.as_deref(), Some("conflict"));
    }
}
