//! Expanding a mixed selection of checkouts and groups into a work-set

use std::collections::BTreeSet;
use std::fmt;

use crate::groups::GroupSnapshot;
use crate::{Error, Result};

/// Deduplicated set of checkout names a batch operation runs over
pub type WorkSet = BTreeSet<String>;

/// One entry of an operator selection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SelectionEntry {
    /// A single checkout, by name
    Checkout(String),
    /// Every member of a group, by group name ("All" included)
    Group(String),
}

impl SelectionEntry {
    pub fn checkout(name: impl Into<String>) -> Self {
        SelectionEntry::Checkout(name.into())
    }

    pub fn group(name: impl Into<String>) -> Self {
        SelectionEntry::Group(name.into())
    }

    /// Call `f` for every registered checkout this entry stands for
    ///
    /// Checkout names that are not registered are skipped; an unknown group
    /// is an error.
    pub fn for_each_checkout<F>(&self, snapshot: &GroupSnapshot, mut f: F) -> Result<()>
    where
        F: FnMut(&str),
    {
        match self {
            SelectionEntry::Checkout(name) => {
                if snapshot.is_registered(name) {
                    f(name);
                } else {
                    tracing::debug!(checkout = %name, "Skipping unregistered checkout");
                }
            }
            SelectionEntry::Group(group) => {
                let members = snapshot
                    .members(group)
                    .ok_or_else(|| Error::GroupNotFound(group.clone()))?;
                for member in members {
                    f(member);
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for SelectionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionEntry::Checkout(name) => write!(f, "{}", name),
            SelectionEntry::Group(name) => write!(f, "group:{}", name),
        }
    }
}

/// Expand `selection` against a membership snapshot
///
/// The result does not depend on entry order, and a checkout reachable
/// several ways appears once.
pub fn resolve(selection: &[SelectionEntry], snapshot: &GroupSnapshot) -> Result<WorkSet> {
    let mut work_set = WorkSet::new();
    for entry in selection {
        entry.for_each_checkout(snapshot, |name| {
            work_set.insert(name.to_string());
        })?;
    }
    Ok(work_set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groups::GroupIndex;

    fn snapshot() -> GroupSnapshot {
        let mut index = GroupIndex::new();
        index.create("web").unwrap();
        index.add_members("web", &["site", "cdn", "removed"]).unwrap();
        index.create("ops").unwrap();
        index.add_members("ops", &["cdn", "infra"]).unwrap();

        index.snapshot(
            ["site", "cdn", "infra", "api"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }

    fn set(list: &[&str]) -> WorkSet {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_checkout_in_group_counts_once() {
        let snapshot = snapshot();
        let with_member = resolve(
            &[SelectionEntry::group("web"), SelectionEntry::checkout("site")],
            &snapshot,
        )
        .unwrap();
        let group_only = resolve(&[SelectionEntry::group("web")], &snapshot).unwrap();

        assert_eq!(with_member, group_only);
        assert_eq!(group_only, set(&["site", "cdn"]));
    }

    #[test]
    fn test_order_does_not_matter() {
        let snapshot = snapshot();
        let a = resolve(
            &[
                SelectionEntry::checkout("api"),
                SelectionEntry::group("ops"),
                SelectionEntry::group("web"),
            ],
            &snapshot,
        )
        .unwrap();
        let b = resolve(
            &[
                SelectionEntry::group("web"),
                SelectionEntry::group("ops"),
                SelectionEntry::checkout("api"),
            ],
            &snapshot,
        )
        .unwrap();

        assert_eq!(a, b);
        assert_eq!(a, set(&["api", "cdn", "infra", "site"]));
    }

    #[test]
    fn test_all_expands_to_registry() {
        let snapshot = snapshot();
        let all = resolve(&[SelectionEntry::group("All")], &snapshot).unwrap();
        assert_eq!(all, set(&["api", "cdn", "infra", "site"]));
    }

    #[test]
    fn test_stale_and_unknown_checkouts_are_skipped() {
        let snapshot = snapshot();
        let work_set = resolve(
            &[
                SelectionEntry::checkout("removed"),
                SelectionEntry::checkout("ghost"),
            ],
            &snapshot,
        )
        .unwrap();
        assert!(work_set.is_empty());
    }

    #[test]
    fn test_unknown_group_is_an_error() {
        let snapshot = snapshot();
        let err = resolve(&[SelectionEntry::group("nope")], &snapshot).unwrap_err();
        assert!(matches!(err, Error::GroupNotFound(name) if name == "nope"));
    }

    #[test]
    fn test_snapshot_is_not_a_live_view() {
        let mut index = GroupIndex::new();
        index.create("web").unwrap();
        index.add_members("web", &["site"]).unwrap();
        let snapshot = index.snapshot(set(&["site", "cdn"]));

        index.add_members("web", &["cdn"]).unwrap();
        let work_set = resolve(&[SelectionEntry::group("web")], &snapshot).unwrap();
        assert_eq!(work_set, set(&["site"]));
    }
}
