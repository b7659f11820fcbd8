//! Named, overlapping groups of checkouts
//!
//! Groups hold checkout *names*, never checkouts. The synthetic [`ALL_GROUP`]
//! has no stored membership: it is whatever the registry holds at the time
//! a [`GroupSnapshot`] is taken.

use std::collections::{BTreeMap, BTreeSet};

use crate::{Error, Result};

/// Name of the synthetic group containing every registered checkout
pub const ALL_GROUP: &str = "All";

/// A user-defined group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    name: String,
    members: Vec<String>,
    expanded: bool,
}

impl Group {
    fn new(name: String) -> Self {
        Self {
            name,
            members: Vec::new(),
            expanded: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member names in insertion order; may contain stale names
    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn contains(&self, checkout: &str) -> bool {
        self.members.iter().any(|m| m == checkout)
    }
}

/// Read-only copy of every group's membership, "All" included
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupSnapshot {
    groups: BTreeMap<String, BTreeSet<String>>,
    all: BTreeSet<String>,
}

impl GroupSnapshot {
    /// Members of `group`; stale names are left out
    pub fn members(&self, group: &str) -> Option<&BTreeSet<String>> {
        if group == ALL_GROUP {
            return Some(&self.all);
        }
        self.groups.get(group)
    }

    /// Every registered checkout
    pub fn all(&self) -> &BTreeSet<String> {
        &self.all
    }

    pub fn is_registered(&self, checkout: &str) -> bool {
        self.all.contains(checkout)
    }

    /// Group name to member set, "All" included
    pub fn resolve_all(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut map = self.groups.clone();
        map.insert(ALL_GROUP.to_string(), self.all.clone());
        map
    }
}

/// Owns the user-defined groups and the expanded flag of "All"
#[derive(Debug, Clone, Default)]
pub struct GroupIndex {
    groups: BTreeMap<String, Group>,
    all_expanded: bool,
}

impl GroupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted data
    ///
    /// Duplicate members are kept as stored. Expanded names that do not name
    /// a group are dropped.
    pub fn from_parts(
        groups: impl IntoIterator<Item = (String, Vec<String>)>,
        expanded: &[String],
    ) -> Self {
        let mut index = Self::new();
        for (name, members) in groups {
            if name == ALL_GROUP {
                tracing::warn!("Ignoring stored membership for the '{}' group", ALL_GROUP);
                continue;
            }
            let mut group = Group::new(name.clone());
            group.members = members;
            index.groups.insert(name, group);
        }
        for name in expanded {
            let _ = index.set_expanded(name, true);
        }
        index
    }

    /// Create an empty group
    pub fn create(&mut self, name: &str) -> Result<&Group> {
        let name = validate_name(name)?;
        if name == ALL_GROUP || self.groups.contains_key(name) {
            return Err(Error::DuplicateName(name.to_string()));
        }

        tracing::info!(group = name, "Created group");
        let group = self
            .groups
            .entry(name.to_string())
            .or_insert_with(|| Group::new(name.to_string()));
        Ok(&*group)
    }

    /// Rename a group, keeping its members and expanded flag
    pub fn rename(&mut self, old: &str, new: &str) -> Result<&Group> {
        if old == ALL_GROUP {
            return Err(Error::ProtectedGroup(old.to_string()));
        }
        let new = validate_name(new)?;
        if !self.groups.contains_key(old) {
            return Err(Error::GroupNotFound(old.to_string()));
        }
        if new == ALL_GROUP || self.groups.contains_key(new) {
            return Err(Error::DuplicateName(new.to_string()));
        }

        let mut group = self
            .groups
            .remove(old)
            .ok_or_else(|| Error::GroupNotFound(old.to_string()))?;
        group.name = new.to_string();

        tracing::info!(from = old, to = new, "Renamed group");
        let group = self.groups.entry(new.to_string()).or_insert(group);
        Ok(&*group)
    }

    /// Delete a group and its membership list
    pub fn delete(&mut self, name: &str) -> Result<Group> {
        if name == ALL_GROUP {
            return Err(Error::ProtectedGroup(name.to_string()));
        }
        let group = self
            .groups
            .remove(name)
            .ok_or_else(|| Error::GroupNotFound(name.to_string()))?;

        tracing::info!(group = name, "Deleted group");
        Ok(group)
    }

    /// Append checkouts not already members
    ///
    /// Returns how many names were appended.
    pub fn add_members<S: AsRef<str>>(&mut self, name: &str, checkouts: &[S]) -> Result<usize> {
        let group = self.group_mut(name)?;
        let mut added = 0;
        for checkout in checkouts {
            let checkout = checkout.as_ref();
            if !group.contains(checkout) {
                group.members.push(checkout.to_string());
                added += 1;
            }
        }
        Ok(added)
    }

    /// Remove every occurrence of the given checkouts
    ///
    /// Returns how many entries were removed.
    pub fn remove_members<S: AsRef<str>>(&mut self, name: &str, checkouts: &[S]) -> Result<usize> {
        let group = self.group_mut(name)?;
        let before = group.members.len();
        group
            .members
            .retain(|m| !checkouts.iter().any(|c| c.as_ref() == m));
        Ok(before - group.members.len())
    }

    /// Drop a checkout from every group
    pub fn prune_member(&mut self, checkout: &str) {
        for group in self.groups.values_mut() {
            group.members.retain(|m| m != checkout);
        }
    }

    /// Drop members that are not registered checkouts
    ///
    /// Returns how many entries were removed.
    pub fn prune_unknown(&mut self, known: &BTreeSet<String>) -> usize {
        let mut pruned = 0;
        for group in self.groups.values_mut() {
            let before = group.members.len();
            group.members.retain(|m| known.contains(m));
            pruned += before - group.members.len();
        }
        pruned
    }

    /// Record whether a group is expanded; valid for "All"
    pub fn set_expanded(&mut self, name: &str, expanded: bool) -> Result<()> {
        if name == ALL_GROUP {
            self.all_expanded = expanded;
            return Ok(());
        }
        self.group_mut(name)?.expanded = expanded;
        Ok(())
    }

    pub fn is_expanded(&self, name: &str) -> bool {
        if name == ALL_GROUP {
            return self.all_expanded;
        }
        self.groups.get(name).is_some_and(|g| g.expanded)
    }

    /// Names of expanded groups, "All" last when expanded
    pub fn expanded_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .groups
            .values()
            .filter(|g| g.expanded)
            .map(|g| g.name.clone())
            .collect();
        if self.all_expanded {
            names.push(ALL_GROUP.to_string());
        }
        names
    }

    pub fn get(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        name == ALL_GROUP || self.groups.contains_key(name)
    }

    /// User-defined groups in name order
    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// Copy the current membership, restricted to `registered` checkouts
    pub fn snapshot(&self, registered: BTreeSet<String>) -> GroupSnapshot {
        let groups = self
            .groups
            .values()
            .map(|g| {
                let members = g
                    .members
                    .iter()
                    .filter(|m| registered.contains(*m))
                    .cloned()
                    .collect();
                (g.name.clone(), members)
            })
            .collect();

        GroupSnapshot {
            groups,
            all: registered,
        }
    }

    fn group_mut(&mut self, name: &str) -> Result<&mut Group> {
        if name == ALL_GROUP {
            return Err(Error::ProtectedGroup(name.to_string()));
        }
        self.groups
            .get_mut(name)
            .ok_or_else(|| Error::GroupNotFound(name.to_string()))
    }
}

fn validate_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidName(name.to_string()));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_create_rejects_duplicates_and_all() {
        let mut index = GroupIndex::new();
        index.create("web").unwrap();

        assert!(matches!(index.create("web"), Err(Error::DuplicateName(_))));
        assert!(matches!(index.create("All"), Err(Error::DuplicateName(_))));
        assert!(matches!(index.create("  "), Err(Error::InvalidName(_))));
        assert_eq!(index.iter().count(), 1);
    }

    #[test]
    fn test_rename_preserves_members_and_expanded() {
        let mut index = GroupIndex::new();
        index.create("web").unwrap();
        index.add_members("web", &["site", "cdn", "site-admin"]).unwrap();
        index.set_expanded("web", true).unwrap();

        let renamed = index.rename("web", "frontend").unwrap();
        assert_eq!(renamed.members(), &["site", "cdn", "site-admin"]);
        assert!(renamed.is_expanded());

        assert!(index.get("web").is_none());
        assert_eq!(index.expanded_names(), vec!["frontend".to_string()]);
    }

    #[test]
    fn test_rename_collisions_leave_state_unchanged() {
        let mut index = GroupIndex::new();
        index.create("web").unwrap();
        index.create("ops").unwrap();
        index.add_members("web", &["site"]).unwrap();

        assert!(matches!(index.rename("web", "ops"), Err(Error::DuplicateName(_))));
        assert!(matches!(index.rename("web", "All"), Err(Error::DuplicateName(_))));
        assert!(matches!(index.rename("All", "x"), Err(Error::ProtectedGroup(_))));
        assert!(matches!(index.rename("nope", "x"), Err(Error::GroupNotFound(_))));

        assert_eq!(index.get("web").unwrap().members(), &["site"]);
        assert!(index.get("ops").is_some());
    }

    #[test]
    fn test_delete_all_is_refused() {
        let mut index = GroupIndex::new();
        assert!(matches!(index.delete("All"), Err(Error::ProtectedGroup(_))));
        assert!(matches!(index.delete("web"), Err(Error::GroupNotFound(_))));

        index.create("web").unwrap();
        index.delete("web").unwrap();
        assert!(!index.contains("web"));
        assert!(index.contains("All"));
    }

    #[test]
    fn test_members_are_append_once() {
        let mut index = GroupIndex::new();
        index.create("web").unwrap();

        assert_eq!(index.add_members("web", &["a", "b", "a"]).unwrap(), 2);
        assert_eq!(index.add_members("web", &["b"]).unwrap(), 0);
        assert_eq!(index.get("web").unwrap().members(), &["a", "b"]);

        assert_eq!(index.remove_members("web", &["a", "zzz"]).unwrap(), 1);
        assert_eq!(index.remove_members("web", &["a"]).unwrap(), 0);
        assert_eq!(index.get("web").unwrap().members(), &["b"]);
    }

    #[test]
    fn test_all_membership_is_not_editable() {
        let mut index = GroupIndex::new();
        assert!(matches!(
            index.add_members("All", &["a"]),
            Err(Error::ProtectedGroup(_))
        ));
        assert!(matches!(
            index.remove_members("All", &["a"]),
            Err(Error::ProtectedGroup(_))
        ));
    }

    #[test]
    fn test_from_parts_keeps_duplicates_and_expanded() {
        let index = GroupIndex::from_parts(
            vec![
                ("web".to_string(), vec!["a".to_string(), "a".to_string()]),
                ("All".to_string(), vec!["x".to_string()]),
            ],
            &["web".to_string(), "All".to_string(), "ghost".to_string()],
        );

        assert_eq!(index.get("web").unwrap().members(), &["a", "a"]);
        assert!(index.is_expanded("web"));
        assert!(index.is_expanded("All"));
        assert_eq!(
            index.expanded_names(),
            vec!["web".to_string(), "All".to_string()]
        );
        assert_eq!(index.iter().count(), 1);
    }

    #[test]
    fn test_snapshot_skips_stale_members() {
        let mut index = GroupIndex::new();
        index.create("web").unwrap();
        index.add_members("web", &["site", "removed"]).unwrap();

        let snapshot = index.snapshot(names(&["site", "api"]));
        assert_eq!(snapshot.members("web"), Some(&names(&["site"])));
        assert_eq!(snapshot.members("All"), Some(&names(&["site", "api"])));
        assert_eq!(snapshot.members("nope"), None);

        // stale entries are still stored until pruned
        assert_eq!(index.get("web").unwrap().members(), &["site", "removed"]);
        assert_eq!(index.prune_unknown(&names(&["site", "api"])), 1);
        assert_eq!(index.get("web").unwrap().members(), &["site"]);

        let all = snapshot.resolve_all();
        assert_eq!(all.len(), 2);
        assert!(all.contains_key("All"));
    }

    #[test]
    fn test_prune_member_cascades() {
        let mut index = GroupIndex::new();
        index.create("web").unwrap();
        index.create("ops").unwrap();
        index.add_members("web", &["a", "b"]).unwrap();
        index.add_members("ops", &["a"]).unwrap();

        index.prune_member("a");
        assert_eq!(index.get("web").unwrap().members(), &["b"]);
        assert!(index.get("ops").unwrap().members().is_empty());
    }
}
