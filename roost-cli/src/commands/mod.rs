//! CLI command implementations

pub mod batch;
pub mod group;
pub mod repo;
pub mod status;

use std::collections::BTreeSet;
use std::sync::Arc;

use clap::Args;
use roost_core::{
    Checkout, Config, FileConfigStore, Git2Client, SelectionEntry, UpdateNotifier, Workspace,
    ALL_GROUP,
};

pub use batch::{BranchArgs, BranchesArgs, PullArgs, SwitchArgs};
pub use group::GroupArgs;
pub use repo::RepoArgs;
pub use status::StatusArgs;

/// Open the workspace persisted in the configured settings file
pub fn open_workspace(config: &Config) -> anyhow::Result<Workspace<FileConfigStore>> {
    let path = config.settings_path()?;
    tracing::debug!(settings = %path.display(), "Opening settings");

    let store = FileConfigStore::open(path)?;
    let client = Git2Client::new().with_untracked(config.status.include_untracked);
    Ok(Workspace::open(store, Arc::new(client)))
}

/// Checkouts and groups an operation applies to
#[derive(Args, Debug, Default)]
pub struct SelectionArgs {
    /// Checkout to include (repeatable)
    #[arg(short = 'r', long = "repo")]
    pub repos: Vec<String>,

    /// Group to include (repeatable)
    #[arg(short = 'g', long = "group")]
    pub groups: Vec<String>,

    /// Include every registered checkout
    #[arg(long)]
    pub all: bool,
}

impl SelectionArgs {
    /// Selection entries in the order given, groups after checkouts
    pub fn entries(&self) -> anyhow::Result<Vec<SelectionEntry>> {
        let mut entries: Vec<SelectionEntry> =
            self.repos.iter().map(SelectionEntry::checkout).collect();
        entries.extend(self.groups.iter().map(SelectionEntry::group));
        if self.all {
            entries.push(SelectionEntry::group(ALL_GROUP));
        }

        if entries.is_empty() {
            anyhow::bail!("Nothing selected: pass --repo, --group or --all");
        }
        Ok(entries)
    }
}

/// One checkout line: indicator, name, branch and the last error if any
pub fn checkout_line(checkout: &Checkout, notifier: &UpdateNotifier) -> String {
    let indicator = checkout.indicator(notifier.is_active(checkout.name()));
    let mut line = format!("{} {:<24} {}", indicator.glyph(), checkout.name(), checkout.branch);
    if let Some(error) = checkout.error() {
        line.push_str(&format!("  ! {}", error));
    }
    line
}

/// Render groups as a tree, "All" last
///
/// Collapsed groups show only their member count.
pub fn render_tree(workspace: &Workspace<FileConfigStore>, notifier: &UpdateNotifier) {
    let groups = workspace.groups();

    for group in groups.iter() {
        let members = group_members(workspace, group.members());
        render_group(group.name(), group.is_expanded(), &members, notifier);
    }

    let all: Vec<&Checkout> = workspace.registry().iter().collect();
    render_group(ALL_GROUP, groups.is_expanded(ALL_GROUP), &all, notifier);
}

/// Registered members in stored order, each listed once
fn group_members<'a>(
    workspace: &'a Workspace<FileConfigStore>,
    names: &[String],
) -> Vec<&'a Checkout> {
    let mut seen = BTreeSet::new();
    names
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .filter_map(|name| workspace.checkout(name))
        .collect()
}

fn render_group(name: &str, expanded: bool, members: &[&Checkout], notifier: &UpdateNotifier) {
    if !expanded {
        println!("[+] {} ({})", name, members.len());
        return;
    }

    println!("[-] {} ({})", name, members.len());
    for checkout in members {
        println!("    {}", checkout_line(checkout, notifier));
    }
}
