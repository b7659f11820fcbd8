//! Group management commands

use clap::{Args, Subcommand};
use roost_core::{Config, StatusTracker, UpdateNotifier};

use super::{open_workspace, render_tree};

/// Group management commands
#[derive(Args, Debug)]
pub struct GroupArgs {
    #[command(subcommand)]
    pub command: GroupCommand,
}

#[derive(Subcommand, Debug)]
pub enum GroupCommand {
    /// Create an empty group
    Create {
        /// Group name
        name: String,
    },

    /// Rename a group, keeping its members
    Rename {
        /// Current name
        old: String,
        /// New name
        new: String,
    },

    /// Delete a group (its checkouts stay registered)
    Delete {
        /// Group name
        name: String,
    },

    /// Add checkouts to one or more groups
    Add {
        /// Target groups
        #[arg(required = true)]
        groups: Vec<String>,

        /// Checkouts to add (repeatable)
        #[arg(short, long = "repo", required = true)]
        repos: Vec<String>,
    },

    /// Remove checkouts from a group ("All" unregisters them)
    Remove {
        /// Group name
        group: String,

        /// Checkout names
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Show groups and their members
    #[command(visible_alias = "ls")]
    List,

    /// Show a group's members in listings
    Expand {
        /// Group name
        name: String,
    },

    /// Show only a group's member count in listings
    Collapse {
        /// Group name
        name: String,
    },
}

impl GroupArgs {
    /// Execute the group command
    pub fn execute(&self, verbose: bool, config: &Config) -> anyhow::Result<()> {
        let mut workspace = open_workspace(config)?;

        match &self.command {
            GroupCommand::Create { name } => {
                let group = workspace.create_group(name)?;
                println!("Created group {}", group.name());
            }
            GroupCommand::Rename { old, new } => {
                let group = workspace.rename_group(old, new)?;
                println!("Renamed {} to {}", old, group.name());
            }
            GroupCommand::Delete { name } => {
                let group = workspace.delete_group(name)?;
                println!(
                    "Deleted group {} ({} member(s) kept registered)",
                    group.name(),
                    group.members().len()
                );
            }
            GroupCommand::Add { groups, repos } => {
                let unknown: Vec<&str> = repos
                    .iter()
                    .map(String::as_str)
                    .filter(|name| workspace.checkout(name).is_none())
                    .collect();
                if !unknown.is_empty() {
                    eprintln!("Ignoring unknown checkout(s): {}", unknown.join(", "));
                }

                let added = workspace.add_to_groups(groups, repos)?;
                println!("Added {} membership(s).", added);
            }
            GroupCommand::Remove { group, names } => {
                let removed = workspace.remove_from_group(group, names)?;
                println!("Removed {} checkout(s) from {}.", removed, group);
            }
            GroupCommand::List => {
                let tracker = StatusTracker::new(config.status.schedule());
                let summary = workspace.refresh_status(&tracker);
                if verbose && !summary.failed.is_empty() {
                    eprintln!("Status unavailable for: {}", summary.failed.join(", "));
                }
                render_tree(&workspace, &UpdateNotifier::default());
            }
            GroupCommand::Expand { name } => {
                workspace.set_expanded(name, true)?;
            }
            GroupCommand::Collapse { name } => {
                workspace.set_expanded(name, false)?;
            }
        }

        Ok(())
    }
}
