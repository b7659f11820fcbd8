//! Checkout registry commands

use std::path::PathBuf;

use clap::{Args, Subcommand};
use roost_core::{Config, StatusTracker, UpdateNotifier};

use super::{checkout_line, open_workspace};

/// Checkout registry commands
#[derive(Args, Debug)]
pub struct RepoArgs {
    #[command(subcommand)]
    pub command: RepoCommand,
}

#[derive(Subcommand, Debug)]
pub enum RepoCommand {
    /// Register one or more checkouts by path
    Add {
        /// Repository root directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Unregister checkouts, or drop them from one group
    #[command(visible_alias = "rm")]
    Remove {
        /// Checkout names
        #[arg(required = true)]
        names: Vec<String>,

        /// Only remove from this group ("All" unregisters)
        #[arg(short, long)]
        group: Option<String>,
    },

    /// List registered checkouts
    #[command(visible_alias = "ls")]
    List,
}

impl RepoArgs {
    /// Execute the repo command
    pub fn execute(&self, verbose: bool, config: &Config) -> anyhow::Result<()> {
        match &self.command {
            RepoCommand::Add { paths } => add_checkouts(paths, verbose, config),
            RepoCommand::Remove { names, group } => {
                remove_checkouts(names, group.as_deref(), config)
            }
            RepoCommand::List => list_checkouts(verbose, config),
        }
    }
}

fn add_checkouts(paths: &[PathBuf], verbose: bool, config: &Config) -> anyhow::Result<()> {
    let mut workspace = open_workspace(config)?;
    let mut failed = 0;

    for (path, result) in workspace.add_checkouts(paths) {
        match result {
            Ok(name) => println!("Added {} ({})", name, path.display()),
            Err(e) => {
                eprintln!("Skipped {}: {}", path.display(), e);
                failed += 1;
            }
        }
    }

    let tracker = StatusTracker::new(config.status.schedule());
    let summary = workspace.refresh_status(&tracker);
    if verbose && !summary.failed.is_empty() {
        eprintln!("Status unavailable for: {}", summary.failed.join(", "));
    }

    if failed > 0 {
        anyhow::bail!("{} path(s) could not be added", failed);
    }
    Ok(())
}

fn remove_checkouts(names: &[String], group: Option<&str>, config: &Config) -> anyhow::Result<()> {
    let mut workspace = open_workspace(config)?;

    let removed = match group {
        Some(group) => workspace.remove_from_group(group, names)?,
        None => {
            let mut removed = 0;
            for name in names {
                if workspace.remove_checkout(name)? {
                    removed += 1;
                } else {
                    eprintln!("Unknown checkout: {}", name);
                }
            }
            removed
        }
    };

    match group {
        Some(group) => println!("Removed {} checkout(s) from {}.", removed, group),
        None => println!("Removed {} checkout(s).", removed),
    }
    Ok(())
}

fn list_checkouts(verbose: bool, config: &Config) -> anyhow::Result<()> {
    let mut workspace = open_workspace(config)?;

    if workspace.registry().is_empty() {
        println!("No checkouts registered.");
        return Ok(());
    }

    let tracker = StatusTracker::new(config.status.schedule());
    workspace.refresh_status(&tracker);

    let notifier = UpdateNotifier::default();
    for checkout in workspace.registry().iter() {
        println!("{}", checkout_line(checkout, &notifier));
        if verbose {
            println!("    Path: {}", checkout.path().display());
            if let Some(head) = &checkout.head {
                println!("    HEAD: {}", &head[..8.min(head.len())]);
            }
            if let Ok(Some(url)) = workspace.client().remote_url(checkout.path()) {
                println!("    Origin: {}", url);
            }
        }
    }

    Ok(())
}
