//! Status command - show dirty/clean state, optionally watching for changes

use chrono::Local;
use clap::Args;
use roost_core::{
    Config, FileConfigStore, Focus, RefreshSummary, StatusTracker, UpdateNotifier, Workspace,
};
use tokio::time::{self, MissedTickBehavior};

use super::{checkout_line, open_workspace, render_tree};

/// Show status of every registered checkout
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Keep polling and report changes until interrupted
    #[arg(short, long)]
    pub watch: bool,

    /// Poll at the slower unfocused rate
    #[arg(short, long, requires = "watch")]
    pub background: bool,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, verbose: bool, config: &Config) -> anyhow::Result<()> {
        let mut workspace = open_workspace(config)?;

        let mut tracker = StatusTracker::new(config.status.schedule());
        if self.background {
            tracker.set_focus(Focus::Unfocused);
        }

        let summary = workspace.refresh_status(&tracker);
        report_failures(&summary, verbose);

        let mut notifier = UpdateNotifier::new(config.notifier.tick);
        render_tree(&workspace, &notifier);

        if self.watch {
            watch(&mut workspace, &tracker, &mut notifier, config, verbose).await?;
        }

        Ok(())
    }
}

/// Re-read the settings, prune stale group members and refresh
pub fn reload(verbose: bool, config: &Config) -> anyhow::Result<()> {
    let mut workspace = open_workspace(config)?;
    let tracker = StatusTracker::new(config.status.schedule());

    let summary = workspace.reload(&tracker)?;
    report_failures(&summary, verbose);

    println!(
        "Reloaded {} checkout(s), {} group(s).",
        workspace.registry().len(),
        workspace.groups().iter().count()
    );
    Ok(())
}

async fn watch(
    workspace: &mut Workspace<FileConfigStore>,
    tracker: &StatusTracker,
    notifier: &mut UpdateNotifier,
    config: &Config,
    verbose: bool,
) -> anyhow::Result<()> {
    println!();
    println!(
        "Watching {} checkout(s) every {:?}. Press Ctrl-C to stop.",
        workspace.registry().len(),
        tracker.interval()
    );

    let mut poll = time::interval(tracker.interval());
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the initial refresh already ran.
    poll.tick().await;

    let mut blink = time::interval(notifier.period());
    blink.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = poll.tick() => {
                let summary = workspace.refresh_status(tracker);
                report_failures(&summary, verbose);

                let mut restart_blink = false;
                for name in &summary.moved {
                    restart_blink |= notifier.trigger(name, config.notifier.blink_cycles);
                }
                if restart_blink {
                    blink.reset();
                }

                let mut names: Vec<&String> = summary.changed.iter().chain(&summary.moved).collect();
                names.sort();
                names.dedup();
                for name in names {
                    if let Some(checkout) = workspace.checkout(name) {
                        println!("{} {}", Local::now().format("%H:%M:%S"), checkout_line(checkout, notifier));
                    }
                }
            }
            _ = blink.tick(), if !notifier.is_idle() => {
                for line in blink_tick(workspace, notifier) {
                    println!("{} {}", Local::now().format("%H:%M:%S"), line);
                }
            }
            result = &mut ctrl_c => {
                result?;
                break;
            }
        }
    }

    Ok(())
}

/// Advance the update blink; one line per checkout whose indicator cleared
fn blink_tick(workspace: &Workspace<FileConfigStore>, notifier: &mut UpdateNotifier) -> Vec<String> {
    let tick = notifier.tick();
    tick.cleared
        .iter()
        .filter_map(|name| {
            tracing::debug!(checkout = %name, "Update indicator cleared");
            workspace.checkout(name)
        })
        .map(|checkout| checkout_line(checkout, notifier))
        .collect()
}

fn report_failures(summary: &RefreshSummary, verbose: bool) {
    if verbose && !summary.failed.is_empty() {
        eprintln!("Status unavailable for: {}", summary.failed.join(", "));
    }
}
