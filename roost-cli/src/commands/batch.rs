//! Batch commands: pull, switch, branch

use std::sync::Arc;

use chrono::Local;
use clap::Args;
use roost_core::{
    BatchEvent, BatchExecutor, BatchResult, Checkout, Config, FileConfigStore, Indicator,
    Operation, UpdateNotifier, Workspace,
};

use super::{open_workspace, SelectionArgs};

/// Fast-forward the selected checkouts from origin
#[derive(Args, Debug)]
pub struct PullArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
}

/// Switch the selected checkouts to a branch
#[derive(Args, Debug)]
pub struct SwitchArgs {
    /// Branch to check out
    pub branch: String,

    /// Create the branch where it is missing
    #[arg(short, long)]
    pub force: bool,

    #[command(flatten)]
    pub selection: SelectionArgs,
}

/// Create a branch in the selected checkouts
#[derive(Args, Debug)]
pub struct BranchArgs {
    /// Name of the new branch
    pub name: String,

    #[command(flatten)]
    pub selection: SelectionArgs,
}

/// List branch names across the selected checkouts
#[derive(Args, Debug)]
pub struct BranchesArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,
}

impl PullArgs {
    pub async fn execute(&self, verbose: bool, config: &Config) -> anyhow::Result<()> {
        run(&self.selection, Operation::Pull, verbose, config).await
    }
}

impl SwitchArgs {
    pub async fn execute(&self, verbose: bool, config: &Config) -> anyhow::Result<()> {
        let operation = Operation::SetBranch {
            name: self.branch.clone(),
            force: self.force,
        };
        run(&self.selection, operation, verbose, config).await
    }
}

impl BranchArgs {
    pub async fn execute(&self, verbose: bool, config: &Config) -> anyhow::Result<()> {
        let operation = Operation::CreateBranch {
            name: self.name.clone(),
        };
        run(&self.selection, operation, verbose, config).await
    }
}

impl BranchesArgs {
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let workspace = open_workspace(config)?;
        let work_set = workspace.resolve(&self.selection.entries()?)?;

        for name in workspace.branch_pick_list(&work_set) {
            println!("{}", name);
        }
        Ok(())
    }
}

async fn run(
    selection: &SelectionArgs,
    operation: Operation,
    verbose: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let mut workspace = open_workspace(config)?;
    let entries = selection.entries()?;

    let executor = BatchExecutor::new(Arc::clone(workspace.client()), config.batch.max_workers);
    let mut notifier = UpdateNotifier::new(config.notifier.tick);

    let result = workspace
        .run_batch(
            &executor,
            &entries,
            operation,
            &mut notifier,
            config.notifier.blink_cycles,
            print_progress,
        )
        .await?;

    print_result(&workspace, &result, verbose);

    let failed = result.failures().count();
    if failed > 0 {
        anyhow::bail!("{} checkout(s) failed", failed);
    }
    Ok(())
}

fn print_progress(event: &BatchEvent, checkout: &Checkout) {
    match event {
        BatchEvent::Started(_) => println!("{} {}", Indicator::Busy.glyph(), checkout.name()),
        BatchEvent::Finished(_) => println!("  {} finished", checkout.name()),
    }
}

fn print_result(workspace: &Workspace<FileConfigStore>, result: &BatchResult, verbose: bool) {
    if result.outcomes.is_empty() {
        println!("No checkouts selected.");
        return;
    }

    for name in result.updated() {
        println!("+ {}", name);
    }
    for (name, reason) in result.skipped() {
        println!("- {} (skipped: {})", name, reason);
    }
    if verbose {
        for (name, _) in result.outcomes.iter().filter(|(_, o)| !o.is_failure()) {
            if let Some(checkout) = workspace.checkout(name) {
                println!("  {} on {}", name, checkout.branch);
            }
        }
    }

    print!("{}", result.report());
    if verbose {
        println!(
            "Finished at {}",
            result.finished_at.with_timezone(&Local).format("%H:%M:%S")
        );
    }
}
