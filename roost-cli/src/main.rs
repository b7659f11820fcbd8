//! Roost CLI - Command line interface for Roost
//!
//! Keeps a registry of local git checkouts, organizes them into groups and
//! runs pulls and branch operations over many of them at once.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use roost_core::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{
    BranchArgs, BranchesArgs, GroupArgs, PullArgs, RepoArgs, StatusArgs, SwitchArgs,
};

/// Roost: grouped git checkouts and batch operations
#[derive(Parser, Debug)]
#[command(name = "roost")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file holding the registry and groups (overrides config and env)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Maximum concurrent git operations (overrides config and env)
    #[arg(short, long, global = true)]
    jobs: Option<usize>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Manage registered checkouts
    Repo(RepoArgs),

    /// Manage groups of checkouts
    #[command(visible_alias = "g")]
    Group(GroupArgs),

    /// Fast-forward the selected checkouts from origin
    Pull(PullArgs),

    /// Switch the selected checkouts to a branch
    #[command(visible_alias = "sw")]
    Switch(SwitchArgs),

    /// Create a branch in the selected checkouts
    Branch(BranchArgs),

    /// List branch names available across the selected checkouts
    Branches(BranchesArgs),

    /// Show dirty/clean state and branches
    #[command(visible_alias = "st")]
    Status(StatusArgs),

    /// Reload settings, drop stale group entries and refresh status
    Reload,

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.verbose {
        tracing::info!("Verbose mode enabled");
    }

    // Load configuration with overrides
    let config = Config::load_with_overrides(cli.settings.clone(), cli.jobs)?;

    if cli.verbose {
        tracing::info!(
            settings = ?config.settings.path,
            max_workers = config.batch.max_workers,
            poll_interval = ?config.status.poll_interval,
            "Configuration loaded"
        );
    }

    match cli.command {
        Some(Commands::Version) => {
            println!("roost {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Repo(args)) => {
            args.execute(cli.verbose, &config)?;
        }
        Some(Commands::Group(args)) => {
            args.execute(cli.verbose, &config)?;
        }
        Some(Commands::Pull(args)) => {
            args.execute(cli.verbose, &config).await?;
        }
        Some(Commands::Switch(args)) => {
            args.execute(cli.verbose, &config).await?;
        }
        Some(Commands::Branch(args)) => {
            args.execute(cli.verbose, &config).await?;
        }
        Some(Commands::Branches(args)) => {
            args.execute(&config)?;
        }
        Some(Commands::Status(args)) => {
            args.execute(cli.verbose, &config).await?;
        }
        Some(Commands::Reload) => {
            commands::status::reload(cli.verbose, &config)?;
        }
        Some(Commands::Config) => {
            println!("Roost Configuration");
            println!("===================");
            println!();
            println!("Status:");
            println!("  poll_interval: {:?}", config.status.poll_interval);
            println!("  unfocused_factor: {}", config.status.unfocused_factor);
            println!("  include_untracked: {}", config.status.include_untracked);
            println!();
            println!("Batch:");
            println!("  max_workers: {}", config.batch.max_workers);
            println!();
            println!("Notifier:");
            println!("  blink_cycles: {}", config.notifier.blink_cycles);
            println!("  tick: {:?}", config.notifier.tick);
            println!();
            match config.settings_path() {
                Ok(path) => println!("Settings file: {}", path.display()),
                Err(e) => println!("Settings file: unavailable ({})", e),
            }
            if let Some(path) = Config::default_config_path() {
                println!("Config file: {}", path.display());
                if path.exists() {
                    println!("  (exists)");
                } else {
                    println!("  (not found - using defaults)");
                }
            }
        }
        None => {
            println!("Roost - grouped git checkouts and batch operations");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_overrides() {
        let cli = Cli::try_parse_from([
            "roost",
            "--settings",
            "/tmp/settings.json",
            "-j",
            "2",
            "repo",
            "list",
        ])
        .unwrap();

        assert_eq!(cli.settings, Some(PathBuf::from("/tmp/settings.json")));
        assert_eq!(cli.jobs, Some(2));
        assert!(matches!(cli.command, Some(Commands::Repo(_))));
    }

    #[test]
    fn test_pull_selection() {
        let cli = Cli::try_parse_from(["roost", "pull", "-r", "api", "-g", "backend", "-r", "web"])
            .unwrap();

        let Some(Commands::Pull(args)) = cli.command else {
            panic!("expected pull");
        };
        let entries = args.selection.entries().unwrap();
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn test_switch_requires_branch() {
        assert!(Cli::try_parse_from(["roost", "switch", "--all"]).is_err());

        let cli = Cli::try_parse_from(["roost", "switch", "release", "--force", "--all"]).unwrap();
        let Some(Commands::Switch(args)) = cli.command else {
            panic!("expected switch");
        };
        assert_eq!(args.branch, "release");
        assert!(args.force);
    }

    #[test]
    fn test_group_add_takes_many_groups() {
        let cli = Cli::try_parse_from([
            "roost", "group", "add", "web", "edge", "--repo", "site", "--repo", "cdn",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Commands::Group(_))));

        assert!(Cli::try_parse_from(["roost", "group", "add", "web"]).is_err());
    }

    #[test]
    fn test_status_flags() {
        let cli = Cli::try_parse_from(["roost", "status", "--watch", "--background"]).unwrap();
        let Some(Commands::Status(args)) = cli.command else {
            panic!("expected status");
        };
        assert!(args.watch);
        assert!(args.background);
    }
}
