//! Roster: reconcile a spreadsheet roster export against the employee directory.
//!
//! # Usage
//!
//! ```text
//! roster initialize <FILE|->            full reset from a JSON array
//! roster sync <FILE|->                  upsert + deactivate missing
//! roster pull [--url <URL>]             fetch the remote snapshot, then sync
//! roster log [--limit N] [--json]       audit log entries, newest first
//! roster list [--inactive] [--json]     directory rows
//! roster config [--source-url <URL>]    show or update ~/.roster/config.yaml
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    config::ConfigArgs, journal::LogArgs, list::ListArgs, pull::PullArgs, run::RunArgs,
};
use roster_core::SyncMode;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "roster",
    version,
    about = "Reconcile an employee roster export against the local directory",
    long_about = None,
)]
struct Cli {
    /// Directory holding directory.json and sync_logs.jsonl (default: ~/.roster).
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Wipe the directory and insert every valid row from the payload.
    Initialize(RunArgs),

    /// Upsert payload rows and deactivate directory rows absent from it.
    Sync(RunArgs),

    /// Fetch the roster snapshot from its endpoint and sync it.
    Pull(PullArgs),

    /// Show audit log entries.
    Log(LogArgs),

    /// Show directory rows.
    List(ListArgs),

    /// Show or update the configuration file.
    Config(ConfigArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let data_dir = cli.data_dir;
    match cli.command {
        Commands::Initialize(args) => args.run(SyncMode::Replace, data_dir),
        Commands::Sync(args) => args.run(SyncMode::MergeSync, data_dir),
        Commands::Pull(args) => args.run(data_dir),
        Commands::Log(args) => args.run(data_dir),
        Commands::List(args) => args.run(data_dir),
        Commands::Config(args) => args.run(),
    }
}
