//! `roster pull`: fetch the remote snapshot and run a merge sync.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use roster_core::config;
use roster_sync::{fetch::fetch_snapshot, pipeline};

use super::{open_store, report};

/// Arguments for `roster pull`.
#[derive(Args, Debug)]
pub struct PullArgs {
    /// Snapshot endpoint; defaults to `source_url` from the config file.
    #[arg(long)]
    pub url: Option<String>,
}

impl PullArgs {
    pub fn run(self, data_dir: Option<PathBuf>) -> Result<()> {
        let url = match self.url {
            Some(url) => url,
            None => {
                let home = config::home().context("could not determine home directory")?;
                config::load_at(&home)
                    .context("failed to load ~/.roster/config.yaml")?
                    .source_url
                    .context("no snapshot URL; pass --url or run `roster config --source-url <URL>`")?
            }
        };

        // Opening is lazy; a failed fetch never touches the store.
        let mut store = open_store(data_dir)?;
        let result =
            fetch_snapshot(&url).and_then(|payload| pipeline::sync(&mut store, &payload));
        if result.is_ok() {
            log::info!("sync from {url} completed");
        }
        report(result)
    }
}
