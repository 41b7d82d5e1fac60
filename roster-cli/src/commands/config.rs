//! `roster config`: show or update `~/.roster/config.yaml`.

use anyhow::{Context, Result};
use clap::Args;

use roster_core::config;

/// Arguments for `roster config`.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Set the snapshot endpoint used by `roster pull`.
    #[arg(long, value_name = "URL")]
    pub source_url: Option<String>,
}

impl ConfigArgs {
    pub fn run(self) -> Result<()> {
        let home = config::home().context("could not determine home directory")?;
        let mut cfg = config::load_at(&home).context("failed to load ~/.roster/config.yaml")?;

        if let Some(url) = self.source_url {
            cfg.source_url = Some(url);
            config::save_at(&home, &cfg).context("failed to save ~/.roster/config.yaml")?;
            println!("✓ Saved to: {}", config::config_path_at(&home).display());
        }

        println!(
            "source_url: {}",
            cfg.source_url.as_deref().unwrap_or("(not set)")
        );
        println!("data_dir:   {}", cfg.data_dir_at(&home).display());
        Ok(())
    }
}
