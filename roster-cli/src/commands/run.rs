//! `roster initialize` / `roster sync`: reconcile a payload file.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use roster_core::SyncMode;
use roster_sync::{pipeline, SyncError};

use super::{open_store, report};

/// Arguments shared by `roster initialize` and `roster sync`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// JSON file holding an array of row objects, or `-` for stdin.
    pub input: PathBuf,
}

impl RunArgs {
    pub fn run(self, mode: SyncMode, data_dir: Option<PathBuf>) -> Result<()> {
        let raw = read_input(&self.input)?;
        let mut store = open_store(data_dir)?;

        let result = match serde_json::from_str::<Value>(&raw) {
            Ok(payload) => pipeline::run(&mut store, mode, &payload),
            Err(e) => Err(SyncError::MalformedPayload {
                message: format!("request body is not valid JSON: {e}"),
            }),
        };
        report(result)
    }
}

fn read_input(input: &Path) -> Result<String> {
    if input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read payload from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(input)
        .with_context(|| format!("failed to read payload '{}'", input.display()))
}
