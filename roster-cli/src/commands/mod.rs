pub mod config;
pub mod journal;
pub mod list;
pub mod pull;
pub mod run;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use roster_sync::{respond, FileStore, SyncError, SyncResponse};

/// Open the file store: `--data-dir`, else config `data_dir`, else `~/.roster`.
pub fn open_store(data_dir: Option<PathBuf>) -> Result<FileStore> {
    if let Some(dir) = data_dir {
        return Ok(FileStore::new(dir));
    }
    let home = roster_core::config::home().context("could not determine home directory")?;
    let cfg = roster_core::config::load_at(&home).context("failed to load ~/.roster/config.yaml")?;
    Ok(FileStore::new(cfg.data_dir_at(&home)))
}

/// Print the JSON response body for a run; a failed run prints the error
/// body and returns an error so the process exits non-zero.
pub fn report(result: Result<SyncResponse, SyncError>) -> Result<()> {
    let (code, body) = respond(&result);
    println!(
        "{}",
        serde_json::to_string_pretty(&body).context("failed to serialize response")?
    );
    if let Err(err) = result {
        bail!("run failed ({code}): {err}");
    }
    Ok(())
}
