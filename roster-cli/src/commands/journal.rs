//! `roster log`: audit log visibility.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use roster_sync::{AuditJournal, Summary, SyncLogEntry};

use super::open_store;

/// Arguments for `roster log`.
#[derive(Args, Debug)]
pub struct LogArgs {
    /// Number of most recent entries to show.
    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct LogEntryJson<'a> {
    id: u64,
    created_at: String,
    rows: usize,
    summary: &'a Summary,
}

#[derive(Tabled)]
struct LogTableRow {
    #[tabled(rename = "#")]
    id: u64,
    #[tabled(rename = "at")]
    created_at: String,
    #[tabled(rename = "mode")]
    mode: String,
    #[tabled(rename = "rows")]
    rows: usize,
    #[tabled(rename = "created")]
    created: usize,
    #[tabled(rename = "updated")]
    updated: usize,
    #[tabled(rename = "skipped")]
    skipped: usize,
    #[tabled(rename = "missing")]
    missing: usize,
}

impl LogArgs {
    pub fn run(self, data_dir: Option<PathBuf>) -> Result<()> {
        let store = open_store(data_dir)?;
        let mut entries = store.entries().context("failed to read audit log")?;
        entries.reverse();
        entries.truncate(self.limit);

        if self.json {
            let payload: Vec<LogEntryJson<'_>> = entries
                .iter()
                .map(|entry| LogEntryJson {
                    id: entry.id,
                    created_at: entry.created_at.to_rfc3339(),
                    rows: payload_rows(entry),
                    summary: &entry.summary,
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize audit log")?
            );
            return Ok(());
        }

        if entries.is_empty() {
            println!("No sync runs recorded.");
            return Ok(());
        }

        let rows: Vec<LogTableRow> = entries
            .iter()
            .map(|entry| LogTableRow {
                id: entry.id,
                created_at: entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                mode: entry.summary.mode.to_string(),
                rows: payload_rows(entry),
                created: entry.summary.created,
                updated: entry.summary.updated,
                skipped: entry.summary.skipped,
                missing: entry.summary.missing.len(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}

fn payload_rows(entry: &SyncLogEntry) -> usize {
    entry.payload.as_array().map_or(0, Vec::len)
}
