//! `roster list`: directory rows.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use roster_core::{EmploymentStatus, StoredEmployee};
use roster_sync::DirectoryStore;

use super::open_store;

/// Arguments for `roster list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only show rows marked INACTIVE.
    #[arg(long)]
    pub inactive: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct DirectoryTableRow {
    #[tabled(rename = "empno")]
    empno: String,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "division")]
    division: String,
    #[tabled(rename = "position")]
    position: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "updated")]
    updated: String,
}

impl ListArgs {
    pub fn run(self, data_dir: Option<PathBuf>) -> Result<()> {
        let store = open_store(data_dir)?;
        let mut rows = store.rows().context("failed to read employee directory")?;
        if self.inactive {
            rows.retain(|row| !row.is_active());
        }

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&rows).context("failed to serialize directory")?
            );
            return Ok(());
        }

        let active = rows.iter().filter(|row| row.is_active()).count();
        println!(
            "Roster v{} | {} employees | {} active | {} inactive",
            env!("CARGO_PKG_VERSION"),
            rows.len(),
            active,
            rows.len() - active,
        );
        if rows.is_empty() {
            println!("Directory is empty. Run `roster initialize <FILE>` first.");
            return Ok(());
        }

        let table_rows: Vec<DirectoryTableRow> = rows.iter().map(table_row).collect();
        let mut table = Table::new(table_rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}

fn table_row(row: &StoredEmployee) -> DirectoryTableRow {
    let record = &row.record;
    DirectoryTableRow {
        empno: record.empno.to_string(),
        name: record.display_name(),
        division: record.division.clone().unwrap_or_default(),
        position: record.position.clone().unwrap_or_default(),
        status: status_label(record.status),
        updated: row.updated_at.format("%Y-%m-%d %H:%M").to_string(),
    }
}

fn status_label(status: Option<EmploymentStatus>) -> String {
    match status {
        Some(EmploymentStatus::Active) => "ACTIVE".green().bold().to_string(),
        Some(EmploymentStatus::Inactive) => "INACTIVE".red().bold().to_string(),
        None => "-".bright_black().to_string(),
    }
}
