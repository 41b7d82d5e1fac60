//! Write-ahead audit log.
//!
//! Every run appends one [`SyncLogEntry`] holding the raw payload and the
//! computed [`Summary`] *before* the directory is touched. Entries are never
//! updated or removed, and a failed mutation does not retract its entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SyncError;
use crate::reconcile::Summary;

/// Sequential identifier of an audit entry, starting at 1.
pub type LogId = u64;

/// One immutable audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub id: LogId,
    /// The request body exactly as received.
    pub payload: Value,
    pub summary: Summary,
    pub created_at: DateTime<Utc>,
}

/// Append-only storage for [`SyncLogEntry`] values.
pub trait AuditJournal {
    /// Durably append an entry and return its id. Must not return before the
    /// entry would survive a crash.
    fn append(&mut self, payload: &Value, summary: &Summary) -> Result<LogId, SyncError>;

    /// All entries, oldest first. For reporting only.
    fn entries(&self) -> Result<Vec<SyncLogEntry>, SyncError>;
}

/// Record the pre-mutation log entry for a run.
pub fn record<J>(journal: &mut J, payload: &Value, summary: &Summary) -> Result<LogId, SyncError>
where
    J: AuditJournal + ?Sized,
{
    let id = journal.append(payload, summary).inspect_err(|e| {
        tracing::error!("audit log write failed, aborting {} run: {e}", summary.mode);
    })?;
    tracing::info!(
        "audit entry #{id} recorded ({}: {} created, {} updated, {} skipped, {} missing)",
        summary.mode,
        summary.created,
        summary.updated,
        summary.skipped,
        summary.missing.len()
    );
    Ok(id)
}
