//! Shared entrypoints used by the CLI and by anything embedding the engine.
//!
//! One run: array check → existing-key snapshot (read once) → normalize →
//! reconcile → audit entry → apply → response.

use serde::Serialize;
use serde_json::{json, Value};

use roster_core::{EmpNo, SyncMode};

use crate::apply::apply;
use crate::audit::{self, AuditJournal, LogId};
use crate::error::SyncError;
use crate::normalize::normalize;
use crate::reconcile::{reconcile, Reconciliation, SkippedRow, Summary};
use crate::store::DirectoryStore;

/// Per-key detail lists returned alongside the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Details {
    pub created: Vec<EmpNo>,
    /// Only reported for `sync`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<Vec<EmpNo>>,
    pub skipped: Vec<SkippedRow>,
    pub missing: Vec<EmpNo>,
}

/// Successful run response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncResponse {
    pub status: &'static str,
    pub summary: Summary,
    pub details: Details,
    /// Audit entry written for this run. Not part of the response body.
    #[serde(skip)]
    pub log_id: LogId,
}

impl SyncResponse {
    fn from_reconciliation(rec: Reconciliation, log_id: LogId) -> Self {
        let summary = rec.summary();
        let updated = match rec.mode {
            SyncMode::Replace => None,
            SyncMode::MergeSync => Some(rec.updated),
        };
        Self {
            status: "ok",
            summary,
            details: Details {
                created: rec.created,
                updated,
                skipped: rec.skipped,
                missing: rec.missing,
            },
            log_id,
        }
    }
}

/// Replace-mode run: wipe the directory and insert every valid row.
pub fn initialize<S>(store: &mut S, payload: &Value) -> Result<SyncResponse, SyncError>
where
    S: DirectoryStore + AuditJournal,
{
    run(store, SyncMode::Replace, payload)
}

/// Merge-sync run: upsert valid rows and deactivate rows absent from the payload.
pub fn sync<S>(store: &mut S, payload: &Value) -> Result<SyncResponse, SyncError>
where
    S: DirectoryStore + AuditJournal,
{
    run(store, SyncMode::MergeSync, payload)
}

/// Run one reconciliation end to end.
///
/// A non-array payload fails before anything is read or written. The audit
/// entry is written before the directory is mutated and stays even if the
/// mutation fails.
pub fn run<S>(store: &mut S, mode: SyncMode, payload: &Value) -> Result<SyncResponse, SyncError>
where
    S: DirectoryStore + AuditJournal,
{
    let Some(rows) = payload.as_array() else {
        return Err(SyncError::malformed(
            "Payload must be a JSON array of objects.",
        ));
    };
    tracing::info!("{mode} run started: {} payload rows", rows.len());

    let existing = store.existing_keys()?;
    let normalized = rows.iter().map(normalize).collect();
    let rec = reconcile(normalized, &existing, mode);

    let log_id = audit::record(store, payload, &rec.summary())?;
    apply(store, &rec)?;

    Ok(SyncResponse::from_reconciliation(rec, log_id))
}

/// Map a run result to an HTTP-style status code and JSON body.
pub fn respond(result: &Result<SyncResponse, SyncError>) -> (u16, Value) {
    match result {
        Ok(response) => match serde_json::to_value(response) {
            Ok(body) => (200, body),
            Err(e) => error_body(500, &e.to_string()),
        },
        Err(err) => error_body(err.status_code(), &err.to_string()),
    }
}

fn error_body(code: u16, message: &str) -> (u16, Value) {
    (code, json!({ "status": "error", "message": message }))
}
