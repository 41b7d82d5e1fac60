//! Reconciliation: classify normalized rows against a snapshot of existing keys.
//!
//! Pure and in-memory: the caller reads the existing-key snapshot once and
//! passes it in; nothing here touches a store.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use roster_core::{EmpNo, EmployeeRecord, EmploymentStatus, SyncMode};

/// Why a payload row was excluded. Evaluated in declaration order; a row
/// carries exactly one reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotARecord,
    MissingKey,
    DuplicateKey,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotARecord => write!(f, "not_a_record"),
            SkipReason::MissingKey => write!(f, "missing_key"),
            SkipReason::DuplicateKey => write!(f, "duplicate_key"),
        }
    }
}

/// One excluded payload row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRow {
    /// Zero-based position in the payload array.
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<EmpNo>,
    pub reason: SkipReason,
}

/// Counts plus the missing-key list; written to the audit log and returned
/// to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub mode: SyncMode,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub missing: Vec<EmpNo>,
}

/// Outcome of [`reconcile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub mode: SyncMode,
    /// Rows to write, in payload order.
    pub accepted: Vec<EmployeeRecord>,
    pub created: Vec<EmpNo>,
    pub updated: Vec<EmpNo>,
    pub skipped: Vec<SkippedRow>,
    /// Snapshot keys absent from the accepted rows, in snapshot order.
    pub missing: Vec<EmpNo>,
}

impl Reconciliation {
    pub fn summary(&self) -> Summary {
        Summary {
            mode: self.mode,
            created: self.created.len(),
            updated: self.updated.len(),
            skipped: self.skipped.len(),
            missing: self.missing.clone(),
        }
    }
}

/// Classify `rows` (already normalized, in payload order) against `existing`.
///
/// - First occurrence of a key wins; later ones are skipped as
///   [`SkipReason::DuplicateKey`].
/// - [`SyncMode::Replace`]: every accepted row is a create; rows without a
///   status default to `ACTIVE`.
/// - [`SyncMode::MergeSync`]: rows whose key is in `existing` are updates,
///   the rest creates; every accepted row is forced `ACTIVE`.
///
/// In both modes `missing` is `existing − accepted`; under `Replace` it is
/// informational only.
pub fn reconcile(
    rows: Vec<Result<EmployeeRecord, SkipReason>>,
    existing: &[EmpNo],
    mode: SyncMode,
) -> Reconciliation {
    let existing_set: HashSet<&EmpNo> = existing.iter().collect();
    let mut seen: HashSet<EmpNo> = HashSet::with_capacity(rows.len());

    let mut result = Reconciliation {
        mode,
        accepted: Vec::new(),
        created: Vec::new(),
        updated: Vec::new(),
        skipped: Vec::new(),
        missing: Vec::new(),
    };

    for (index, row) in rows.into_iter().enumerate() {
        let mut record = match row {
            Ok(record) => record,
            Err(reason) => {
                tracing::warn!("row {index} skipped: {reason}");
                result.skipped.push(SkippedRow {
                    index,
                    key: None,
                    reason,
                });
                continue;
            }
        };

        if !seen.insert(record.empno.clone()) {
            tracing::warn!("row {index} skipped: duplicate key {}", record.empno);
            result.skipped.push(SkippedRow {
                index,
                key: Some(record.empno),
                reason: SkipReason::DuplicateKey,
            });
            continue;
        }

        match mode {
            SyncMode::Replace => {
                record.status.get_or_insert(EmploymentStatus::Active);
                result.created.push(record.empno.clone());
            }
            SyncMode::MergeSync => {
                record.status = Some(EmploymentStatus::Active);
                if existing_set.contains(&record.empno) {
                    tracing::debug!("row {index}: update {}", record.empno);
                    result.updated.push(record.empno.clone());
                } else {
                    tracing::debug!("row {index}: create {}", record.empno);
                    result.created.push(record.empno.clone());
                }
            }
        }
        result.accepted.push(record);
    }

    let mut reported: HashSet<&EmpNo> = HashSet::new();
    result.missing = existing
        .iter()
        .filter(|key| !seen.contains(*key) && reported.insert(*key))
        .cloned()
        .collect();

    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
