//! Mutation applier: the only writer of the employee directory.
//!
//! Must run after the audit entry for the same [`Reconciliation`] has been
//! recorded.
//!
//! - `Replace`: truncate (committed on its own, outside the transaction),
//!   then insert every accepted row in one transaction.
//! - `MergeSync`: one transaction that updates rows whose key was in the
//!   snapshot, inserts the rest, then deactivates every missing key.
//!
//! A failed write drops the staged transaction, so nothing from it becomes
//! visible.

use std::collections::HashSet;

use roster_core::{EmpNo, SyncMode};

use crate::error::SyncError;
use crate::reconcile::Reconciliation;
use crate::store::DirectoryStore;

/// What the applier actually wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub deactivated: usize,
}

/// Write `rec` to `store` according to `rec.mode`.
pub fn apply<S>(store: &mut S, rec: &Reconciliation) -> Result<ApplyOutcome, SyncError>
where
    S: DirectoryStore + ?Sized,
{
    let outcome = match rec.mode {
        SyncMode::Replace => replace_all(store, rec),
        SyncMode::MergeSync => merge_sync(store, rec),
    }
    .inspect_err(|e| tracing::error!("{} mutation rolled back: {e}", rec.mode))?;

    tracing::info!(
        "{} applied: {} inserted, {} updated, {} deactivated",
        rec.mode,
        outcome.inserted,
        outcome.updated,
        outcome.deactivated
    );
    Ok(outcome)
}

fn replace_all<S>(store: &mut S, rec: &Reconciliation) -> Result<ApplyOutcome, SyncError>
where
    S: DirectoryStore + ?Sized,
{
    // Not part of the transaction below: a failure after this point leaves
    // an empty or partially filled directory.
    store.truncate()?;

    let mut tx = store.begin()?;
    for record in &rec.accepted {
        tx.insert(record.clone())?;
    }
    store.commit(tx)?;

    Ok(ApplyOutcome {
        inserted: rec.accepted.len(),
        ..ApplyOutcome::default()
    })
}

fn merge_sync<S>(store: &mut S, rec: &Reconciliation) -> Result<ApplyOutcome, SyncError>
where
    S: DirectoryStore + ?Sized,
{
    let prior: HashSet<&EmpNo> = rec.updated.iter().collect();
    let mut outcome = ApplyOutcome::default();

    let mut tx = store.begin()?;
    for record in &rec.accepted {
        if prior.contains(&record.empno) {
            tx.update_by_key(record.clone())?;
            outcome.updated += 1;
        } else {
            tx.insert(record.clone())?;
            outcome.inserted += 1;
        }
    }
    if !rec.missing.is_empty() {
        outcome.deactivated = tx.deactivate(&rec.missing);
    }
    store.commit(tx)?;

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::reconcile;
    use crate::store::{DirectoryTx, MemoryStore};
    use roster_core::{EmployeeRecord, EmploymentStatus, StoredEmployee};

    fn record(key: &str) -> EmployeeRecord {
        EmployeeRecord::new(EmpNo::from(key))
    }

    fn status_of(store: &MemoryStore, key: &str) -> Option<EmploymentStatus> {
        store
            .rows()
            .unwrap()
            .into_iter()
            .find(|r| r.record.empno.as_str() == key)
            .and_then(|r| r.record.status)
    }

    /// Commits always fail; truncates succeed.
    struct FailingCommit(MemoryStore);

    impl DirectoryStore for FailingCommit {
        fn rows(&self) -> Result<Vec<StoredEmployee>, SyncError> {
            self.0.rows()
        }
        fn truncate(&mut self) -> Result<(), SyncError> {
            self.0.truncate()
        }
        fn commit(&mut self, _tx: DirectoryTx) -> Result<(), SyncError> {
            Err(SyncError::Store("disk full".into()))
        }
    }

    #[test]
    fn merge_sync_upserts_and_deactivates() {
        let mut store = MemoryStore::with_records(["A", "B", "C"].map(record));
        let existing = store.existing_keys().unwrap();
        let mut changed = record("A");
        changed.position = Some("Analyst".into());
        let rec = reconcile(vec![Ok(changed), Ok(record("D"))], &existing, SyncMode::MergeSync);

        let outcome = apply(&mut store, &rec).unwrap();
        assert_eq!(
            outcome,
            ApplyOutcome {
                inserted: 1,
                updated: 1,
                deactivated: 2
            }
        );
        assert_eq!(status_of(&store, "A"), Some(EmploymentStatus::Active));
        assert_eq!(status_of(&store, "D"), Some(EmploymentStatus::Active));
        assert_eq!(status_of(&store, "B"), Some(EmploymentStatus::Inactive));
        assert_eq!(status_of(&store, "C"), Some(EmploymentStatus::Inactive));
        assert_eq!(store.rows().unwrap().len(), 4, "deactivation never deletes");
    }

    #[test]
    fn replace_discards_prior_rows() {
        let mut store = MemoryStore::with_records(["OLD"].map(record));
        let existing = store.existing_keys().unwrap();
        let rec = reconcile(vec![Ok(record("NEW"))], &existing, SyncMode::Replace);

        apply(&mut store, &rec).unwrap();
        assert_eq!(store.existing_keys().unwrap(), vec![EmpNo::from("NEW")]);
    }

    #[test]
    fn failed_merge_commit_leaves_directory_untouched() {
        let mut store = FailingCommit(MemoryStore::with_records(["A", "B"].map(record)));
        let existing = store.existing_keys().unwrap();
        let rec = reconcile(vec![Ok(record("C"))], &existing, SyncMode::MergeSync);

        let err = apply(&mut store, &rec).unwrap_err();
        assert!(matches!(err, SyncError::Store(_)));
        assert_eq!(status_of(&store.0, "A"), None);
        assert_eq!(store.0.existing_keys().unwrap().len(), 2);
    }

    #[test]
    fn failed_replace_commit_still_truncated() {
        let mut store = FailingCommit(MemoryStore::with_records(["A"].map(record)));
        let rec = reconcile(vec![Ok(record("B"))], &[EmpNo::from("A")], SyncMode::Replace);

        assert!(apply(&mut store, &rec).is_err());
        assert!(
            store.0.rows().unwrap().is_empty(),
            "truncate is committed before the insert transaction"
        );
    }
}
