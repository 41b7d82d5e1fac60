//! Persistence for the employee directory and the audit log.
//!
//! The reconciliation core only needs a handful of row operations: read the
//! existing keys, truncate, and a transactional batch of insert /
//! update-by-key / bulk-deactivate. [`DirectoryStore`] exposes exactly that.
//! A transaction is a staged copy of the table ([`DirectoryTx`]); committing
//! swaps it in atomically and dropping it is a rollback.
//!
//! # `FileStore` layout
//!
//! ```text
//! <root>/
//!   directory.json     (rows; .tmp + rename, mode 0600)
//!   sync_logs.jsonl    (one SyncLogEntry per line, append-only)
//! ```

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use roster_core::{EmpNo, EmployeeRecord, EmploymentStatus, StoredEmployee};

use crate::audit::{AuditJournal, LogId, SyncLogEntry};
use crate::error::{io_err, SyncError};
use crate::reconcile::Summary;

pub const DIRECTORY_FILE: &str = "directory.json";
pub const JOURNAL_FILE: &str = "sync_logs.jsonl";

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Row storage for the employee directory.
pub trait DirectoryStore {
    /// Every stored row, in insertion order.
    fn rows(&self) -> Result<Vec<StoredEmployee>, SyncError>;

    /// Keys of every stored row, in insertion order.
    fn existing_keys(&self) -> Result<Vec<EmpNo>, SyncError> {
        Ok(self.rows()?.into_iter().map(|r| r.record.empno).collect())
    }

    /// Remove every row immediately, outside any transaction.
    fn truncate(&mut self) -> Result<(), SyncError>;

    /// Stage a transaction over the current rows.
    fn begin(&self) -> Result<DirectoryTx, SyncError> {
        Ok(DirectoryTx::new(self.rows()?, Utc::now()))
    }

    /// Make every write staged in `tx` visible at once, or none of them.
    fn commit(&mut self, tx: DirectoryTx) -> Result<(), SyncError>;
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// Staged writes against a copy of the directory.
#[derive(Debug, Clone)]
pub struct DirectoryTx {
    rows: Vec<StoredEmployee>,
    positions: HashMap<EmpNo, usize>,
    now: DateTime<Utc>,
}

impl DirectoryTx {
    pub fn new(rows: Vec<StoredEmployee>, now: DateTime<Utc>) -> Self {
        let positions = rows
            .iter()
            .enumerate()
            .map(|(i, row)| (row.record.empno.clone(), i))
            .collect();
        Self {
            rows,
            positions,
            now,
        }
    }

    /// Add a new row stamped with the transaction time.
    pub fn insert(&mut self, record: EmployeeRecord) -> Result<(), SyncError> {
        if self.positions.contains_key(&record.empno) {
            return Err(SyncError::Store(format!(
                "insert of existing key {}",
                record.empno
            )));
        }
        self.positions.insert(record.empno.clone(), self.rows.len());
        self.rows.push(StoredEmployee {
            record,
            created_at: self.now,
            updated_at: self.now,
        });
        Ok(())
    }

    /// Replace every column of the row keyed by `record.empno`, keeping
    /// `created_at`.
    pub fn update_by_key(&mut self, record: EmployeeRecord) -> Result<(), SyncError> {
        let Some(&pos) = self.positions.get(&record.empno) else {
            return Err(SyncError::Store(format!(
                "update of unknown key {}",
                record.empno
            )));
        };
        let row = &mut self.rows[pos];
        row.record = record;
        row.updated_at = self.now;
        Ok(())
    }

    /// Set `INACTIVE` on every row whose key is in `keys`. Unknown keys are
    /// ignored. Returns the number of rows touched.
    pub fn deactivate(&mut self, keys: &[EmpNo]) -> usize {
        let mut touched = 0;
        for key in keys {
            if let Some(&pos) = self.positions.get(key) {
                let row = &mut self.rows[pos];
                row.record.status = Some(EmploymentStatus::Inactive);
                row.updated_at = self.now;
                touched += 1;
            }
        }
        touched
    }

    pub fn into_rows(self) -> Vec<StoredEmployee> {
        self.rows
    }
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DirectoryFile {
    saved_at: DateTime<Utc>,
    #[serde(default)]
    rows: Vec<StoredEmployee>,
}

/// Directory and audit log persisted as files under one root directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (lazily) a store rooted at `root`. Nothing is created until the
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn directory_path(&self) -> PathBuf {
        self.root.join(DIRECTORY_FILE)
    }

    pub fn journal_path(&self) -> PathBuf {
        self.root.join(JOURNAL_FILE)
    }

    fn ensure_root(&self) -> Result<(), SyncError> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root).map_err(|e| io_err(&self.root, e))?;
            set_permissions(&self.root, 0o700)?;
        }
        Ok(())
    }

    /// Atomically replace `directory.json`.
    ///
    /// Writes to `directory.json.tmp` then renames over the target.
    fn save_rows(&self, rows: Vec<StoredEmployee>) -> Result<(), SyncError> {
        self.ensure_root()?;
        let path = self.directory_path();
        let tmp = path.with_extension("json.tmp");
        let file = DirectoryFile {
            saved_at: Utc::now(),
            rows,
        };
        let json = serde_json::to_string_pretty(&file)?;
        std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
        set_permissions(&tmp, 0o600)?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(&path, e));
        }
        Ok(())
    }

    /// Id of the last readable journal entry plus one.
    ///
    /// Scans backwards from the end of the file so the cost is bounded by
    /// the size of the last entry, not the whole log.
    fn next_log_id(&self) -> Result<LogId, SyncError> {
        let path = self.journal_path();
        if !path.exists() {
            return Ok(1);
        }
        let mut file = File::open(&path).map_err(|e| io_err(&path, e))?;
        let mut pos = file.metadata().map_err(|e| io_err(&path, e))?.len();
        let mut tail: Vec<u8> = Vec::new();
        loop {
            while let Some(line) = pop_last_line(&mut tail, pos == 0) {
                match serde_json::from_slice::<EntryId>(&line) {
                    Ok(entry) => return Ok(entry.id + 1),
                    Err(e) => tracing::warn!(
                        "skipping unreadable journal line in {}: {e}",
                        path.display()
                    ),
                }
            }
            if pos == 0 {
                return Ok(1);
            }
            let len = JOURNAL_CHUNK.min(pos);
            pos -= len;
            let mut chunk = vec![0u8; len as usize];
            file.seek(SeekFrom::Start(pos))
                .and_then(|_| file.read_exact(&mut chunk))
                .map_err(|e| io_err(&path, e))?;
            chunk.extend_from_slice(&tail);
            tail = chunk;
        }
    }
}

/// Only the `id` of a journal line; the rest is ignored.
#[derive(Deserialize)]
struct EntryId {
    id: LogId,
}

const JOURNAL_CHUNK: u64 = 64 * 1024;

/// Split the last complete line off `tail`. A line is complete once a
/// preceding `\n` is in the buffer, or the buffer starts at offset 0.
fn pop_last_line(tail: &mut Vec<u8>, at_start: bool) -> Option<Vec<u8>> {
    while tail.last() == Some(&b'\n') {
        tail.pop();
    }
    match tail.iter().rposition(|b| *b == b'\n') {
        Some(i) => {
            let line = tail.split_off(i + 1);
            tail.pop();
            Some(line)
        }
        None if at_start && !tail.is_empty() => Some(std::mem::take(tail)),
        None => None,
    }
}

/// A crash mid-append leaves the journal without a trailing newline; start
/// the next entry on its own line.
fn terminate_torn_line(file: &mut File, path: &Path) -> Result<(), SyncError> {
    let len = file.metadata().map_err(|e| io_err(path, e))?.len();
    if len == 0 {
        return Ok(());
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))
        .and_then(|_| file.read_exact(&mut last))
        .map_err(|e| io_err(path, e))?;
    if last[0] != b'\n' {
        tracing::warn!("journal {} ends mid-entry; terminating it", path.display());
        file.write_all(b"\n").map_err(|e| io_err(path, e))?;
    }
    Ok(())
}

impl DirectoryStore for FileStore {
    fn rows(&self) -> Result<Vec<StoredEmployee>, SyncError> {
        let path = self.directory_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        let file: DirectoryFile = serde_json::from_str(&contents)?;
        Ok(file.rows)
    }

    fn truncate(&mut self) -> Result<(), SyncError> {
        self.save_rows(Vec::new())
    }

    fn commit(&mut self, tx: DirectoryTx) -> Result<(), SyncError> {
        self.save_rows(tx.into_rows())
    }
}

impl AuditJournal for FileStore {
    fn append(&mut self, payload: &Value, summary: &Summary) -> Result<LogId, SyncError> {
        self.ensure_root()?;
        let id = self.next_log_id()?;
        let entry = SyncLogEntry {
            id,
            payload: payload.clone(),
            summary: summary.clone(),
            created_at: Utc::now(),
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let path = self.journal_path();
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;
        terminate_torn_line(&mut file, &path)?;
        file.write_all(line.as_bytes()).map_err(|e| io_err(&path, e))?;
        file.sync_all().map_err(|e| io_err(&path, e))?;
        Ok(id)
    }

    fn entries(&self) -> Result<Vec<SyncLogEntry>, SyncError> {
        let path = self.journal_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&path).map_err(|e| io_err(&path, e))?;
        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| io_err(&path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!(
                    "skipping unreadable journal line in {}: {e}",
                    path.display()
                ),
            }
        }
        Ok(entries)
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Directory and audit log held in memory. Useful for embedding the engine
/// behind another persistence layer, and in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rows: Vec<StoredEmployee>,
    log: Vec<SyncLogEntry>,
}

impl MemoryStore {
    /// A store pre-populated with `records`, all stamped now.
    pub fn with_records(records: impl IntoIterator<Item = EmployeeRecord>) -> Self {
        let mut tx = DirectoryTx::new(Vec::new(), Utc::now());
        for record in records {
            // Later duplicates are dropped, matching payload semantics.
            let _ = tx.insert(record);
        }
        Self {
            rows: tx.into_rows(),
            log: Vec::new(),
        }
    }
}

impl DirectoryStore for MemoryStore {
    fn rows(&self) -> Result<Vec<StoredEmployee>, SyncError> {
        Ok(self.rows.clone())
    }

    fn truncate(&mut self) -> Result<(), SyncError> {
        self.rows.clear();
        Ok(())
    }

    fn commit(&mut self, tx: DirectoryTx) -> Result<(), SyncError> {
        self.rows = tx.into_rows();
        Ok(())
    }
}

impl AuditJournal for MemoryStore {
    fn append(&mut self, payload: &Value, summary: &Summary) -> Result<LogId, SyncError> {
        let id = self.log.len() as LogId + 1;
        self.log.push(SyncLogEntry {
            id,
            payload: payload.clone(),
            summary: summary.clone(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    fn entries(&self) -> Result<Vec<SyncLogEntry>, SyncError> {
        Ok(self.log.clone())
    }
}

#[cfg(unix)]
fn set_permissions(path: &Path, mode: u32) -> Result<(), SyncError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_permissions(_path: &Path, _mode: u32) -> Result<(), SyncError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use roster_core::SyncMode;
    use serde_json::json;
    use tempfile::TempDir;

    fn record(key: &str) -> EmployeeRecord {
        EmployeeRecord::new(EmpNo::from(key))
    }

    fn summary() -> Summary {
        Summary {
            mode: SyncMode::Replace,
            created: 0,
            updated: 0,
            skipped: 0,
            missing: vec![],
        }
    }

    #[test]
    fn empty_store_when_files_missing() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().join("data"));
        assert!(store.rows().unwrap().is_empty());
        assert!(store.entries().unwrap().is_empty());
        assert!(!store.root().exists(), "reads must not create the root");
    }

    #[test]
    fn commit_roundtrip_preserves_order() {
        let tmp = TempDir::new().unwrap();
        let mut store = FileStore::new(tmp.path());
        let mut tx = store.begin().unwrap();
        for key in ["C", "A", "B"] {
            tx.insert(record(key)).unwrap();
        }
        store.commit(tx).unwrap();

        assert_eq!(
            store.existing_keys().unwrap(),
            vec![EmpNo::from("C"), EmpNo::from("A"), EmpNo::from("B")]
        );
    }

    #[test]
    fn dropped_transaction_is_a_rollback() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path());
        {
            let mut tx = store.begin().unwrap();
            tx.insert(record("A")).unwrap();
        }
        assert!(store.rows().unwrap().is_empty());
    }

    #[test]
    fn tmp_file_cleaned_up_after_commit() {
        let tmp = TempDir::new().unwrap();
        let mut store = FileStore::new(tmp.path());
        store.truncate().unwrap();
        assert!(store.directory_path().exists());
        assert!(!store.directory_path().with_extension("json.tmp").exists());
    }

    #[test]
    fn update_keeps_created_at_and_deactivate_ignores_unknown_keys() {
        let earlier = Utc::now() - chrono::Duration::hours(1);
        let mut tx = DirectoryTx::new(Vec::new(), earlier);
        tx.insert(record("A")).unwrap();
        let rows = tx.into_rows();

        let later = Utc::now();
        let mut tx = DirectoryTx::new(rows, later);
        let mut changed = record("A");
        changed.position = Some("Clerk".into());
        tx.update_by_key(changed).unwrap();
        assert_eq!(tx.deactivate(&[EmpNo::from("A"), EmpNo::from("nope")]), 1);

        let row = &tx.into_rows()[0];
        assert_eq!(row.created_at, earlier);
        assert_eq!(row.updated_at, later);
        assert_eq!(row.record.position.as_deref(), Some("Clerk"));
        assert_eq!(row.record.status, Some(EmploymentStatus::Inactive));
    }

    #[test]
    fn insert_existing_and_update_unknown_are_errors() {
        let mut tx = DirectoryTx::new(Vec::new(), Utc::now());
        tx.insert(record("A")).unwrap();
        assert!(matches!(tx.insert(record("A")), Err(SyncError::Store(_))));
        assert!(matches!(
            tx.update_by_key(record("B")),
            Err(SyncError::Store(_))
        ));
    }

    #[test]
    fn journal_appends_lines_with_sequential_ids() {
        let tmp = TempDir::new().unwrap();
        let mut store = FileStore::new(tmp.path());
        assert_eq!(store.append(&json!([1]), &summary()).unwrap(), 1);
        assert_eq!(store.append(&json!({"a": 1}), &summary()).unwrap(), 2);

        let raw = std::fs::read_to_string(store.journal_path()).unwrap();
        assert_eq!(raw.lines().count(), 2);

        let entries = store.entries().unwrap();
        assert_eq!(entries[1].id, 2);
        assert_eq!(entries[1].payload, json!({"a": 1}));
    }

    #[test]
    fn torn_journal_tail_is_terminated_and_skipped() {
        let tmp = TempDir::new().unwrap();
        let mut store = FileStore::new(tmp.path());
        store.append(&json!([1]), &summary()).unwrap();
        {
            let mut file = OpenOptions::new()
                .append(true)
                .open(store.journal_path())
                .unwrap();
            file.write_all(br#"{"id":2,"payl"#).unwrap();
        }

        assert_eq!(store.entries().unwrap().len(), 1);
        assert_eq!(store.append(&json!([2]), &summary()).unwrap(), 2);

        let raw = std::fs::read_to_string(store.journal_path()).unwrap();
        assert_eq!(raw.lines().count(), 3, "torn line kept on its own line");
        let entries = store.entries().unwrap();
        assert_eq!(
            entries.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(entries[1].payload, json!([2]));
    }

    #[test]
    fn next_id_found_past_entries_larger_than_one_chunk() {
        let tmp = TempDir::new().unwrap();
        let mut store = FileStore::new(tmp.path());
        let big = json!(["x".repeat(3 * JOURNAL_CHUNK as usize)]);
        store.append(&big, &summary()).unwrap();
        store.append(&big, &summary()).unwrap();
        assert_eq!(store.next_log_id().unwrap(), 3);
    }

    #[test]
    fn last_line_split_handles_blank_lines_and_buffer_start() {
        let mut tail = b"partial\n{\"id\":1}\n\n".to_vec();
        assert_eq!(pop_last_line(&mut tail, false).unwrap(), br#"{"id":1}"#);
        assert_eq!(pop_last_line(&mut tail, false), None);
        assert_eq!(pop_last_line(&mut tail, true).unwrap(), b"partial");
        assert!(tail.is_empty());
    }

    #[test]
    fn memory_store_with_records_drops_duplicates() {
        let store = MemoryStore::with_records([record("A"), record("A"), record("B")]);
        assert_eq!(store.existing_keys().unwrap().len(), 2);
    }
}
