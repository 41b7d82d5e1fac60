//! # roster-sync
//!
//! Reconciliation engine for the employee directory.
//!
//! Call [`pipeline::initialize`] for a full reset or [`pipeline::sync`] for an
//! incremental merge. Both normalize the payload ([`normalize`]), classify it
//! against the stored keys ([`reconcile`]), write an audit entry ([`audit`])
//! and only then mutate the directory ([`apply`]).

pub mod apply;
pub mod audit;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod store;

pub use audit::{AuditJournal, LogId, SyncLogEntry};
pub use error::SyncError;
pub use pipeline::{initialize, respond, sync, SyncResponse};
pub use reconcile::{Reconciliation, SkipReason, SkippedRow, Summary};
pub use store::{DirectoryStore, DirectoryTx, FileStore, MemoryStore};
