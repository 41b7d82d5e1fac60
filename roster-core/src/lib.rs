//! Roster core library: domain types, configuration, errors.
//!
//! - [`types`]: employee records, keys, status and mode enums
//! - [`config`]: `~/.roster/config.yaml` and data-dir resolution
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::ConfigError;
pub use types::{EmpNo, EmployeeRecord, EmploymentStatus, StoredEmployee, SyncMode};
