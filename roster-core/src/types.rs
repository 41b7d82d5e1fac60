//! Domain types for the employee directory.
//!
//! Serialized field names follow the directory table's column names
//! (`fname`, `sname`, `eaddress`, …) so stored rows and log payloads stay
//! readable next to the upstream spreadsheet export.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// The identifying key of an employee (`empno`).
///
/// Case-sensitive. Construct through [`EmpNo::parse`] to get the trimmed,
/// non-empty guarantee; `From` impls exist for tests and stored data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmpNo(pub String);

impl EmpNo {
    /// Trim `raw` and reject it if nothing is left.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmpNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for EmpNo {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EmpNo {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Value of the `status_description` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum EmploymentStatus {
    #[default]
    Active,
    Inactive,
}

impl fmt::Display for EmploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmploymentStatus::Active => write!(f, "ACTIVE"),
            EmploymentStatus::Inactive => write!(f, "INACTIVE"),
        }
    }
}

impl FromStr for EmploymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "INACTIVE" => Ok(Self::Inactive),
            other => Err(format!(
                "unknown status '{other}'; expected: ACTIVE, INACTIVE"
            )),
        }
    }
}

/// Mutation policy for one reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncMode {
    /// Full reset: the directory is wiped and every accepted row is inserted.
    #[serde(rename = "initialize")]
    Replace,
    /// Incremental: upsert accepted rows, deactivate rows absent from the payload.
    #[serde(rename = "sync")]
    MergeSync,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Replace => write!(f, "initialize"),
            SyncMode::MergeSync => write!(f, "sync"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// Canonical employee record, as produced by row normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub empno: EmpNo,
    #[serde(rename = "fname", default)]
    pub first_name: Option<String>,
    #[serde(rename = "mname", default)]
    pub middle_name: Option<String>,
    #[serde(rename = "sname", default)]
    pub last_name: Option<String>,
    #[serde(rename = "ename", default)]
    pub suffix: Option<String>,
    #[serde(rename = "division_name", default)]
    pub division: Option<String>,
    #[serde(rename = "unit_name", default)]
    pub unit: Option<String>,
    #[serde(rename = "area_assignment_name", default)]
    pub area_of_assignment: Option<String>,
    #[serde(rename = "eaddress", default)]
    pub email: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
    /// `YYYY-MM-DD` when known.
    #[serde(default)]
    pub birthdate: Option<String>,
    #[serde(rename = "fund_source_name", default)]
    pub fund_source: Option<String>,
    #[serde(rename = "classification_employment_name", default)]
    pub classification: Option<String>,
    #[serde(rename = "salary_history_id", default)]
    pub salary_grade: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub salary: Option<String>,
    #[serde(rename = "status_description", default)]
    pub status: Option<EmploymentStatus>,
}

impl EmployeeRecord {
    /// A record carrying only its key.
    pub fn new(empno: EmpNo) -> Self {
        Self {
            empno,
            first_name: None,
            middle_name: None,
            last_name: None,
            suffix: None,
            division: None,
            unit: None,
            area_of_assignment: None,
            email: None,
            sex: None,
            birthdate: None,
            fund_source: None,
            classification: None,
            salary_grade: None,
            position: None,
            salary: None,
            status: None,
        }
    }

    /// "Last, First Middle Suffix" with absent parts omitted.
    pub fn display_name(&self) -> String {
        let given: Vec<&str> = [&self.first_name, &self.middle_name, &self.suffix]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .collect();
        match (self.last_name.as_deref(), given.is_empty()) {
            (Some(last), false) => format!("{last}, {}", given.join(" ")),
            (Some(last), true) => last.to_owned(),
            (None, _) => given.join(" "),
        }
    }
}

/// A row of the employee directory table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEmployee {
    #[serde(flatten)]
    pub record: EmployeeRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredEmployee {
    pub fn empno(&self) -> &EmpNo {
        &self.record.empno
    }

    pub fn is_active(&self) -> bool {
        self.record.status != Some(EmploymentStatus::Inactive)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
