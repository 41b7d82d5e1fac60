//! Row normalization: loosely-keyed spreadsheet rows to [`EmployeeRecord`].
//!
//! Spreadsheet headers drift between revisions (hint text in parentheses,
//! embedded line breaks). Each canonical column carries an ordered list of
//! accepted header spellings in [`COLUMN_ALIASES`]; the first alias whose
//! value is present and non-empty wins. Input fields that match no alias are
//! dropped.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde_json::{Map, Number, Value};

use roster_core::{EmpNo, EmployeeRecord};

use crate::reconcile::SkipReason;

/// Canonical directory column a header alias maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    EmpNo,
    FirstName,
    MiddleName,
    LastName,
    Suffix,
    Division,
    Unit,
    AreaOfAssignment,
    Email,
    Sex,
    Birthdate,
    FundSource,
    Classification,
    SalaryGrade,
    Position,
    Salary,
}

/// Accepted header spellings per column, most specific first.
pub const COLUMN_ALIASES: &[(Column, &[&str])] = &[
    (Column::EmpNo, &["EMPLOYEE ID NUMBER"]),
    (Column::FirstName, &["FIRST NAME\n (JUAN)", "FIRST NAME"]),
    (Column::MiddleName, &["MIDDLE NAME\n (PEREZ)", "MIDDLE NAME"]),
    (Column::LastName, &["LASTNAME\n (CRUZ)", "LASTNAME"]),
    (Column::Suffix, &["EXT.", "EXT"]),
    (Column::Division, &["DIVISION"]),
    (Column::Unit, &["SECTION/UNIT"]),
    (
        Column::AreaOfAssignment,
        &[
            "OFFICE LOCATION/\nOFFICIAL STATION",
            "OFFICE LOCATION/OFFICIAL STATION",
        ],
    ),
    (Column::Email, &["ACTIVE AND WORKING EMAIL ADDRESS"]),
    (Column::Sex, &["GENDER"]),
    (
        Column::Birthdate,
        &["DATE OF BIRTH\n \n (DD-MMM-YYYY)", "DATE OF BIRTH"],
    ),
    (
        Column::FundSource,
        &[
            "FUND SOURCE FOR CONTRACTUAL, CONTRACT OF SERVICE AND JOB ORDER (BASED ON CREATION)",
            "FUND SOURCE",
        ],
    ),
    (
        Column::Classification,
        &[
            "CLASSIFICATION OF EMPLOYMENT (PERMANENT, COTERMINOUS, CASUAL, CONTRACTUAL, CONTRACT OF SERVICE, JOB ORDER)",
            "CLASSIFICATION OF EMPLOYMENT",
        ],
    ),
    (Column::SalaryGrade, &["SG"]),
    (Column::Position, &["POSITION TITLE"]),
    (Column::Salary, &["MONTHLY SALARY"]),
];

impl Column {
    fn apply(self, record: &mut EmployeeRecord, value: String) {
        let slot = match self {
            // The key is extracted before any other column.
            Column::EmpNo => return,
            Column::Birthdate => {
                record.birthdate = parse_date(&value);
                return;
            }
            Column::FirstName => &mut record.first_name,
            Column::MiddleName => &mut record.middle_name,
            Column::LastName => &mut record.last_name,
            Column::Suffix => &mut record.suffix,
            Column::Division => &mut record.division,
            Column::Unit => &mut record.unit,
            Column::AreaOfAssignment => &mut record.area_of_assignment,
            Column::Email => &mut record.email,
            Column::Sex => &mut record.sex,
            Column::FundSource => &mut record.fund_source,
            Column::Classification => &mut record.classification,
            Column::SalaryGrade => &mut record.salary_grade,
            Column::Position => &mut record.position,
            Column::Salary => &mut record.salary,
        };
        *slot = Some(value);
    }
}

/// Map one raw payload row onto the canonical record shape.
///
/// Rejects non-objects with [`SkipReason::NotARecord`] and rows whose
/// trimmed key is empty or absent with [`SkipReason::MissingKey`].
pub fn normalize(raw: &Value) -> Result<EmployeeRecord, SkipReason> {
    let Some(row) = raw.as_object() else {
        return Err(SkipReason::NotARecord);
    };

    let empno = lookup(row, Column::EmpNo)
        .and_then(|raw_key| EmpNo::parse(&raw_key))
        .ok_or(SkipReason::MissingKey)?;

    let mut record = EmployeeRecord::new(empno);
    for (column, aliases) in COLUMN_ALIASES {
        if let Some(value) = first_present(row, aliases) {
            column.apply(&mut record, value);
        }
    }
    Ok(record)
}

fn lookup(row: &Map<String, Value>, column: Column) -> Option<String> {
    COLUMN_ALIASES
        .iter()
        .find(|(c, _)| *c == column)
        .and_then(|(_, aliases)| first_present(row, aliases))
}

/// First alias with a present, non-empty scalar value, rendered as a string.
fn first_present(row: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .filter_map(|alias| row.get(*alias))
        .find_map(scalar_text)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(number_text(n)),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Integral floats (`1e3`, `1000.0`) render without a fraction so keys stay
/// stable whether the export typed the cell as int or float.
fn number_text(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < MAX_EXACT_FLOAT => {
            format!("{}", f as i64)
        }
        _ => n.to_string(),
    }
}

/// 2^53: every integral float below this is exact as `i64`.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Date-only formats seen in spreadsheet exports, tried in order.
///
/// `%Y` also accepts two digits, so each two-digit-year form comes before
/// its four-digit twin; `%y` fails on a four-digit year (trailing input).
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%B %d, %y",
    "%B %d, %Y",
    "%B %d %y",
    "%B %d %Y",
    "%d-%b-%y",
    "%d-%b-%Y",
    "%d %B %y",
    "%d %B %Y",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%d.%m.%Y",
];

/// Years below this are a misread (`0090`), not real birthdates.
const MIN_YEAR: i32 = 1000;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M:%S"];

/// Tolerant date parsing to `YYYY-MM-DD`.
///
/// Values already shaped like `YYYY-MM-DD` are returned verbatim. Anything
/// else is tried against common formats; timestamps are reduced to their
/// (UTC) date. Unparseable input yields `None`.
pub fn parse_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if is_canonical_date(raw) {
        return Some(raw.to_owned());
    }

    let date = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok().filter(plausible))
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_utc().date())
        })
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
        .filter(plausible)?;
    Some(date.format("%Y-%m-%d").to_string())
}

fn plausible(date: &NaiveDate) -> bool {
    date.year() >= MIN_YEAR
}

fn is_canonical_date(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
