use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Operation code that marks the final inspection of a job card.
pub const FINAL_INSPECTION: &str = "PPK";
/// Grant scope that satisfies every access check.
pub const ADMIN_SCOPE: &str = "ADMIN";
/// Background of a cell that carries no status.
pub const DEFAULT_BACKGROUND: &str = "#ffffff";
/// Wire and display format of operation timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("invalid operation code: {0:?}")]
    InvalidOperationCode(String),
    #[error("cell coordinates are 1-based, got row {row} column {column}")]
    InvalidCoordinate { row: u32, column: u32 },
    #[error("invalid timestamp {0:?}, expected YYYY-MM-DDTHH:MM")]
    InvalidTimestamp(String),
}

/// Returns true when `value` is `PPK` or `NNN_SEGMENT(_SEGMENT)*`.
///
/// Surrounding whitespace is ignored. Segments are one or more uppercase
/// ASCII letters.
pub fn is_valid_operation_code(value: &str) -> bool {
    let value = value.trim();
    if value == FINAL_INSPECTION {
        return true;
    }

    let Some((digits, rest)) = value.split_at_checked(3) else {
        return false;
    };
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let Some(segments) = rest.strip_prefix('_') else {
        return false;
    };

    segments
        .split('_')
        .all(|segment| !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_uppercase()))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OperationCode(String);

impl OperationCode {
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        if is_valid_operation_code(value) {
            Ok(Self(value.trim().to_string()))
        } else {
            Err(DomainError::InvalidOperationCode(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_final_inspection(&self) -> bool {
        self.0 == FINAL_INSPECTION
    }
}

impl TryFrom<String> for OperationCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OperationCode> for String {
    fn from(value: OperationCode) -> Self {
        value.0
    }
}

impl fmt::Display for OperationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantScope {
    Admin,
    Substring(String),
}

impl GrantScope {
    /// Parses a raw scope column. `ADMIN` is the administrative sentinel,
    /// anything else is matched as a substring of operation codes.
    pub fn from_raw(raw: &str) -> Self {
        if raw == ADMIN_SCOPE {
            Self::Admin
        } else {
            Self::Substring(raw.to_string())
        }
    }

    pub fn as_raw(&self) -> &str {
        match self {
            Self::Admin => ADMIN_SCOPE,
            Self::Substring(s) => s,
        }
    }

    pub fn covers(&self, code: &str) -> bool {
        match self {
            Self::Admin => true,
            Self::Substring(s) => code.contains(s.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub email: String,
    pub scope: GrantScope,
}

impl AccessGrant {
    pub fn new(email: impl Into<String>, scope: &str) -> Self {
        Self {
            email: email.into(),
            scope: GrantScope::from_raw(scope),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct CellCoordinate {
    pub row: u32,
    pub column: u32,
}

#[derive(Deserialize)]
struct RawCoordinate {
    row: u32,
    column: u32,
}

impl TryFrom<RawCoordinate> for CellCoordinate {
    type Error = DomainError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Self::new(raw.row, raw.column)
    }
}

impl CellCoordinate {
    pub fn new(row: u32, column: u32) -> Result<Self, DomainError> {
        if row == 0 || column == 0 {
            return Err(DomainError::InvalidCoordinate { row, column });
        }
        Ok(Self { row, column })
    }

    /// The cell one column to the left, if it is still on the grid.
    pub fn left(self) -> Option<Self> {
        Self::new(self.row, self.column.checked_sub(1)?).ok()
    }

    pub fn right(self) -> Self {
        Self {
            row: self.row,
            column: self.column + 1,
        }
    }

    pub fn with_column(self, column: u32) -> Result<Self, DomainError> {
        Self::new(self.row, column)
    }
}

impl fmt::Display for CellCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}C{}", self.row, self.column)
    }
}

/// Operation timestamp as exchanged with the backend.
///
/// Locally produced values always use [`TIMESTAMP_FORMAT`]; values read back
/// from the backend are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let raw = raw.trim();
        NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
            .map_err(|_| DomainError::InvalidTimestamp(raw.to_string()))?;
        Ok(Self(raw.to_string()))
    }

    pub fn from_local(value: NaiveDateTime) -> Self {
        Self(value.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualStatus {
    Pending,
    InWork,
    Completed,
}

impl VisualStatus {
    /// `None` means the cell shows no status.
    pub fn derive(start_set: bool, end_set: bool) -> Option<Self> {
        if end_set {
            Some(Self::Completed)
        } else if start_set {
            Some(Self::InWork)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InWork => "in_work",
            Self::Completed => "completed",
        }
    }

    pub fn background(self) -> &'static str {
        match self {
            Self::Pending => "#ffa61a",
            Self::InWork => "#ffe699",
            Self::Completed => "#b3e6b3",
        }
    }
}

pub fn is_default_background(color: &str) -> bool {
    color.trim().eq_ignore_ascii_case(DEFAULT_BACKGROUND)
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
