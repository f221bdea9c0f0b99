use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Value};

use crate::domain::{CellCoordinate, Timestamp, VisualStatus};

pub type JsonObject = serde_json::Map<String, Value>;

/// Partial-update field: omitted, explicitly nulled, or set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    #[default]
    Keep,
    Clear,
    Set(T),
}

impl<T> Patch<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }

    /// `None` becomes an explicit null.
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Set(v),
            None => Self::Clear,
        }
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Self::Set(v) => Some(v),
            _ => None,
        }
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Set(v) => v.serialize(serializer),
            Self::Keep | Self::Clear => serializer.serialize_none(),
        }
    }
}

/// Body of `POST /wsop`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TransitionPayload {
    #[serde(skip_serializing_if = "Patch::is_keep")]
    pub email: Patch<String>,
    #[serde(rename = "jobCardCode")]
    pub job_card_code: Option<String>,
    pub operation: Option<String>,
    #[serde(rename = "startDateTime", skip_serializing_if = "Patch::is_keep")]
    pub start_date_time: Patch<Timestamp>,
    #[serde(rename = "endDateTime", skip_serializing_if = "Patch::is_keep")]
    pub end_date_time: Patch<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_mnhrs: Option<u32>,
    #[serde(skip_serializing_if = "Patch::is_keep")]
    pub comment: Patch<String>,
}

impl TransitionPayload {
    /// Status the acted-on cell takes once this payload is confirmed.
    pub fn derived_status(&self) -> Option<VisualStatus> {
        VisualStatus::derive(self.start_date_time.is_set(), self.end_date_time.is_set())
    }
}

/// Actions dispatched through `POST /wsop/go`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoAction {
    Color {
        row: u32,
        col: u32,
        status: Option<VisualStatus>,
    },
    UpdateDatabase,
    UpdateProjects,
    UpdateMaster,
    CloseJobCard {
        row: u32,
    },
    /// Row and column are 0-based on the wire.
    CellNote {
        row: u32,
        col: u32,
        note: Option<String>,
    },
}

impl GoAction {
    pub fn color(cell: CellCoordinate, status: Option<VisualStatus>) -> Self {
        Self::Color {
            row: cell.row,
            col: cell.column,
            status,
        }
    }

    pub fn cell_note(cell: CellCoordinate, note: Option<String>) -> Self {
        Self::CellNote {
            row: cell.row - 1,
            col: cell.column - 1,
            note,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Color { .. } => "color",
            Self::UpdateDatabase => "db_upd",
            Self::UpdateProjects => "prj_upd",
            Self::UpdateMaster => "mstr_upd",
            Self::CloseJobCard { .. } => "jc_clr",
            Self::CellNote { .. } => "cell_note",
        }
    }

    pub fn data(&self) -> Value {
        match self {
            Self::Color { row, col, status } => match status {
                Some(status) => json!({ "row": row, "col": col, "status": status.as_str() }),
                None => json!({ "row": row, "col": col }),
            },
            Self::UpdateDatabase | Self::UpdateProjects | Self::UpdateMaster => json!({}),
            Self::CloseJobCard { row } => json!({ "row": row }),
            Self::CellNote { row, col, note } => json!({ "row": row, "col": col, "note": note }),
        }
    }

    pub fn to_body(&self) -> Value {
        json!({ "action": self.name(), "data": self.data() })
    }
}

/// One operation as stored by the backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperationRecord {
    #[serde(default)]
    pub start_dttm: Option<Timestamp>,
    #[serde(default)]
    pub end_dttm: Option<Timestamp>,
    #[serde(default)]
    pub comment: Value,
}

impl OperationRecord {
    /// Empty or non-string comments read as absent.
    pub fn comment_text(&self) -> Option<String> {
        match &self.comment {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

/// Response of `GET /wsop/<jobCard>/<operation>`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperationLookup {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub data: Option<OperationRecord>,
}

impl OperationLookup {
    pub fn into_record(self) -> Option<OperationRecord> {
        if self.status.as_deref() == Some("success") {
            self.data
        } else {
            None
        }
    }
}

/// `data` object of `GET /wsop/<jobCard>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobCardInfo {
    #[serde(default)]
    pub operations: JsonObject,
    #[serde(flatten)]
    pub rest: JsonObject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub ok: bool,
    pub status: u16,
    pub body: String,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
