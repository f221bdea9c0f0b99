use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use client_core::RequestError;
use serde_json::{json, Value};
use shared::{
    domain::{AccessGrant, CellCoordinate, Timestamp, VisualStatus},
    protocol::{
        GoAction, HealthStatus, JobCardInfo, JsonObject, OperationLookup, OperationRecord,
        TransitionPayload,
    },
};

use crate::{
    clock::FixedClock,
    directory::{AuditSink, StaticGrants},
    grid::MemoryGrid,
    surface::{GridSurface, VisualSurface},
    Collaborators, Notifier, StateSynchronizer,
};

pub const OPERATOR: &str = "ivan.petrov@example.com";
pub const ADMIN: &str = "chief@example.com";
pub const JOB_CARD_ID: &str = "1AbC-x_9";
pub const SHEET: &str = "master";

/// First operation column, labelled by the `operations` header.
pub const FIRST_OP: u32 = 6;
pub const SECOND_OP: u32 = 7;
pub const FINAL_OP: u32 = 8;

pub fn cell(row: u32, column: u32) -> CellCoordinate {
    CellCoordinate::new(row, column).expect("coordinate")
}

pub fn ts(raw: &str) -> Timestamp {
    Timestamp::parse(raw).expect("timestamp")
}

pub fn fixed_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 14)
        .and_then(|d| d.and_hms_opt(9, 30, 0))
        .expect("datetime")
}

pub const NOW: &str = "2024-05-14T09:30";

/// Header row plus one job card with three operations.
pub fn fixture_grid(user: &str) -> MemoryGrid {
    MemoryGrid::new(SHEET, user)
        .with_rows(vec![
            vec![
                "project",
                "creation_date",
                "name",
                "part_number",
                "serial_number",
                "operations",
                "",
                "",
            ],
            vec![
                "PRJ-1", "2024-05-01", "JC-1", "PN-77", "SN-001", "123_ABC", "200_NDT", "PPK",
            ],
        ])
        .with_formula(
            cell(2, 3),
            "=HYPERLINK(\"https://docs.google.com/spreadsheets/d/1AbC-x_9/edit\"; \"JC-1\")",
        )
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Send(Value),
    Go(Value),
    Lookup(String, String),
    JobCard(String),
    Health,
}

/// Records every call and answers from scripted lookups.
#[derive(Default)]
pub struct FakeBackend {
    calls: Mutex<Vec<BackendCall>>,
    lookups: Mutex<HashMap<(String, String), OperationLookup>>,
    fail_send: Mutex<Option<u16>>,
    fail_go: Mutex<Option<u16>>,
    fail_lookup: Mutex<bool>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_times(&self, operation: &str, start: Option<&str>, end: Option<&str>) {
        let record = OperationRecord {
            start_dttm: start.map(ts),
            end_dttm: end.map(ts),
            comment: Value::Null,
        };
        self.lookups.lock().expect("lookups").insert(
            (JOB_CARD_ID.to_string(), operation.to_string()),
            OperationLookup {
                status: Some("success".into()),
                data: Some(record),
            },
        );
    }

    pub fn fail_send_with(&self, status: u16) {
        *self.fail_send.lock().expect("fail_send") = Some(status);
    }

    pub fn fail_go_with(&self, status: u16) {
        *self.fail_go.lock().expect("fail_go") = Some(status);
    }

    pub fn fail_lookups(&self) {
        *self.fail_lookup.lock().expect("fail_lookup") = true;
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().expect("calls").clone()
    }

    pub fn sent(&self) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::Send(body) => Some(body),
                _ => None,
            })
            .collect()
    }

    pub fn actions(&self) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BackendCall::Go(body) => Some(body),
                _ => None,
            })
            .collect()
    }

    /// Calls that change remote state.
    pub fn writes(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, BackendCall::Send(_) | BackendCall::Go(_)))
            .count()
    }

    fn push(&self, call: BackendCall) {
        self.calls.lock().expect("calls").push(call);
    }
}

fn scripted_failure(status: u16) -> RequestError {
    RequestError::Status {
        status,
        body: "{\"error\":\"scripted\"}".into(),
    }
}

#[async_trait]
impl crate::OperationBackend for FakeBackend {
    async fn send_to_db(&self, payload: &TransitionPayload) -> Result<JsonObject, RequestError> {
        self.push(BackendCall::Send(serde_json::to_value(payload)?));
        match *self.fail_send.lock().expect("fail_send") {
            Some(status) => Err(scripted_failure(status)),
            None => Ok(JsonObject::new()),
        }
    }

    async fn go(&self, action: &GoAction) -> Result<JsonObject, RequestError> {
        self.push(BackendCall::Go(action.to_body()));
        match *self.fail_go.lock().expect("fail_go") {
            Some(status) => Err(scripted_failure(status)),
            None => Ok(JsonObject::new()),
        }
    }

    async fn single_operation(
        &self,
        job_card_id: &str,
        operation: &str,
    ) -> Result<OperationLookup, RequestError> {
        self.push(BackendCall::Lookup(
            job_card_id.to_string(),
            operation.to_string(),
        ));
        if *self.fail_lookup.lock().expect("fail_lookup") {
            return Err(scripted_failure(503));
        }
        Ok(self
            .lookups
            .lock()
            .expect("lookups")
            .get(&(job_card_id.to_string(), operation.to_string()))
            .cloned()
            .unwrap_or(OperationLookup {
                status: Some("success".into()),
                data: Some(OperationRecord::default()),
            }))
    }

    async fn job_card(&self, job_card_id: &str) -> Result<JobCardInfo, RequestError> {
        self.push(BackendCall::JobCard(job_card_id.to_string()));
        let data = json!({
            "project": "PRJ-1",
            "operations": { "123_ABC": { "used_mnhrs": 45 } }
        });
        Ok(serde_json::from_value(data)?)
    }

    async fn health(&self) -> Result<HealthStatus, RequestError> {
        self.push(BackendCall::Health);
        Ok(HealthStatus {
            ok: true,
            status: 200,
            body: "ok".into(),
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().expect("messages").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn show_error(&self, message: &str) {
        self.messages
            .lock()
            .expect("messages")
            .push(message.to_string());
    }
}

#[derive(Default)]
pub struct RecordingAudit {
    entries: Mutex<Vec<Value>>,
    failing: bool,
}

impl RecordingAudit {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn entries(&self) -> Vec<Value> {
        self.entries.lock().expect("entries").clone()
    }
}

#[async_trait]
impl AuditSink for RecordingAudit {
    async fn record(&self, payload: &TransitionPayload) -> anyhow::Result<()> {
        if self.failing {
            return Err(anyhow!("audit log unavailable"));
        }
        self.entries
            .lock()
            .expect("entries")
            .push(serde_json::to_value(payload)?);
        Ok(())
    }
}

/// Surface whose every write fails.
pub struct BrokenSurface;

#[async_trait]
impl VisualSurface for BrokenSurface {
    async fn paint(
        &self,
        _cell: CellCoordinate,
        _status: Option<VisualStatus>,
    ) -> anyhow::Result<()> {
        Err(anyhow!("sheet is protected"))
    }

    async fn close_job_card(&self, _row: u32) -> anyhow::Result<()> {
        Err(anyhow!("sheet is protected"))
    }

    async fn place_note(&self, _cell: CellCoordinate, _note: Option<&str>) -> anyhow::Result<()> {
        Err(anyhow!("sheet is protected"))
    }
}

pub struct Harness {
    pub grid: Arc<MemoryGrid>,
    pub backend: Arc<FakeBackend>,
    pub notifier: Arc<RecordingNotifier>,
    pub audit: Arc<RecordingAudit>,
    pub sync: StateSynchronizer,
}

pub struct HarnessBuilder {
    grid: MemoryGrid,
    grants: Vec<AccessGrant>,
    audit: RecordingAudit,
    broken_surface: bool,
}

impl HarnessBuilder {
    pub fn new(user: &str) -> Self {
        Self {
            grid: fixture_grid(user),
            grants: Vec::new(),
            audit: RecordingAudit::default(),
            broken_surface: false,
        }
    }

    pub fn grid(mut self, grid: MemoryGrid) -> Self {
        self.grid = grid;
        self
    }

    pub fn grant(mut self, email: &str, scope: &str) -> Self {
        self.grants.push(AccessGrant::new(email, scope));
        self
    }

    pub fn failing_audit(mut self) -> Self {
        self.audit = RecordingAudit::failing();
        self
    }

    pub fn broken_surface(mut self) -> Self {
        self.broken_surface = true;
        self
    }

    pub async fn build(self, active: Option<CellCoordinate>) -> Harness {
        let grid = Arc::new(self.grid);
        grid.select(active).await;
        let backend = FakeBackend::new();
        let notifier = Arc::new(RecordingNotifier::default());
        let audit = Arc::new(self.audit);
        let surface: Arc<dyn VisualSurface> = if self.broken_surface {
            Arc::new(BrokenSurface)
        } else {
            Arc::new(GridSurface::new(grid.clone()))
        };

        let sync = StateSynchronizer::new(
            Collaborators {
                grid: grid.clone(),
                grants: Arc::new(StaticGrants::new(self.grants)),
                backend: backend.clone(),
                surface,
                audit: audit.clone(),
                notifier: notifier.clone(),
                clock: Arc::new(FixedClock(fixed_now())),
            },
            SHEET,
        );

        Harness {
            grid,
            backend,
            notifier,
            audit,
            sync,
        }
    }
}
