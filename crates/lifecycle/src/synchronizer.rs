use std::{fmt, sync::Arc};

use shared::{
    domain::{
        is_default_background, is_valid_operation_code, CellCoordinate, Timestamp, VisualStatus,
        FINAL_INSPECTION,
    },
    protocol::{Patch, TransitionPayload},
};
use tracing::{info, warn};

use crate::{
    access::AccessValidator,
    backend::OperationBackend,
    clock::Clock,
    context::{OperationContext, OperationContextResolver},
    directory::{record_best_effort, AuditSink},
    error::{
        LifecycleError, ADMIN_ONLY, ALREADY_CLOSED, NOT_REDRAWN, NO_OPERATION, PRIOR_OPEN,
        WRONG_INPUT,
    },
    grid::Grid,
    sequence::SequenceValidator,
    surface::VisualSurface,
    Collaborators, Notifier,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaState {
    Validating,
    Confirming,
    Applying,
    Done,
    Rejected,
    Failed,
}

impl SagaState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Confirming => "confirming",
            Self::Applying => "applying",
            Self::Done => "done",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SagaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Start,
    /// `duration` is the raw operator input in minutes.
    Close { duration: String },
    Edit {
        start: Option<String>,
        end: Option<String>,
    },
    /// Administrative reset of both timestamps.
    Clear,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Close { .. } => "close",
            Self::Edit { .. } => "edit",
            Self::Clear => "clear",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionReport {
    pub cell: CellCoordinate,
    pub payload: TransitionPayload,
    pub status: Option<VisualStatus>,
    /// States passed through, in order.
    pub trail: Vec<SagaState>,
    /// Set when the backend confirmed the write but the visual update failed.
    pub apply_error: Option<String>,
}

impl TransitionReport {
    pub fn state(&self) -> SagaState {
        self.trail.last().copied().unwrap_or(SagaState::Validating)
    }
}

/// Leading-integer parse of operator input; anything unusable is 0.
/// Values past `u32::MAX` saturate.
pub fn parse_duration(raw: &str) -> u32 {
    let raw = raw.trim_start();
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if negative {
        return 0;
    }
    let digits = &digits[..end];
    if digits.is_empty() {
        return 0;
    }
    digits.parse::<u32>().unwrap_or(u32::MAX)
}

fn parse_edit_timestamp(raw: Option<&str>) -> Result<Patch<Timestamp>, LifecycleError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Patch::Keep),
        Some(value) => Timestamp::parse(value).map(Patch::Set).map_err(|_| {
            LifecycleError::rejected(format!(
                "Invalid date/time {value:?}, expected YYYY-MM-DDTHH:MM"
            ))
        }),
    }
}

/// Runs status transitions as a saga: validate, confirm remotely, then apply.
pub struct StateSynchronizer {
    pub(crate) grid: Arc<dyn Grid>,
    pub(crate) backend: Arc<dyn OperationBackend>,
    pub(crate) surface: Arc<dyn VisualSurface>,
    pub(crate) audit: Arc<dyn AuditSink>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) resolver: OperationContextResolver,
    pub(crate) access: AccessValidator,
    pub(crate) sequence: SequenceValidator,
    pub(crate) operational_sheet: String,
}

impl StateSynchronizer {
    pub fn new(collaborators: Collaborators, operational_sheet: impl Into<String>) -> Self {
        let Collaborators {
            grid,
            grants,
            backend,
            surface,
            audit,
            notifier,
            clock,
        } = collaborators;
        let resolver = OperationContextResolver::new(grid.clone(), backend.clone());
        Self {
            access: AccessValidator::new(grants),
            sequence: SequenceValidator::new(grid.clone(), resolver.clone()),
            resolver,
            grid,
            backend,
            surface,
            audit,
            notifier,
            clock,
            operational_sheet: operational_sheet.into(),
        }
    }

    /// Context of the active cell, enriched from the backend.
    pub async fn active_context(&self) -> Result<OperationContext, LifecycleError> {
        let cell = self.grid.active_cell().await.map_err(LifecycleError::Grid)?;
        self.resolver.resolve(cell, true, None).await
    }

    pub async fn run(&self, action: Action) -> Result<TransitionReport, LifecycleError> {
        let name = action.name();
        let mut trail = vec![SagaState::Validating];

        let (cell, payload) = match self.plan(&action).await {
            Ok(planned) => planned,
            Err(err) => return Err(self.abort(name, err)),
        };
        let status = payload.derived_status();

        trail.push(SagaState::Confirming);
        record_best_effort(self.audit.as_ref(), &payload).await;
        if let Err(err) = self.backend.send_to_db(&payload).await {
            return Err(self.abort(name, err.into()));
        }

        trail.push(SagaState::Applying);
        let apply_error = match self.apply(cell, &payload, status).await {
            Ok(()) => None,
            Err(err) => {
                warn!(
                    action = name,
                    row = cell.row,
                    col = cell.column,
                    error = %err,
                    "remote write confirmed but visual update failed"
                );
                self.notifier.show_error(NOT_REDRAWN);
                Some(format!("{err:#}"))
            }
        };

        trail.push(SagaState::Done);
        info!(
            action = name,
            row = cell.row,
            col = cell.column,
            operation = payload.operation.as_deref().unwrap_or_default(),
            status = status.map_or("none", VisualStatus::as_str),
            state = %SagaState::Done,
            "operation transition complete"
        );
        Ok(TransitionReport {
            cell,
            payload,
            status,
            trail,
            apply_error,
        })
    }

    /// Reports a stopped transition to the operator and returns the error.
    pub(crate) fn abort(&self, action: &str, err: LifecycleError) -> LifecycleError {
        let state = match &err {
            LifecycleError::Rejected(_) => SagaState::Rejected,
            _ => SagaState::Failed,
        };
        let message = err.user_message().message;
        info!(action, state = %state, error = %err, "operation transition stopped");
        self.notifier.show_error(&message);
        err
    }

    /// Sheet, code and grant checks shared by every operator action.
    pub(crate) async fn entry_gate(&self) -> Result<CellCoordinate, LifecycleError> {
        let sheet = self.grid.sheet_name().await.map_err(LifecycleError::Grid)?;
        if sheet != self.operational_sheet {
            return Err(LifecycleError::rejected(WRONG_INPUT));
        }
        let Some(cell) = self.grid.active_cell().await.map_err(LifecycleError::Grid)? else {
            return Err(LifecycleError::rejected(WRONG_INPUT));
        };
        let value = self.grid.value(cell).await.map_err(LifecycleError::Grid)?;
        let email = self.grid.current_user().await.map_err(LifecycleError::Grid)?;
        if !self.access.can_act_on(&email, &value).await? {
            return Err(LifecycleError::rejected(WRONG_INPUT));
        }
        Ok(cell)
    }

    async fn sequence_gate(&self, cell: CellCoordinate) -> Result<(), LifecycleError> {
        if self.sequence.is_prior_closed(Some(cell)).await? {
            Ok(())
        } else {
            Err(LifecycleError::rejected(PRIOR_OPEN))
        }
    }

    async fn require_admin(&self) -> Result<(), LifecycleError> {
        let email = self.grid.current_user().await.map_err(LifecycleError::Grid)?;
        if self.access.is_admin(&email).await? {
            Ok(())
        } else {
            Err(LifecycleError::rejected(ADMIN_ONLY))
        }
    }

    async fn plan(
        &self,
        action: &Action,
    ) -> Result<(CellCoordinate, TransitionPayload), LifecycleError> {
        match action {
            Action::Start => self.plan_start().await,
            Action::Close { duration } => self.plan_close(duration).await,
            Action::Edit { start, end } => self.plan_edit(start.as_deref(), end.as_deref()).await,
            Action::Clear => self.plan_clear().await,
        }
    }

    async fn plan_start(&self) -> Result<(CellCoordinate, TransitionPayload), LifecycleError> {
        let cell = self.entry_gate().await?;
        self.sequence_gate(cell).await?;

        let context = self.resolver.resolve(Some(cell), true, None).await?;
        if context.end_date_time.is_some() {
            return Err(LifecycleError::rejected(ALREADY_CLOSED));
        }

        let payload = TransitionPayload {
            email: Patch::Set(context.email),
            job_card_code: context.job_card_code,
            operation: context.operation,
            start_date_time: Patch::Set(self.clock.now()),
            ..Default::default()
        };
        Ok((cell, payload))
    }

    async fn plan_close(
        &self,
        duration: &str,
    ) -> Result<(CellCoordinate, TransitionPayload), LifecycleError> {
        let cell = self.entry_gate().await?;
        self.sequence_gate(cell).await?;

        let context = self.resolver.resolve(Some(cell), true, None).await?;
        let now = self.clock.now();
        let start_date_time = if context.start_date_time.is_none() {
            Patch::Set(now.clone())
        } else {
            Patch::Keep
        };

        let payload = TransitionPayload {
            email: Patch::Set(context.email),
            job_card_code: context.job_card_code,
            operation: context.operation,
            start_date_time,
            end_date_time: Patch::Set(now),
            used_mnhrs: Some(parse_duration(duration)),
            ..Default::default()
        };
        Ok((cell, payload))
    }

    async fn plan_edit(
        &self,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<(CellCoordinate, TransitionPayload), LifecycleError> {
        let cell = self.entry_gate().await?;
        self.require_admin().await?;
        self.sequence_gate(cell).await?;

        let start_date_time = parse_edit_timestamp(start)?;
        let end_date_time = parse_edit_timestamp(end)?;
        let context = self.resolver.resolve(Some(cell), false, None).await?;

        let payload = TransitionPayload {
            email: Patch::Set(context.email),
            job_card_code: context.job_card_code,
            operation: context.operation,
            start_date_time,
            end_date_time,
            ..Default::default()
        };
        Ok((cell, payload))
    }

    async fn plan_clear(&self) -> Result<(CellCoordinate, TransitionPayload), LifecycleError> {
        self.require_admin().await?;

        let sheet = self.grid.sheet_name().await.map_err(LifecycleError::Grid)?;
        if sheet != self.operational_sheet {
            return Err(LifecycleError::rejected(WRONG_INPUT));
        }
        let Some(cell) = self.grid.active_cell().await.map_err(LifecycleError::Grid)? else {
            return Err(LifecycleError::rejected(NO_OPERATION));
        };
        let value = self.grid.value(cell).await.map_err(LifecycleError::Grid)?;
        if !is_valid_operation_code(&value) {
            return Err(LifecycleError::rejected(NO_OPERATION));
        }
        self.sequence_gate(cell).await?;

        let context = self.resolver.resolve(Some(cell), false, None).await?;
        Ok((cell, clear_payload(context)))
    }

    async fn apply(
        &self,
        cell: CellCoordinate,
        payload: &TransitionPayload,
        status: Option<VisualStatus>,
    ) -> anyhow::Result<()> {
        self.surface.paint(cell, status).await?;
        if status != Some(VisualStatus::Completed) {
            return Ok(());
        }

        if payload.operation.as_deref().map(str::trim) == Some(FINAL_INSPECTION) {
            self.surface.close_job_card(cell.row).await?;
        } else {
            let next = cell.right();
            let background = self.grid.background(next).await?;
            if is_default_background(&background) {
                self.surface.paint(next, Some(VisualStatus::Pending)).await?;
            }
        }
        Ok(())
    }
}

/// Timestamps are passed through from the context, so the same context
/// always yields the same payload.
pub fn clear_payload(context: OperationContext) -> TransitionPayload {
    TransitionPayload {
        email: Patch::Clear,
        job_card_code: context.job_card_code,
        operation: context.operation,
        start_date_time: Patch::from_option(context.start_date_time),
        end_date_time: Patch::from_option(context.end_date_time),
        ..Default::default()
    }
}

#[cfg(test)]
#[path = "tests/synchronizer_tests.rs"]
mod tests;
