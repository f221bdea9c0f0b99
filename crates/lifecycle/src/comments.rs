use shared::{
    domain::CellCoordinate,
    protocol::{Patch, TransitionPayload},
};
use tracing::{info, warn};

use crate::{
    directory::record_best_effort,
    error::{LifecycleError, NOT_REDRAWN},
    StateSynchronizer,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentReport {
    pub cell: CellCoordinate,
    pub payload: TransitionPayload,
    /// Set when the backend stored the comment but the note could not be placed.
    pub apply_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentOutcome {
    Written(CommentReport),
    /// Nothing to save.
    Noop,
}

/// `"<now> <local-part>: <text>"`.
pub fn format_comment(now: &str, email: &str, text: &str) -> String {
    let user = email.split('@').next().unwrap_or_default();
    format!("{now} {user}: {text}")
}

impl StateSynchronizer {
    pub async fn save_comment(&self, text: &str) -> Result<CommentOutcome, LifecycleError> {
        match self.write_comment(Some(text)).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => Err(self.abort("comment", err)),
        }
    }

    pub async fn delete_comment(&self) -> Result<CommentOutcome, LifecycleError> {
        match self.write_comment(None).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => Err(self.abort("delete_comment", err)),
        }
    }

    async fn write_comment(&self, text: Option<&str>) -> Result<CommentOutcome, LifecycleError> {
        let cell = self.entry_gate().await?;

        let cleaned = text.map(str::trim);
        if cleaned == Some("") {
            return Ok(CommentOutcome::Noop);
        }

        let context = self.resolver.resolve(Some(cell), true, None).await?;
        let note =
            cleaned.map(|text| format_comment(self.clock.now().as_str(), &context.email, text));
        let payload = TransitionPayload {
            job_card_code: context.job_card_code,
            operation: context.operation,
            comment: Patch::from_option(note.clone()),
            ..Default::default()
        };

        record_best_effort(self.audit.as_ref(), &payload).await;
        self.backend.send_to_db(&payload).await?;

        let apply_error = match self.surface.place_note(cell, note.as_deref()).await {
            Ok(()) => None,
            Err(err) => {
                warn!(
                    row = cell.row,
                    col = cell.column,
                    error = %err,
                    "comment stored but note placement failed"
                );
                self.notifier.show_error(NOT_REDRAWN);
                Some(format!("{err:#}"))
            }
        };
        info!(
            row = cell.row,
            col = cell.column,
            cleared = note.is_none(),
            "operation comment written"
        );
        Ok(CommentOutcome::Written(CommentReport {
            cell,
            payload,
            apply_error,
        }))
    }
}

#[cfg(test)]
#[path = "tests/comments_tests.rs"]
mod tests;
