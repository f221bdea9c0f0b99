use std::sync::Arc;

use shared::domain::CellCoordinate;
use tracing::debug;

use crate::{context::OperationContextResolver, error::LifecycleError, grid::Grid};

/// Header that labels the first operation column.
pub const SEQUENCE_MARKER: &str = "operations";

#[derive(Clone)]
pub struct SequenceValidator {
    grid: Arc<dyn Grid>,
    resolver: OperationContextResolver,
}

impl SequenceValidator {
    pub fn new(grid: Arc<dyn Grid>, resolver: OperationContextResolver) -> Self {
        Self { grid, resolver }
    }

    /// True when the operation left of `coordinate` has an end timestamp,
    /// or when `coordinate` is the first operation column.
    pub async fn is_prior_closed(
        &self,
        coordinate: Option<CellCoordinate>,
    ) -> Result<bool, LifecycleError> {
        let Some(coordinate) = coordinate else {
            return Ok(false);
        };

        let header = self.grid.header_row().await.map_err(LifecycleError::Grid)?;
        let marker_column = header
            .iter()
            .position(|h| h == SEQUENCE_MARKER)
            .map(|i| i as u32 + 1);
        if marker_column == Some(coordinate.column) {
            return Ok(true);
        }

        let Some(prior) = coordinate.left() else {
            return Ok(false);
        };
        let context = self
            .resolver
            .resolve(Some(coordinate), true, Some(prior.column))
            .await?;
        debug!(
            row = prior.row,
            col = prior.column,
            closed = context.end_date_time.is_some(),
            "checked prior operation"
        );
        Ok(context.end_date_time.is_some())
    }
}

#[cfg(test)]
#[path = "tests/sequence_tests.rs"]
mod tests;
