use std::sync::Arc;

use serde::Serialize;
use shared::domain::{CellCoordinate, Timestamp};
use tracing::debug;

use crate::{backend::OperationBackend, error::LifecycleError, grid::Grid};

pub const PROJECT_HEADER: &str = "project";
pub const NAME_HEADER: &str = "name";

/// Everything known about the acted-on cell. Built fresh on every read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationContext {
    pub email: String,
    /// Cell the context was resolved for, when there was one.
    pub cell: Option<CellCoordinate>,
    pub project: Option<String>,
    pub job_card_name: Option<String>,
    pub job_card_code: Option<String>,
    pub operation: Option<String>,
    pub start_date_time: Option<Timestamp>,
    pub end_date_time: Option<Timestamp>,
    pub comment: Option<String>,
}

/// Extracts the spreadsheet id from a `=HYPERLINK("…/d/<id>/…"; …)` formula.
pub fn job_card_id_from_formula(formula: &str) -> Option<String> {
    if !formula.starts_with("=HYPERLINK(") {
        return None;
    }

    let (_, tail) = formula.split_once("/d/")?;
    let id: String = tail
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    (!id.is_empty()).then_some(id)
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

#[derive(Clone)]
pub struct OperationContextResolver {
    grid: Arc<dyn Grid>,
    backend: Arc<dyn OperationBackend>,
}

impl OperationContextResolver {
    pub fn new(grid: Arc<dyn Grid>, backend: Arc<dyn OperationBackend>) -> Self {
        Self { grid, backend }
    }

    /// Resolves the context at `coordinate`, reading `override_column`
    /// instead of the coordinate's own column when given.
    ///
    /// With `enrich`, timestamps and the comment are fetched from the
    /// backend; lookup failures leave them unset.
    pub async fn resolve(
        &self,
        coordinate: Option<CellCoordinate>,
        enrich: bool,
        override_column: Option<u32>,
    ) -> Result<OperationContext, LifecycleError> {
        let email = self
            .grid
            .current_user()
            .await
            .map_err(LifecycleError::Grid)?;
        let mut context = OperationContext {
            email,
            ..Default::default()
        };

        let Some(coordinate) = coordinate else {
            return Ok(context);
        };
        let column = override_column.unwrap_or(coordinate.column);
        let Ok(cell) = coordinate.with_column(column) else {
            return Ok(context);
        };
        context.cell = Some(cell);

        let header = self.grid.header_row().await.map_err(LifecycleError::Grid)?;
        let project_index = header.iter().position(|h| h == PROJECT_HEADER);
        let name_index = header.iter().position(|h| h == NAME_HEADER);

        let values = self.grid.row(cell.row).await.map_err(LifecycleError::Grid)?;
        context.project = project_index.and_then(|i| non_empty(values.get(i)));
        context.job_card_name = name_index.and_then(|i| non_empty(values.get(i)));
        context.operation = non_empty(values.get(cell.column as usize - 1));

        if let Some(index) = name_index {
            let name_cell = cell
                .with_column(index as u32 + 1)
                .map_err(|err| LifecycleError::Grid(err.into()))?;
            let formula = self
                .grid
                .formula(name_cell)
                .await
                .map_err(LifecycleError::Grid)?;
            context.job_card_code = formula.as_deref().and_then(job_card_id_from_formula);
        }

        if enrich {
            self.enrich(&mut context).await;
        }
        Ok(context)
    }

    async fn enrich(&self, context: &mut OperationContext) {
        let (Some(job_card_id), Some(operation)) =
            (context.job_card_code.as_deref(), context.operation.as_deref())
        else {
            return;
        };

        match self.backend.single_operation(job_card_id, operation).await {
            Ok(lookup) => match lookup.into_record() {
                Some(record) => {
                    context.comment = record.comment_text();
                    context.start_date_time = record.start_dttm;
                    context.end_date_time = record.end_dttm;
                }
                None => debug!(job_card_id, operation, "operation lookup returned no data"),
            },
            Err(err) => debug!(job_card_id, operation, error = %err, "operation lookup failed"),
        }
    }
}

#[cfg(test)]
#[path = "tests/context_tests.rs"]
mod tests;
