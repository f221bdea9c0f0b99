use shared::protocol::{GoAction, HealthStatus, JobCardInfo};
use tracing::info;

use crate::{
    error::{LifecycleError, NO_JOB_CARD},
    StateSynchronizer,
};

/// Refresh order of the backend dataflow.
pub const DATAFLOW_ACTIONS: [GoAction; 3] = [
    GoAction::UpdateDatabase,
    GoAction::UpdateMaster,
    GoAction::UpdateProjects,
];

impl StateSynchronizer {
    /// Aggregate job-card data for the row of the active cell.
    pub async fn job_card_info(&self) -> Result<JobCardInfo, LifecycleError> {
        match self.fetch_job_card().await {
            Ok(info) => Ok(info),
            Err(err) => Err(self.abort("info", err)),
        }
    }

    async fn fetch_job_card(&self) -> Result<JobCardInfo, LifecycleError> {
        let sheet = self.grid.sheet_name().await.map_err(LifecycleError::Grid)?;
        if sheet != self.operational_sheet {
            return Err(LifecycleError::rejected(format!(
                "Change list to {}",
                self.operational_sheet
            )));
        }

        let cell = self.grid.active_cell().await.map_err(LifecycleError::Grid)?;
        let context = self.resolver.resolve(cell, false, None).await?;
        let Some(job_card_id) = context.job_card_code else {
            return Err(LifecycleError::rejected(NO_JOB_CARD));
        };
        Ok(self.backend.job_card(&job_card_id).await?)
    }

    /// Stops at the first failing step.
    pub async fn dataflow_update(&self) -> Result<(), LifecycleError> {
        for action in &DATAFLOW_ACTIONS {
            if let Err(err) = self.backend.go(action).await {
                return Err(self.abort("update", err.into()));
            }
            info!(action = action.name(), "dataflow step complete");
        }
        Ok(())
    }

    pub async fn health(&self) -> Result<HealthStatus, LifecycleError> {
        self.backend
            .health()
            .await
            .map_err(|err| self.abort("health", err.into()))
    }
}

#[cfg(test)]
#[path = "tests/info_tests.rs"]
mod tests;
