use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use shared::{
    domain::{CellCoordinate, VisualStatus, DEFAULT_BACKGROUND},
    protocol::GoAction,
};

use crate::{backend::OperationBackend, grid::Grid};

/// Columns covered by a closed job card (`project` through `serial_number`).
pub const JOB_CARD_COLUMNS: std::ops::RangeInclusive<u32> = 1..=5;

/// Where confirmed transitions become visible.
#[async_trait]
pub trait VisualSurface: Send + Sync {
    /// `None` resets the cell to the default background.
    async fn paint(&self, cell: CellCoordinate, status: Option<VisualStatus>) -> Result<()>;
    async fn close_job_card(&self, row: u32) -> Result<()>;
    async fn place_note(&self, cell: CellCoordinate, note: Option<&str>) -> Result<()>;
}

/// Paints through the backend's `/wsop/go` actions.
pub struct RemoteSurface {
    backend: Arc<dyn OperationBackend>,
}

impl RemoteSurface {
    pub fn new(backend: Arc<dyn OperationBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl VisualSurface for RemoteSurface {
    async fn paint(&self, cell: CellCoordinate, status: Option<VisualStatus>) -> Result<()> {
        self.backend.go(&GoAction::color(cell, status)).await?;
        Ok(())
    }

    async fn close_job_card(&self, row: u32) -> Result<()> {
        self.backend.go(&GoAction::CloseJobCard { row }).await?;
        Ok(())
    }

    async fn place_note(&self, cell: CellCoordinate, note: Option<&str>) -> Result<()> {
        self.backend
            .go(&GoAction::cell_note(cell, note.map(str::to_string)))
            .await?;
        Ok(())
    }
}

/// Writes colours and notes straight into a [`Grid`].
pub struct GridSurface {
    grid: Arc<dyn Grid>,
}

impl GridSurface {
    pub fn new(grid: Arc<dyn Grid>) -> Self {
        Self { grid }
    }
}

#[async_trait]
impl VisualSurface for GridSurface {
    async fn paint(&self, cell: CellCoordinate, status: Option<VisualStatus>) -> Result<()> {
        let color = status.map_or(DEFAULT_BACKGROUND, VisualStatus::background);
        self.grid.set_background(cell, color).await
    }

    async fn close_job_card(&self, row: u32) -> Result<()> {
        for column in JOB_CARD_COLUMNS {
            let cell = CellCoordinate::new(row, column)?;
            self.grid
                .set_background(cell, VisualStatus::Completed.background())
                .await?;
        }
        Ok(())
    }

    async fn place_note(&self, cell: CellCoordinate, note: Option<&str>) -> Result<()> {
        self.grid.set_note(cell, note).await
    }
}

#[cfg(test)]
#[path = "tests/surface_tests.rs"]
mod tests;
