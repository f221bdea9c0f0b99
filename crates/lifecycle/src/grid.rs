use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::domain::{CellCoordinate, DEFAULT_BACKGROUND};
use std::path::Path;
use tokio::sync::RwLock;

/// Row/column addressed view of the active spreadsheet.
#[async_trait]
pub trait Grid: Send + Sync {
    async fn sheet_name(&self) -> Result<String>;
    /// Row 1, padded to the last used column.
    async fn header_row(&self) -> Result<Vec<String>>;
    async fn row(&self, row: u32) -> Result<Vec<String>>;
    async fn value(&self, cell: CellCoordinate) -> Result<String>;
    async fn formula(&self, cell: CellCoordinate) -> Result<Option<String>>;
    async fn background(&self, cell: CellCoordinate) -> Result<String>;
    async fn set_value(&self, cell: CellCoordinate, value: &str) -> Result<()>;
    async fn set_background(&self, cell: CellCoordinate, color: &str) -> Result<()>;
    async fn set_note(&self, cell: CellCoordinate, note: Option<&str>) -> Result<()>;
    async fn active_cell(&self) -> Result<Option<CellCoordinate>>;
    async fn current_user(&self) -> Result<String>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellMeta {
    pub row: u32,
    pub column: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Serializable state of a [`MemoryGrid`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub sheet_name: String,
    pub current_user: String,
    #[serde(default)]
    pub active_cell: Option<CellCoordinate>,
    /// `values[0]` is the header row.
    #[serde(default)]
    pub values: Vec<Vec<String>>,
    #[serde(default)]
    pub cells: Vec<CellMeta>,
}

impl GridSnapshot {
    fn last_column(&self) -> usize {
        self.values.iter().map(Vec::len).max().unwrap_or(0)
    }

    fn padded_row(&self, index: usize) -> Vec<String> {
        let mut row = self.values.get(index).cloned().unwrap_or_default();
        row.resize(self.last_column(), String::new());
        row
    }

    fn meta(&self, cell: CellCoordinate) -> Option<&CellMeta> {
        self.cells
            .iter()
            .find(|m| m.row == cell.row && m.column == cell.column)
    }

    fn meta_mut(&mut self, cell: CellCoordinate) -> &mut CellMeta {
        let index = match self
            .cells
            .iter()
            .position(|m| m.row == cell.row && m.column == cell.column)
        {
            Some(index) => index,
            None => {
                self.cells.push(CellMeta {
                    row: cell.row,
                    column: cell.column,
                    ..Default::default()
                });
                self.cells.len() - 1
            }
        };
        &mut self.cells[index]
    }
}

/// Zero-based (row, column) offsets of a cell.
fn offsets(cell: CellCoordinate) -> Result<(usize, usize)> {
    let row = cell.row.checked_sub(1).context("grid rows are 1-based")?;
    let column = cell.column.checked_sub(1).context("grid columns are 1-based")?;
    Ok((row as usize, column as usize))
}

/// In-process [`Grid`] backed by a [`GridSnapshot`].
#[derive(Debug, Default)]
pub struct MemoryGrid {
    state: RwLock<GridSnapshot>,
}

impl MemoryGrid {
    pub fn new(sheet_name: impl Into<String>, current_user: impl Into<String>) -> Self {
        Self::from_snapshot(GridSnapshot {
            sheet_name: sheet_name.into(),
            current_user: current_user.into(),
            ..Default::default()
        })
    }

    pub fn from_snapshot(snapshot: GridSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read grid snapshot '{}'", path.display()))?;
        let snapshot: GridSnapshot = serde_json::from_str(&raw)
            .with_context(|| format!("invalid grid snapshot '{}'", path.display()))?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(&*self.state.read().await)?;
        std::fs::write(path, raw)
            .with_context(|| format!("failed to write grid snapshot '{}'", path.display()))
    }

    pub fn with_rows(self, rows: Vec<Vec<&str>>) -> Self {
        let mut state = self.state.into_inner();
        state.values = rows
            .into_iter()
            .map(|row| row.into_iter().map(str::to_string).collect())
            .collect();
        Self::from_snapshot(state)
    }

    pub fn with_formula(self, cell: CellCoordinate, formula: &str) -> Self {
        let mut state = self.state.into_inner();
        state.meta_mut(cell).formula = Some(formula.to_string());
        Self::from_snapshot(state)
    }

    pub fn with_background(self, cell: CellCoordinate, color: &str) -> Self {
        let mut state = self.state.into_inner();
        state.meta_mut(cell).background = Some(color.to_string());
        Self::from_snapshot(state)
    }

    pub async fn select(&self, cell: Option<CellCoordinate>) {
        self.state.write().await.active_cell = cell;
    }

    pub async fn switch_sheet(&self, sheet_name: &str) {
        self.state.write().await.sheet_name = sheet_name.to_string();
    }

    pub async fn note(&self, cell: CellCoordinate) -> Option<String> {
        self.state
            .read()
            .await
            .meta(cell)
            .and_then(|m| m.note.clone())
    }

    pub async fn snapshot(&self) -> GridSnapshot {
        self.state.read().await.clone()
    }
}

#[async_trait]
impl Grid for MemoryGrid {
    async fn sheet_name(&self) -> Result<String> {
        Ok(self.state.read().await.sheet_name.clone())
    }

    async fn header_row(&self) -> Result<Vec<String>> {
        Ok(self.state.read().await.padded_row(0))
    }

    async fn row(&self, row: u32) -> Result<Vec<String>> {
        let index = row
            .checked_sub(1)
            .context("grid rows are 1-based")? as usize;
        Ok(self.state.read().await.padded_row(index))
    }

    async fn value(&self, cell: CellCoordinate) -> Result<String> {
        let (row, column) = offsets(cell)?;
        let state = self.state.read().await;
        Ok(state
            .values
            .get(row)
            .and_then(|cells| cells.get(column))
            .cloned()
            .unwrap_or_default())
    }

    async fn formula(&self, cell: CellCoordinate) -> Result<Option<String>> {
        Ok(self
            .state
            .read()
            .await
            .meta(cell)
            .and_then(|m| m.formula.clone()))
    }

    async fn background(&self, cell: CellCoordinate) -> Result<String> {
        Ok(self
            .state
            .read()
            .await
            .meta(cell)
            .and_then(|m| m.background.clone())
            .unwrap_or_else(|| DEFAULT_BACKGROUND.to_string()))
    }

    async fn set_value(&self, cell: CellCoordinate, value: &str) -> Result<()> {
        let (row, column) = offsets(cell)?;
        let mut state = self.state.write().await;
        if state.values.len() <= row {
            state.values.resize(row + 1, Vec::new());
        }
        let cells = &mut state.values[row];
        if cells.len() <= column {
            cells.resize(column + 1, String::new());
        }
        cells[column] = value.to_string();
        Ok(())
    }

    async fn set_background(&self, cell: CellCoordinate, color: &str) -> Result<()> {
        self.state.write().await.meta_mut(cell).background = Some(color.to_string());
        Ok(())
    }

    async fn set_note(&self, cell: CellCoordinate, note: Option<&str>) -> Result<()> {
        self.state.write().await.meta_mut(cell).note = note.map(str::to_string);
        Ok(())
    }

    async fn active_cell(&self) -> Result<Option<CellCoordinate>> {
        Ok(self.state.read().await.active_cell)
    }

    async fn current_user(&self) -> Result<String> {
        Ok(self.state.read().await.current_user.clone())
    }
}

#[cfg(test)]
#[path = "tests/grid_tests.rs"]
mod tests;
