use serde::{Deserialize, Serialize};

use crate::cell::{Cell, CellValue};

static EMPTY: CellValue = CellValue::Empty;

/// A sparse row of cells kept in column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    index: u32,
    cells: Vec<Cell>,
}

impl Row {
    pub(crate) fn new(index: u32) -> Self {
        Self {
            index,
            cells: Vec::new(),
        }
    }

    /// Zero-based row index within the worksheet.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    fn position(&self, col: u32) -> Result<usize, usize> {
        self.cells.binary_search_by_key(&col, Cell::col)
    }

    #[must_use]
    pub fn cell(&self, col: u32) -> Option<&Cell> {
        self.position(col).ok().map(|pos| &self.cells[pos])
    }

    pub fn cell_mut(&mut self, col: u32) -> Option<&mut Cell> {
        match self.position(col) {
            Ok(pos) => Some(&mut self.cells[pos]),
            Err(_) => None,
        }
    }

    /// Cell at `col`, created empty if the column has none yet.
    pub fn create_cell(&mut self, col: u32) -> &mut Cell {
        let pos = match self.position(col) {
            Ok(pos) => pos,
            Err(pos) => {
                self.cells.insert(pos, Cell::new(col));
                pos
            }
        };
        &mut self.cells[pos]
    }

    /// Value at `col`; columns without a cell are empty.
    #[must_use]
    pub fn value(&self, col: u32) -> &CellValue {
        self.cell(col).map_or(&EMPTY, Cell::value)
    }

    pub fn set_value(&mut self, col: u32, value: impl Into<CellValue>) -> &mut Cell {
        let cell = self.create_cell(col);
        cell.set_value(value);
        cell
    }

    /// Cells in column order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// One past the last column that has a cell.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.cells.last().map_or(0, |cell| cell.col() + 1)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|cell| cell.value().is_empty())
    }
}
