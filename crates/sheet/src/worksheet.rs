use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use gridfile_formulas::{
    rewrite_row_references, CellAddress, FormulaError, FormulaEvaluator, Value, ValueResolver,
};
use serde::{Deserialize, Serialize};

use crate::cell::{Cell, CellValue};
use crate::clone::content_for_copy;
use crate::error::{Result, SheetError};
use crate::row::Row;
use crate::style::StyleTable;

/// Rows per worksheet in the xlsx format.
pub const MAX_ROWS: u32 = 1_048_576;
/// Columns per worksheet in the xlsx format.
pub const MAX_COLS: u32 = 16_384;

static EMPTY: CellValue = CellValue::Empty;

fn check_row_index(row: u32) -> Result<()> {
    if row < MAX_ROWS {
        Ok(())
    } else {
        Err(SheetError::RowOutOfRange(row))
    }
}

fn check_col_index(col: u32) -> Result<()> {
    if col < MAX_COLS {
        Ok(())
    } else {
        Err(SheetError::ColumnOutOfRange(col))
    }
}

/// Outcome of a formula recalculation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Recalculation {
    pub evaluated: usize,
    pub failed: usize,
}

impl std::ops::AddAssign for Recalculation {
    fn add_assign(&mut self, other: Self) {
        self.evaluated += other.evaluated;
        self.failed += other.failed;
    }
}

/// A named worksheet owning its rows.
///
/// Rows live in an index-keyed arena of boxed slots. [`Worksheet::get_row`]
/// materializes a row on first access and returns the same row on every
/// later access, even after the arena grows; [`Worksheet::check_row`] only
/// looks. Indices are bounded by [`MAX_ROWS`] and [`MAX_COLS`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worksheet {
    name: String,
    rows: Vec<Option<Box<Row>>>,
    refresh_on_load: bool,
}

impl Worksheet {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
            refresh_on_load: false,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Row at `index`, created empty if it has not been materialized.
    pub fn get_row(&mut self, index: u32) -> Result<&mut Row> {
        check_row_index(index)?;
        let slot = index as usize;
        if slot >= self.rows.len() {
            self.rows.resize_with(slot + 1, || None);
        }
        Ok(self.rows[slot].get_or_insert_with(|| Box::new(Row::new(index))))
    }

    /// Row at `index` if it has been materialized. Never creates one.
    #[must_use]
    pub fn check_row(&self, index: u32) -> Option<&Row> {
        self.rows.get(index as usize).and_then(|slot| slot.as_deref())
    }

    pub fn check_row_mut(&mut self, index: u32) -> Option<&mut Row> {
        self.rows.get_mut(index as usize).and_then(|slot| slot.as_deref_mut())
    }

    /// Materialized rows in index order.
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter().flatten().map(|row| &**row)
    }

    /// One past the highest materialized row index.
    #[must_use]
    pub fn row_span(&self) -> u32 {
        self.rows.len() as u32
    }

    /// Widest materialized row.
    #[must_use]
    pub fn col_span(&self) -> u32 {
        self.rows().map(Row::width).max().unwrap_or(0)
    }

    #[must_use]
    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.check_row(row).and_then(|r| r.cell(col))
    }

    /// Cell at (`row`, `col`), materializing the row and cell as needed.
    pub fn create_cell(&mut self, row: u32, col: u32) -> Result<&mut Cell> {
        check_col_index(col)?;
        Ok(self.get_row(row)?.create_cell(col))
    }

    #[must_use]
    pub fn value(&self, row: u32, col: u32) -> &CellValue {
        self.cell(row, col).map_or(&EMPTY, Cell::value)
    }

    pub fn set_value(
        &mut self,
        row: u32,
        col: u32,
        value: impl Into<CellValue>,
    ) -> Result<&mut Cell> {
        let cell = self.create_cell(row, col)?;
        cell.set_value(value);
        Ok(cell)
    }

    #[must_use]
    pub fn refresh_on_load(&self) -> bool {
        self.refresh_on_load
    }

    /// Ask consumers to recompute derived caches (pivot-style views) when the
    /// document is next opened.
    pub fn set_refresh_on_load(&mut self, refresh: bool) {
        self.refresh_on_load = refresh;
    }

    /// Propagate the formula in each seed cell of `start_row` down
    /// `row_count` rows, for every column in `start_col..=end_col`.
    ///
    /// Row numbers in each copy are rewritten to the destination row.
    /// Columns whose seed is not a formula are skipped. Returns the number
    /// of cells written. A target range past the worksheet bounds is
    /// rejected before anything is written.
    pub fn apply_shared_formula(
        &mut self,
        start_row: u32,
        row_count: u32,
        start_col: u32,
        end_col: u32,
    ) -> Result<usize> {
        if row_count == 0 || start_col > end_col {
            return Ok(0);
        }
        let last_row = u64::from(start_row) + u64::from(row_count) - 1;
        check_row_index(u32::try_from(last_row).unwrap_or(u32::MAX))?;
        check_col_index(end_col)?;

        let mut written = 0;
        for col in start_col..=end_col {
            let seed = match self.value(start_row, col).formula_source() {
                Some(source) if !source.trim().is_empty() => source.to_string(),
                _ => {
                    tracing::debug!(
                        sheet = %self.name,
                        cell = %CellAddress::new(start_row, col),
                        "Seed cell holds no formula; column skipped"
                    );
                    continue;
                }
            };

            for row in start_row..start_row + row_count {
                let formula = rewrite_row_references(&seed, row + 1);
                self.set_value(row, col, CellValue::formula(formula))?;
                written += 1;
            }
        }
        Ok(written)
    }

    /// Non-empty values of `col` in every materialized row after the header.
    #[must_use]
    pub fn column_values(&self, col: u32) -> Vec<&CellValue> {
        self.rows()
            .filter(|row| row.index() > 0)
            .map(|row| row.value(col))
            .filter(|value| !value.is_empty())
            .collect()
    }

    /// Copy every cell of row `src` into row `dest`, styles included.
    ///
    /// Returns `false` when `src` was never materialized.
    pub fn copy_row(&mut self, src: u32, dest: u32, styles: &StyleTable) -> Result<bool> {
        let Some(source) = self.check_row(src).cloned() else {
            return Ok(false);
        };
        self.paste_row(&source, dest, styles)?;
        Ok(true)
    }

    pub(crate) fn paste_row(&mut self, source: &Row, dest: u32, styles: &StyleTable) -> Result<()> {
        let target = self.get_row(dest)?;
        for cell in source.cells() {
            let copied = target.create_cell(cell.col());
            copied.set_style(cell.style());
            if let Some(value) = content_for_copy(cell.value(), styles.resolve(cell.style())) {
                copied.set_value(value);
            }
        }
        Ok(())
    }

    /// Re-evaluate every formula and refresh its cached result.
    ///
    /// References to other formula cells see their freshly computed values,
    /// whatever their position. A failed evaluation keeps the previous cache.
    pub fn calculate_formulas(&mut self, evaluator: &dyn FormulaEvaluator) -> Recalculation {
        let targets: Vec<CellAddress> = self
            .rows()
            .flat_map(|row| {
                row.cells()
                    .filter(|cell| cell.value().formula_source().is_some())
                    .map(move |cell| CellAddress::new(row.index(), cell.col()))
            })
            .collect();

        let results: Vec<(CellAddress, Option<Value>)> = {
            let resolver = FormulaResolver::new(self, evaluator);
            targets
                .into_iter()
                .map(|addr| {
                    let value = match resolver.evaluate_cell(addr) {
                        Some(Ok(value)) => Some(value),
                        Some(Err(err)) => {
                            tracing::warn!(
                                sheet = %self.name,
                                cell = %addr,
                                error = %err,
                                "Formula evaluation failed; keeping cached value"
                            );
                            None
                        }
                        None => None,
                    };
                    (addr, value)
                })
                .collect()
        };

        let mut report = Recalculation::default();
        for (addr, value) in results {
            let Some(value) = value else {
                report.failed += 1;
                continue;
            };
            if let Some(cell) = self.check_row_mut(addr.row).and_then(|r| r.cell_mut(addr.col)) {
                cell.value_mut().set_cached(CellValue::from_formula_value(value));
            }
            report.evaluated += 1;
        }
        report
    }
}

/// Supplies worksheet values to a formula evaluator, computing referenced
/// formula cells on demand instead of reading their cached results.
///
/// Results are memoized for the lifetime of the resolver. A reference that
/// closes a cycle reads the cached result of the cell it points back to.
pub struct FormulaResolver<'a> {
    sheet: &'a Worksheet,
    evaluator: &'a dyn FormulaEvaluator,
    memo: RefCell<HashMap<CellAddress, Value>>,
    visiting: RefCell<HashSet<CellAddress>>,
}

impl<'a> FormulaResolver<'a> {
    pub fn new(sheet: &'a Worksheet, evaluator: &'a dyn FormulaEvaluator) -> Self {
        Self {
            sheet,
            evaluator,
            memo: RefCell::new(HashMap::new()),
            visiting: RefCell::new(HashSet::new()),
        }
    }

    #[must_use]
    pub fn sheet(&self) -> &'a Worksheet {
        self.sheet
    }

    /// Evaluate the formula at `addr`; `None` when the cell holds no formula.
    pub fn evaluate_cell(&self, addr: CellAddress) -> Option<std::result::Result<Value, FormulaError>> {
        let source = self.sheet.value(addr.row, addr.col).formula_source()?;
        if let Some(value) = self.memo.borrow().get(&addr) {
            return Some(Ok(value.clone()));
        }
        if !self.visiting.borrow_mut().insert(addr) {
            return Some(Err(FormulaError::CircularReference(addr)));
        }

        let result = self.evaluator.evaluate(source, self);
        self.visiting.borrow_mut().remove(&addr);
        if let Ok(value) = &result {
            self.memo.borrow_mut().insert(addr, value.clone());
        }
        Some(result)
    }
}

impl ValueResolver for FormulaResolver<'_> {
    fn get_cell(&self, addr: CellAddress) -> Value {
        match self.evaluate_cell(addr) {
            Some(Ok(value)) => value,
            Some(Err(err)) => {
                tracing::debug!(
                    sheet = %self.sheet.name,
                    cell = %addr,
                    error = %err,
                    "Referenced formula not evaluated; using cached value"
                );
                self.sheet.value(addr.row, addr.col).to_formula_value()
            }
            None => self.sheet.value(addr.row, addr.col).to_formula_value(),
        }
    }
}
