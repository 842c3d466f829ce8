use gridfile_formulas::FormulaEvaluator;

use crate::cell::Cell;
use crate::clone::CellRef;
use crate::error::{Result, SheetError};
use crate::style::{Style, StyleId, StyleTable};
use crate::worksheet::{Recalculation, Worksheet};

const MAX_SHEET_NAME_LEN: usize = 31;
const INVALID_SHEET_NAME_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// A workbook: named worksheets in document order plus a style table.
///
/// `key` identifies the workbook's storage location and appears in errors.
#[derive(Debug, Clone)]
pub struct Workbook {
    key: String,
    sheets: Vec<Worksheet>,
    styles: StyleTable,
}

impl Workbook {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            sheets: Vec::new(),
            styles: StyleTable::new(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Append a new empty worksheet and return it.
    ///
    /// Names follow spreadsheet rules: 1 to 31 characters, none of
    /// `[]:*?/\`, unique ignoring ASCII case.
    pub fn add_worksheet(&mut self, name: &str) -> Result<&mut Worksheet> {
        if name.trim().is_empty()
            || name.chars().count() > MAX_SHEET_NAME_LEN
            || name.contains(INVALID_SHEET_NAME_CHARS)
        {
            return Err(SheetError::InvalidSheetName {
                name: name.to_string(),
            });
        }
        if self.position(name).is_some() {
            return Err(SheetError::SheetAlreadyExists {
                name: name.to_string(),
            });
        }

        self.sheets.push(Worksheet::new(name));
        tracing::debug!(workbook = %self.key, sheet = name, "Added worksheet");
        self.worksheet_mut(name)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.sheets
            .iter()
            .position(|sheet| sheet.name().eq_ignore_ascii_case(name))
    }

    fn missing(&self, name: &str) -> SheetError {
        SheetError::MissingWorksheet {
            sheet: name.to_string(),
            workbook: self.key.clone(),
        }
    }

    /// Worksheet by name; a missing sheet is an error naming the workbook.
    pub fn worksheet(&self, name: &str) -> Result<&Worksheet> {
        self.find_worksheet(name).ok_or_else(|| self.missing(name))
    }

    pub fn worksheet_mut(&mut self, name: &str) -> Result<&mut Worksheet> {
        match self.position(name) {
            Some(idx) => Ok(&mut self.sheets[idx]),
            None => Err(self.missing(name)),
        }
    }

    /// Worksheet by name, or `None`.
    #[must_use]
    pub fn find_worksheet(&self, name: &str) -> Option<&Worksheet> {
        self.position(name).map(|idx| &self.sheets[idx])
    }

    #[must_use]
    pub fn worksheet_at(&self, index: usize) -> Option<&Worksheet> {
        self.sheets.get(index)
    }

    pub fn worksheets(&self) -> impl Iterator<Item = &Worksheet> {
        self.sheets.iter()
    }

    #[must_use]
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name().to_string()).collect()
    }

    #[must_use]
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    #[must_use]
    pub fn styles(&self) -> &StyleTable {
        &self.styles
    }

    /// Add a style to this workbook, reusing an equal one if present.
    pub fn intern_style(&mut self, style: Style) -> StyleId {
        self.styles.intern(style)
    }

    /// Style of the cell at `at`; cells that do not exist have the default
    /// style.
    pub fn style_at(&self, at: CellRef<'_>) -> Result<&Style> {
        let sheet = self.worksheet(at.sheet)?;
        let id = sheet
            .cell(at.row, at.col)
            .map_or(StyleId::default(), Cell::style);
        Ok(self.styles.resolve(id))
    }

    /// Text of `cell` as a spreadsheet application displays it.
    #[must_use]
    pub fn format_cell(&self, cell: &Cell) -> String {
        let style = self.styles.resolve(cell.style());
        cell.value().display(&style.number_format)
    }

    /// Recalculate every formula in every worksheet. Failures keep the
    /// stale cached value and are counted in the report.
    pub fn calculate_formulas(&mut self, evaluator: &dyn FormulaEvaluator) -> Recalculation {
        let mut report = Recalculation::default();
        for sheet in &mut self.sheets {
            report += sheet.calculate_formulas(evaluator);
        }
        if report.failed > 0 {
            tracing::warn!(
                workbook = %self.key,
                evaluated = report.evaluated,
                failed = report.failed,
                "Some formulas could not be recalculated"
            );
        }
        report
    }

    /// Flag every worksheet so derived caches are rebuilt on next open.
    pub fn refresh_derived_caches(&mut self) {
        for sheet in &mut self.sheets {
            sheet.set_refresh_on_load(true);
        }
    }

    /// Copy row `src_row` of `src_sheet` into row `dest_row` of
    /// `dest_sheet`. Returns `false` when the source row does not exist.
    pub fn copy_row_between(
        &mut self,
        src_sheet: &str,
        src_row: u32,
        dest_sheet: &str,
        dest_row: u32,
    ) -> Result<bool> {
        let Some(source) = self.worksheet(src_sheet)?.check_row(src_row).cloned() else {
            return Ok(false);
        };
        let idx = self.position(dest_sheet).ok_or_else(|| self.missing(dest_sheet))?;
        self.sheets[idx].paste_row(&source, dest_row, &self.styles)?;
        Ok(true)
    }

    /// Copy a row within one worksheet.
    pub fn copy_row(&mut self, sheet: &str, src_row: u32, dest_row: u32) -> Result<bool> {
        let idx = self.position(sheet).ok_or_else(|| self.missing(sheet))?;
        self.sheets[idx].copy_row(src_row, dest_row, &self.styles)
    }
}
