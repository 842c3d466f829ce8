//! Extraction over an in-memory worksheet.
//!
//! Row 0 is the header. Cells are rendered as a spreadsheet application
//! displays them and then trimmed. Formula cells go through the evaluator
//! when one is given and fall back to their cached display when it fails.

use gridfile_formulas::{CellAddress, FormulaEvaluator};
use gridfile_sheet::{Cell, CellValue, FormulaResolver, Workbook, Worksheet};

use crate::config::HeaderPolicy;
use crate::error::FormatFault;
use crate::record::{is_blank_row, normalize, Columns, HeaderKeys, Record};

/// Display text of `cell`, which sits in row `row` of the resolver's sheet.
///
/// Without a resolver the cached display is used.
pub fn cell_text(
    book: &Workbook,
    row: u32,
    cell: &Cell,
    resolver: Option<&FormulaResolver<'_>>,
) -> String {
    let Some(resolver) = resolver else {
        return book.format_cell(cell);
    };
    let addr = CellAddress::new(row, cell.col());
    match resolver.evaluate_cell(addr) {
        None => book.format_cell(cell),
        Some(Ok(result)) => {
            let style = book.styles().resolve(cell.style());
            CellValue::from_formula_value(result).display(&style.number_format)
        }
        Some(Err(err)) => {
            tracing::warn!(
                sheet = %resolver.sheet().name(),
                cell = %addr,
                formula = ?cell.value().formula_source(),
                error = %err,
                "Formula evaluation failed; using cached value"
            );
            book.format_cell(cell)
        }
    }
}

fn values_in_row(
    book: &Workbook,
    sheet: &Worksheet,
    index: u32,
    resolver: Option<&FormulaResolver<'_>>,
) -> Vec<String> {
    let Some(row) = sheet.check_row(index) else {
        return Vec::new();
    };
    (0..row.width())
        .map(|col| {
            row.cell(col)
                .map(|cell| normalize(&cell_text(book, index, cell, resolver)))
                .unwrap_or_default()
        })
        .collect()
}

/// Normalized values of row `index`, one per column up to its last cell.
/// Rows that were never written yield an empty vector.
pub fn row_values(
    book: &Workbook,
    sheet: &Worksheet,
    index: u32,
    evaluator: Option<&dyn FormulaEvaluator>,
) -> Vec<String> {
    let resolver = evaluator.map(|e| FormulaResolver::new(sheet, e));
    values_in_row(book, sheet, index, resolver.as_ref())
}

/// Non-empty data rows with their row index.
fn data_rows<'a>(
    book: &'a Workbook,
    sheet: &'a Worksheet,
    resolver: Option<&'a FormulaResolver<'a>>,
) -> impl Iterator<Item = (usize, Vec<String>)> + 'a {
    (1..sheet.row_span())
        .map(move |index| (index as usize, values_in_row(book, sheet, index, resolver)))
        .filter(|(_, values)| !is_blank_row(values))
}

/// One record per non-empty data row.
pub fn sheet_records(
    book: &Workbook,
    sheet: &Worksheet,
    policy: HeaderPolicy,
    evaluator: Option<&dyn FormulaEvaluator>,
) -> Result<Vec<Record>, FormatFault> {
    let resolver = evaluator.map(|e| FormulaResolver::new(sheet, e));
    let keys = HeaderKeys::new(&values_in_row(book, sheet, 0, resolver.as_ref()), policy)?;
    data_rows(book, sheet, resolver.as_ref())
        .map(|(row, values)| keys.record(values, row))
        .collect()
}

/// One value list per header, filled from non-empty data rows in order.
pub fn sheet_columns(
    book: &Workbook,
    sheet: &Worksheet,
    policy: HeaderPolicy,
    evaluator: Option<&dyn FormulaEvaluator>,
) -> Result<Columns, FormatFault> {
    let resolver = evaluator.map(|e| FormulaResolver::new(sheet, e));
    let keys = HeaderKeys::new(&values_in_row(book, sheet, 0, resolver.as_ref()), policy)?;
    let mut columns: Columns = keys
        .keys()
        .iter()
        .map(|key| (key.clone(), Vec::new()))
        .collect();
    for (row, values) in data_rows(book, sheet, resolver.as_ref()) {
        keys.append_to(&mut columns, values, row)?;
    }
    Ok(columns)
}

/// Every row, header included, as positional values.
pub fn sheet_rows(
    book: &Workbook,
    sheet: &Worksheet,
    evaluator: Option<&dyn FormulaEvaluator>,
) -> Vec<Vec<String>> {
    let resolver = evaluator.map(|e| FormulaResolver::new(sheet, e));
    (0..sheet.row_span())
        .map(|index| values_in_row(book, sheet, index, resolver.as_ref()))
        .collect()
}
