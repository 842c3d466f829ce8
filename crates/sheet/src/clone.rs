//! Copying formatting and content between cells, possibly across workbooks.

use gridfile_formatting::serial_to_datetime;
use gridfile_formulas::CellAddress;

use crate::cell::CellValue;
use crate::error::Result;
use crate::style::{Style, StyleId};
use crate::workbook::Workbook;

/// Address of a cell within a workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef<'a> {
    pub sheet: &'a str,
    pub row: u32,
    pub col: u32,
}

impl<'a> CellRef<'a> {
    #[must_use]
    pub fn new(sheet: &'a str, row: u32, col: u32) -> Self {
        Self { sheet, row, col }
    }

    /// Build from an A1 reference such as `"C7"`.
    #[must_use]
    pub fn a1(sheet: &'a str, reference: &str) -> Option<Self> {
        let addr = CellAddress::parse_a1(reference)?;
        Some(Self::new(sheet, addr.row, addr.col))
    }
}

/// Content a destination cell receives when `value` is copied from a cell
/// styled with `style`. `None` means the copy is a no-op.
///
/// Numbers under a date format arrive as dates; formulas arrive as text
/// without a cached result. Booleans and empty cells are not copied.
#[must_use]
pub fn content_for_copy(value: &CellValue, style: &Style) -> Option<CellValue> {
    match value {
        CellValue::Text(s) => Some(CellValue::Text(s.clone())),
        CellValue::Number(n) if style.is_date() => Some(
            serial_to_datetime(*n).map_or(CellValue::Number(*n), CellValue::Date),
        ),
        CellValue::Number(n) => Some(CellValue::Number(*n)),
        CellValue::Date(dt) => Some(CellValue::Date(*dt)),
        CellValue::Formula(formula) => Some(CellValue::formula(&formula.source)),
        CellValue::Empty | CellValue::Boolean(_) => None,
    }
}

/// Give `to` the same style as `from`.
///
/// The style is interned into the destination workbook, so an equal style
/// already present there is reused. A missing source cell copies the
/// default style.
pub fn copy_style(
    source: &Workbook,
    from: CellRef<'_>,
    dest: &mut Workbook,
    to: CellRef<'_>,
) -> Result<StyleId> {
    let style = source.style_at(from)?.clone();
    let id = dest.intern_style(style);
    dest.worksheet_mut(to.sheet)?
        .create_cell(to.row, to.col)?
        .set_style(id);
    Ok(id)
}

/// Copy the content of `from` into `to`; see [`content_for_copy`].
///
/// Returns whether the destination was written.
pub fn copy_cell_content(
    source: &Workbook,
    from: CellRef<'_>,
    dest: &mut Workbook,
    to: CellRef<'_>,
) -> Result<bool> {
    let content = {
        let sheet = source.worksheet(from.sheet)?;
        match sheet.cell(from.row, from.col) {
            Some(cell) => content_for_copy(cell.value(), source.styles().resolve(cell.style())),
            None => None,
        }
    };

    let Some(content) = content else {
        tracing::debug!(
            sheet = from.sheet,
            cell = %CellAddress::new(from.row, from.col),
            "Nothing to copy from source cell"
        );
        return Ok(false);
    };

    dest.worksheet_mut(to.sheet)?.set_value(to.row, to.col, content)?;
    Ok(true)
}

/// Copy style and content.
pub fn copy_cell(
    source: &Workbook,
    from: CellRef<'_>,
    dest: &mut Workbook,
    to: CellRef<'_>,
) -> Result<()> {
    copy_style(source, from, dest, to)?;
    copy_cell_content(source, from, dest, to)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{BorderSide, BorderStyle, Borders, Color, FillPattern, Font, FontOffset, Underline};
    use chrono::NaiveDate;

    fn fancy() -> Style {
        Style::default()
            .with_number_format("#,##0.00")
            .with_fill(FillPattern::Solid, Color(0xFF_EE00))
            .with_borders(Borders {
                left: BorderSide::new(BorderStyle::Thin, Color::BLACK),
                right: BorderSide::new(BorderStyle::Medium, Color(0x11_2233)),
                top: BorderSide::new(BorderStyle::Dashed, Color::BLACK),
                bottom: BorderSide::new(BorderStyle::Double, Color(0x00_00FF)),
            })
            .with_font(Font {
                name: "Arial".to_string(),
                height: 280,
                bold: true,
                italic: true,
                strikeout: true,
                underline: Underline::Double,
                color: Some(Color(0x80_0000)),
                offset: FontOffset::Superscript,
            })
    }

    #[test]
    fn test_copy_style_across_workbooks() {
        let mut source = Workbook::new("bucket/source.xlsx");
        let id = source.intern_style(fancy());
        source.add_worksheet("In").unwrap().set_value(0, 0, 5.0).unwrap().set_style(id);

        let mut dest = Workbook::new("bucket/dest.xlsx");
        dest.add_worksheet("Out").unwrap();
        copy_style(&source, CellRef::new("In", 0, 0), &mut dest, CellRef::new("Out", 2, 3)).unwrap();

        let copied = dest.style_at(CellRef::new("Out", 2, 3)).unwrap();
        assert_eq!(copied, &fancy());
    }

    #[test]
    fn test_copy_style_reuses_equal_destination_style() {
        let mut source = Workbook::new("a");
        let id = source.intern_style(fancy());
        source.add_worksheet("S").unwrap().set_value(0, 0, "x").unwrap().set_style(id);

        let mut dest = Workbook::new("b");
        let existing = dest.intern_style(fancy());
        dest.add_worksheet("S").unwrap();
        let before = dest.styles().len();

        let copied = copy_style(&source, CellRef::new("S", 0, 0), &mut dest, CellRef::new("S", 0, 0)).unwrap();

        assert_eq!(copied, existing);
        assert_eq!(dest.styles().len(), before);
    }

    #[test]
    fn test_date_formatted_number_copies_as_date() {
        let mut source = Workbook::new("a");
        let date_style = source.intern_style(Style::default().with_number_format("yyyy-mm-dd"));
        source
            .add_worksheet("S")
            .unwrap()
            .set_value(0, 0, 44562.0)
            .unwrap()
            .set_style(date_style);

        let mut dest = Workbook::new("b");
        dest.add_worksheet("D").unwrap();
        assert!(copy_cell_content(&source, CellRef::new("S", 0, 0), &mut dest, CellRef::new("D", 0, 0)).unwrap());

        let expected = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        assert_eq!(
            dest.worksheet("D").unwrap().value(0, 0),
            &CellValue::from(expected)
        );
    }

    #[test]
    fn test_formula_copies_text_without_cache() {
        let mut source = Workbook::new("a");
        source
            .add_worksheet("S")
            .unwrap()
            .set_value(0, 0, CellValue::formula_with_cached("B1+1", CellValue::from(2.0)))
            .unwrap();

        let mut dest = Workbook::new("b");
        dest.add_worksheet("D").unwrap();
        copy_cell_content(&source, CellRef::new("S", 0, 0), &mut dest, CellRef::new("D", 1, 1)).unwrap();

        assert_eq!(dest.worksheet("D").unwrap().value(1, 1), &CellValue::formula("B1+1"));
    }

    #[test]
    fn test_boolean_copy_is_noop() {
        let mut source = Workbook::new("a");
        source.add_worksheet("S").unwrap().set_value(0, 0, true).unwrap();
        let mut dest = Workbook::new("b");
        dest.add_worksheet("D").unwrap().set_value(0, 0, "untouched").unwrap();

        let written =
            copy_cell_content(&source, CellRef::new("S", 0, 0), &mut dest, CellRef::new("D", 0, 0)).unwrap();

        assert!(!written);
        assert_eq!(dest.worksheet("D").unwrap().value(0, 0), &CellValue::from("untouched"));
    }

    #[test]
    fn test_missing_destination_sheet_is_an_error() {
        let mut source = Workbook::new("a");
        source.add_worksheet("S").unwrap().set_value(0, 0, "x").unwrap();
        let mut dest = Workbook::new("b");
        assert!(copy_cell(&source, CellRef::new("S", 0, 0), &mut dest, CellRef::new("Nope", 0, 0)).is_err());
        assert_eq!(CellRef::a1("S", "C7"), Some(CellRef::new("S", 6, 2)));
    }
}
