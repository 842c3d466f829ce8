//! Workbook model for gridfile
//!
//! A [`Workbook`] owns named [`Worksheet`]s in document order; a worksheet
//! owns its [`Row`]s, materialized on first access; a row owns sparse
//! [`Cell`]s. Styles are pooled per workbook in a [`StyleTable`] and cells
//! refer to them by [`StyleId`].
//!
//! # Examples
//!
//! ## Building a sheet with a shared formula
//!
//! ```
//! use gridfile_sheet::{CellValue, Workbook};
//!
//! let mut book = Workbook::new("reports/q1.xlsx");
//! let sheet = book.add_worksheet("Totals").unwrap();
//! for row in 0..3 {
//!     sheet.set_value(row, 0, f64::from(row + 1)).unwrap();
//! }
//! sheet.set_value(0, 1, CellValue::formula("=A1*10")).unwrap();
//! sheet.apply_shared_formula(0, 3, 1, 1).unwrap();
//!
//! assert_eq!(sheet.value(2, 1).formula_source(), Some("A3*10"));
//! ```
//!
//! ## Copying a styled cell into another workbook
//!
//! ```
//! use gridfile_sheet::{copy_cell, CellRef, Style, Workbook};
//!
//! let mut source = Workbook::new("in.xlsx");
//! let money = source.intern_style(Style::default().with_number_format("$#,##0.00"));
//! source.add_worksheet("In").unwrap().set_value(0, 0, 1234.5).unwrap().set_style(money);
//!
//! let mut dest = Workbook::new("out.xlsx");
//! dest.add_worksheet("Out").unwrap();
//! copy_cell(&source, CellRef::new("In", 0, 0), &mut dest, CellRef::new("Out", 0, 0)).unwrap();
//!
//! let cell = dest.worksheet("Out").unwrap().cell(0, 0).unwrap();
//! assert_eq!(dest.format_cell(cell), "$1,234.50");
//! ```

pub mod cell;
pub mod clone;
pub mod error;
pub mod row;
pub mod style;
pub mod workbook;
pub mod worksheet;
pub mod xlsx;

pub use cell::{Cell, CellValue, FormulaCell};
pub use clone::{content_for_copy, copy_cell, copy_cell_content, copy_style, CellRef};
pub use error::{Result, SheetError};
pub use row::Row;
pub use style::{
    BorderSide, BorderStyle, Borders, Color, Fill, FillPattern, Font, FontOffset, Style, StyleId,
    StyleTable, Underline,
};
pub use workbook::Workbook;
pub use worksheet::{FormulaResolver, Recalculation, Worksheet, MAX_COLS, MAX_ROWS};
