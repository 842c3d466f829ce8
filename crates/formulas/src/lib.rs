//! # gridfile-formulas
//!
//! Formula support for gridfile worksheets.
//!
//! Formula evaluation is a capability: callers hand a [`FormulaEvaluator`]
//! to the sheet model or the extraction engine, and every consumer must cope
//! with an evaluator that fails. [`BasicEvaluator`] is the built-in
//! implementation; it covers arithmetic, comparison, concatenation, cell and
//! range references and a small function library, and reports anything else
//! as an error so the caller can fall back to a cached value.
//!
//! The crate also owns A1 reference helpers and the row-reference rewrite used
//! to propagate a shared formula down a column.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod functions;
pub mod parser;
pub mod refs;

pub use parser::{parse_formula, BinaryOperator, Expr, UnaryOperator};
pub use refs::{column_index, column_letters, rewrite_row_references, CellAddress};

/// A scalar produced or consumed by formula evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum Value {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    Error(ErrorValue),
}

impl Value {
    /// Render the value the way a spreadsheet shows a formula result.
    #[must_use]
    pub fn to_display(&self) -> String {
        match self {
            Value::Empty => String::new(),
            Value::Number(n) => gridfile_formatting::format_general(*n),
            Value::Text(s) => s.clone(),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::Error(err) => err.label().to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display())
    }
}

/// Spreadsheet error values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorValue {
    Div0,
    Value,
    Ref,
    Name,
    Num,
    NA,
    Null,
}

impl ErrorValue {
    /// The literal shown in a cell, e.g. `#DIV/0!`.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ErrorValue::Div0 => "#DIV/0!",
            ErrorValue::Value => "#VALUE!",
            ErrorValue::Ref => "#REF!",
            ErrorValue::Name => "#NAME?",
            ErrorValue::Num => "#NUM!",
            ErrorValue::NA => "#N/A",
            ErrorValue::Null => "#NULL!",
        }
    }

    /// Parse an error literal (case-insensitive).
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let upper = label.to_ascii_uppercase();
        [
            ErrorValue::Div0,
            ErrorValue::Value,
            ErrorValue::Ref,
            ErrorValue::Name,
            ErrorValue::Num,
            ErrorValue::NA,
            ErrorValue::Null,
        ]
        .into_iter()
        .find(|err| err.label() == upper)
    }
}

/// Failures that prevent a formula from producing any value.
///
/// Spreadsheet-level errors such as division by zero are not failures; they
/// evaluate to [`Value::Error`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Unknown function: {0}")]
    UnknownFunction(String),
    #[error("Invalid argument count for {name}: expected {expected}, got {actual}")]
    InvalidArgCount {
        name: String,
        expected: String,
        actual: usize,
    },
    #[error("Unsupported formula construct: {0}")]
    Unsupported(String),
    #[error("Circular reference through {0}")]
    CircularReference(CellAddress),
}

/// Supplies cell contents to an evaluator.
pub trait ValueResolver {
    /// Value of a single cell; missing cells are [`Value::Empty`].
    fn get_cell(&self, addr: CellAddress) -> Value;

    /// Values of a rectangular range in row-major order.
    fn get_range(&self, start: CellAddress, end: CellAddress) -> Vec<Value> {
        let (top, bottom) = (start.row.min(end.row), start.row.max(end.row));
        let (left, right) = (start.col.min(end.col), start.col.max(end.col));
        let mut values = Vec::new();
        for row in top..=bottom {
            for col in left..=right {
                values.push(self.get_cell(CellAddress::new(row, col)));
            }
        }
        values
    }
}

/// The formula evaluation capability.
pub trait FormulaEvaluator {
    /// Evaluate formula text (with or without a leading `=`).
    fn evaluate(&self, formula: &str, resolver: &dyn ValueResolver) -> Result<Value, FormulaError>;
}

/// Built-in evaluator backed by [`parse_formula`] and [`functions`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicEvaluator;

impl BasicEvaluator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FormulaEvaluator for BasicEvaluator {
    fn evaluate(&self, formula: &str, resolver: &dyn ValueResolver) -> Result<Value, FormulaError> {
        let expr = parse_formula(formula)?;
        functions::evaluate(&expr, resolver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Grid(HashMap<CellAddress, Value>);

    impl ValueResolver for Grid {
        fn get_cell(&self, addr: CellAddress) -> Value {
            self.0.get(&addr).cloned().unwrap_or_default()
        }
    }

    fn grid() -> Grid {
        let mut cells = HashMap::new();
        cells.insert(CellAddress::new(0, 0), Value::Number(10.0));
        cells.insert(CellAddress::new(1, 0), Value::Number(20.0));
        cells.insert(CellAddress::new(2, 0), Value::Text("x".to_string()));
        cells.insert(CellAddress::new(0, 1), Value::Text("Total".to_string()));
        Grid(cells)
    }

    #[test]
    fn test_arithmetic_with_references() {
        let value = BasicEvaluator::new().evaluate("=A1*2+A2", &grid()).unwrap();
        assert_eq!(value, Value::Number(40.0));
    }

    #[test]
    fn test_range_function_skips_text() {
        let value = BasicEvaluator::new().evaluate("SUM(A1:A3)", &grid()).unwrap();
        assert_eq!(value, Value::Number(30.0));
    }

    #[test]
    fn test_division_by_zero_is_a_value() {
        let value = BasicEvaluator::new().evaluate("=A1/0", &grid()).unwrap();
        assert_eq!(value, Value::Error(ErrorValue::Div0));
        assert_eq!(value.to_display(), "#DIV/0!");
    }

    #[test]
    fn test_unknown_function_fails() {
        let err = BasicEvaluator::new()
            .evaluate("=VLOOKUP(A1,A1:B3,2,FALSE)", &grid())
            .unwrap_err();
        assert_eq!(err, FormulaError::UnknownFunction("VLOOKUP".to_string()));
    }

    #[test]
    fn test_malformed_formula_fails() {
        assert!(matches!(
            BasicEvaluator::new().evaluate("=SUM(A1", &grid()),
            Err(FormulaError::ParseError(_))
        ));
    }

    #[test]
    fn test_error_labels_round_trip() {
        assert_eq!(ErrorValue::from_label("#n/a"), Some(ErrorValue::NA));
        assert_eq!(ErrorValue::from_label("#BOGUS!"), None);
    }
}
