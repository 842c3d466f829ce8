use chrono::{NaiveDate, NaiveDateTime, Timelike};
use gridfile_formatting::{
    datetime_to_serial, format_datetime, format_number, is_date_format, parse_currency,
    parse_decimal, DEFAULT_DATETIME_FORMAT, DEFAULT_DATE_FORMAT,
};
use gridfile_formulas::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::style::StyleId;

/// Represents a formula stored in a cell.
///
/// `source` never carries the leading `=`. `cached` is the last known result
/// and may be stale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaCell {
    pub source: String,
    pub cached: Option<Box<CellValue>>,
}

/// Represents a cell value in a worksheet
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Boolean(bool),
    Date(NaiveDateTime),
    Formula(FormulaCell),
}

impl CellValue {
    /// Create a formula cell value without a cached result.
    #[must_use]
    pub fn formula<S: AsRef<str>>(source: S) -> Self {
        let source = source.as_ref().trim();
        CellValue::Formula(FormulaCell {
            source: source.strip_prefix('=').unwrap_or(source).to_string(),
            cached: None,
        })
    }

    /// Create a formula cell value with a known result.
    #[must_use]
    pub fn formula_with_cached<S: AsRef<str>>(source: S, cached: CellValue) -> Self {
        let mut value = Self::formula(source);
        value.set_cached(cached);
        value
    }

    /// Return the cached value for formulas, or self for non-formulas.
    #[must_use]
    pub fn cached_or_self(&self) -> &CellValue {
        match self {
            CellValue::Formula(formula) => formula.cached.as_deref().unwrap_or(self),
            _ => self,
        }
    }

    /// Set the cached value for a formula; no-op for other kinds.
    pub fn set_cached(&mut self, value: CellValue) {
        if let CellValue::Formula(formula) = self {
            // A formula result is never itself a formula.
            let value = match value {
                CellValue::Formula(inner) => inner.cached.map_or(CellValue::Empty, |v| *v),
                other => other,
            };
            formula.cached = Some(Box::new(value));
        }
    }

    /// Formula text, if this is a formula cell.
    #[must_use]
    pub fn formula_source(&self) -> Option<&str> {
        match self {
            CellValue::Formula(formula) => Some(&formula.source),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Numeric view of the cell.
    ///
    /// Text is parsed as a plain decimal first and as US currency second;
    /// anything else that is not numeric yields `None`.
    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        match self.cached_or_self() {
            CellValue::Number(n) => Some(*n),
            CellValue::Date(dt) => Some(datetime_to_serial(*dt)),
            CellValue::Text(s) => parse_decimal(s).or_else(|| parse_currency(s)),
            _ => None,
        }
    }

    /// Render the value the way a spreadsheet application displays it
    /// under `number_format`.
    #[must_use]
    pub fn display(&self, number_format: &str) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n, number_format),
            CellValue::Boolean(true) => "TRUE".to_string(),
            CellValue::Boolean(false) => "FALSE".to_string(),
            CellValue::Date(dt) => {
                if is_date_format(number_format) {
                    format_datetime(*dt, number_format)
                } else {
                    format_datetime(*dt, default_date_format(*dt))
                }
            }
            CellValue::Formula(formula) => match &formula.cached {
                Some(cached) => cached.display(number_format),
                None => formula.source.clone(),
            },
        }
    }

    /// View as an evaluator input. Dates become serial numbers; formulas
    /// contribute their cached result.
    #[must_use]
    pub fn to_formula_value(&self) -> Value {
        match self {
            CellValue::Empty => Value::Empty,
            CellValue::Text(s) => Value::Text(s.clone()),
            CellValue::Number(n) => Value::Number(*n),
            CellValue::Boolean(b) => Value::Bool(*b),
            CellValue::Date(dt) => Value::Number(datetime_to_serial(*dt)),
            CellValue::Formula(formula) => formula
                .cached
                .as_deref()
                .map_or(Value::Empty, CellValue::to_formula_value),
        }
    }

    /// Convert an evaluator result into a cell value. Error results keep
    /// their display label as text.
    #[must_use]
    pub fn from_formula_value(value: Value) -> Self {
        match value {
            Value::Empty => CellValue::Empty,
            Value::Number(n) => CellValue::Number(n),
            Value::Text(s) => CellValue::Text(s),
            Value::Bool(b) => CellValue::Boolean(b),
            Value::Error(err) => CellValue::Text(err.label().to_string()),
        }
    }
}

/// Display format for a date value stored under a non-date format.
pub(crate) fn default_date_format(dt: NaiveDateTime) -> &'static str {
    if dt.num_seconds_from_midnight() == 0 && dt.nanosecond() == 0 {
        DEFAULT_DATE_FORMAT
    } else {
        DEFAULT_DATETIME_FORMAT
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display(gridfile_formatting::GENERAL_FORMAT))
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(f64::from(n))
    }
}

impl From<u32> for CellValue {
    fn from(n: u32) -> Self {
        CellValue::Number(f64::from(n))
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(dt: NaiveDateTime) -> Self {
        CellValue::Date(dt)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(date: NaiveDate) -> Self {
        CellValue::Date(date.and_time(chrono::NaiveTime::MIN))
    }
}

/// `None` writes an empty cell.
impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Empty, Into::into)
    }
}

/// A single cell. Owned by a row; its column never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    col: u32,
    value: CellValue,
    style: StyleId,
}

impl Cell {
    pub(crate) fn new(col: u32) -> Self {
        Self {
            col,
            value: CellValue::Empty,
            style: StyleId::default(),
        }
    }

    /// Zero-based column index.
    #[must_use]
    pub fn col(&self) -> u32 {
        self.col
    }

    #[must_use]
    pub fn value(&self) -> &CellValue {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut CellValue {
        &mut self.value
    }

    pub fn set_value(&mut self, value: impl Into<CellValue>) {
        self.value = value.into();
    }

    #[must_use]
    pub fn style(&self) -> StyleId {
        self.style
    }

    /// Attach a style from the owning workbook's style table.
    pub fn set_style(&mut self, style: StyleId) {
        self.style = style;
    }

    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        self.value.as_double()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_as_double_coercion() {
        assert_eq!(CellValue::from(12.5).as_double(), Some(12.5));
        assert_eq!(CellValue::from(" 7 ").as_double(), Some(7.0));
        assert_eq!(CellValue::from("$1,250.00").as_double(), Some(1250.0));
        assert_eq!(CellValue::from("twelve").as_double(), None);
        assert_eq!(CellValue::Empty.as_double(), None);
        assert_eq!(CellValue::from(true).as_double(), None);
    }

    #[test]
    fn test_formula_uses_cached_value() {
        let value = CellValue::formula_with_cached("=A1+A2", CellValue::from(3.0));
        assert_eq!(value.formula_source(), Some("A1+A2"));
        assert_eq!(value.as_double(), Some(3.0));
        assert_eq!(value.display("0.00"), "3.00");

        let uncached = CellValue::formula("SUM(B1:B3)");
        assert_eq!(uncached.display("General"), "SUM(B1:B3)");
        assert_eq!(uncached.to_formula_value(), Value::Empty);
    }

    #[test]
    fn test_none_writes_empty() {
        let mut cell = Cell::new(3);
        cell.set_value("x");
        cell.set_value(None::<String>);
        assert!(cell.value().is_empty());
        assert_eq!(cell.col(), 3);
    }

    #[test]
    fn test_display_matches_spreadsheet() {
        assert_eq!(CellValue::from(1234.5).display("#,##0.00"), "1,234.50");
        assert_eq!(CellValue::from(10.0).display("General"), "10");
        assert_eq!(CellValue::from(false).display("General"), "FALSE");
        assert_eq!(CellValue::from(date(2024, 2, 9)).display("General"), "2/9/24");
        assert_eq!(
            CellValue::from(date(2024, 2, 9)).display("yyyy-mm-dd"),
            "2024-02-09"
        );
    }
}
