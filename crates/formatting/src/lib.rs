//! Display formatting for spreadsheet values.
//!
//! Renders numbers and dates the way a spreadsheet application shows them
//! (the "General" format, number-format codes such as `#,##0.00`, and date
//! codes such as `m/d/yy`), converts between 1900-system serial numbers and
//! `chrono` timestamps, and parses numbers back out of displayed text.
//!
//! ```
//! use gridfile_formatting::{format_number, parse_currency};
//!
//! assert_eq!(format_number(1234.5, "#,##0.00"), "1,234.50");
//! assert_eq!(format_number(10.0, "General"), "10");
//! assert_eq!(parse_currency("$1,234.50"), Some(1234.5));
//! ```

mod date;
mod number;
mod parse;

pub use date::{
    datetime_to_serial, format_datetime, is_date_format, serial_to_datetime, DEFAULT_DATETIME_FORMAT,
    DEFAULT_DATE_FORMAT,
};
pub use number::{format_general, format_number, GENERAL_FORMAT};
pub use parse::{parse_currency, parse_decimal};
