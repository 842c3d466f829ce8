//! # gridfile-extract
//!
//! Turns spreadsheet and CSV documents held in an object store into
//! header-keyed records, and publishes CSV and xlsx documents back.
//!
//! The header row supplies record keys. Blank rows are skipped, values are
//! rendered the way a spreadsheet displays them and trimmed, and formula
//! cells are evaluated with a fallback to their cached results.
//!
//! ```
//! use gridfile_extract::{CsvReader, CsvWriter};
//! use gridfile_storage::{EncryptionSettings, InMemoryStore, ObjectLocation};
//!
//! let store = InMemoryStore::new().with_bucket("data", None, Some(EncryptionSettings::new("AES256")));
//! let location = ObjectLocation::new("data", "people.csv");
//!
//! CsvWriter::new(&store)
//!     .write_records(&location, [["Name", "ID"], ["Ann", "1"], ["", ""], ["Bob", "2"]])
//!     .unwrap();
//!
//! let records = CsvReader::new(&store).records(&location).unwrap();
//! assert_eq!(records.len(), 2);
//! assert_eq!(records[1]["Name"], "Bob");
//! ```

pub mod config;
pub mod delimited;
pub mod error;
pub mod excel;
pub mod record;
pub mod table;
pub mod writer;

pub use config::{CsvConfig, CsvOptions, ExtractConfig, ExtractOptions, HeaderPolicy};
pub use delimited::{encode_rows, BufferedCsvWriter, CsvReader, CsvRecords, CsvWriter};
pub use error::{ConfigFault, ExtractError, FormatFault, Result};
pub use excel::ExcelReader;
pub use record::{is_blank_row, normalize, Columns, HeaderKeys, Record};
pub use table::{cell_text, row_values, sheet_columns, sheet_records, sheet_rows};
pub use writer::WorkbookWriter;
