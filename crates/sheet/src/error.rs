use thiserror::Error;

/// Errors that can occur during workbook operations
#[derive(Error, Debug)]
pub enum SheetError {
    #[error("worksheet {sheet} is missing in workbook {workbook}")]
    MissingWorksheet { sheet: String, workbook: String },

    #[error("Sheet already exists: {name}")]
    SheetAlreadyExists { name: String },

    #[error("Invalid sheet name: {name:?}")]
    InvalidSheetName { name: String },

    #[error("Unknown style id {0}")]
    UnknownStyle(u32),

    #[error("Row index out of range: {0}")]
    RowOutOfRange(u32),

    #[error("Column index out of range: {0}")]
    ColumnOutOfRange(u32),

    #[error("Failed to read xlsx document: {0}")]
    XlsxRead(#[from] calamine::XlsxError),

    #[error("Failed to write xlsx document: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SheetError>;
