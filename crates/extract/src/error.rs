use std::path::PathBuf;

use gridfile_sheet::SheetError;
use gridfile_storage::{ObjectLocation, StorageError};
use thiserror::Error;

/// Errors surfaced by extraction and publishing.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The backing document could not be reached or read.
    #[error("storage error at {location}: {source}")]
    Storage {
        location: ObjectLocation,
        #[source]
        source: StorageError,
    },

    /// The document was read but its content is unusable.
    #[error("malformed document at {location}: {source}")]
    Format {
        location: ObjectLocation,
        #[source]
        source: FormatFault,
    },

    #[error("{kind} {name} not found in {location}")]
    MissingResource {
        kind: &'static str,
        name: String,
        location: ObjectLocation,
    },

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigFault),
}

impl ExtractError {
    /// Wrap a storage failure, routing configuration faults (missing bucket
    /// encryption or secrets) to [`ExtractError::Configuration`].
    pub(crate) fn storage(location: &ObjectLocation, source: StorageError) -> Self {
        if source.is_configuration() {
            ExtractError::Configuration(ConfigFault::Storage(source))
        } else {
            ExtractError::Storage {
                location: location.clone(),
                source,
            }
        }
    }

    pub(crate) fn format(location: &ObjectLocation, source: impl Into<FormatFault>) -> Self {
        ExtractError::Format {
            location: location.clone(),
            source: source.into(),
        }
    }

    /// CSV I/O errors come from the byte stream and count as storage
    /// faults; everything else is a format fault.
    pub(crate) fn csv(location: &ObjectLocation, err: csv::Error) -> Self {
        if err.is_io_error() {
            Self::storage(
                location,
                StorageError::Io {
                    location: location.clone(),
                    source: std::io::Error::other(err),
                },
            )
        } else {
            Self::format(location, FormatFault::Csv(err))
        }
    }
}

/// Structural problems with document content.
#[derive(Error, Debug)]
pub enum FormatFault {
    #[error("workbook error: {0}")]
    Workbook(#[from] SheetError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("document has no worksheets")]
    NoWorksheets,

    #[error("duplicate header {name:?} in columns {first} and {second}")]
    DuplicateHeader {
        name: String,
        first: usize,
        second: usize,
    },

    #[error("row {row} has a value in column {column}, which has no header")]
    UnmappedColumn { row: usize, column: usize },
}

/// Missing or invalid configuration.
#[derive(Error, Debug)]
pub enum ConfigFault {
    #[error(transparent)]
    Storage(StorageError),

    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unsupported config file type: {0}")]
    UnknownFormat(PathBuf),

    #[error("CSV {field} must be a single ASCII character, got {value:?}")]
    InvalidCsvChar { field: &'static str, value: char },
}

pub type Result<T> = std::result::Result<T, ExtractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_configuration_faults_are_rerouted() {
        let location = ObjectLocation::new("out", "a.csv");
        let err = ExtractError::storage(
            &location,
            StorageError::EncryptionNotConfigured {
                bucket: "out".to_string(),
            },
        );
        assert!(matches!(err, ExtractError::Configuration(ConfigFault::Storage(_))));

        let err = ExtractError::storage(
            &location,
            StorageError::NotFound {
                location: location.clone(),
            },
        );
        assert!(matches!(err, ExtractError::Storage { .. }));
        assert!(err.to_string().contains("out/a.csv"));
    }

    #[test]
    fn test_format_fault_keeps_cause_chain() {
        let location = ObjectLocation::new("in", "book.xlsx");
        let err = ExtractError::format(
            &location,
            FormatFault::DuplicateHeader {
                name: "ID".to_string(),
                first: 0,
                second: 2,
            },
        );
        assert!(err.to_string().starts_with("malformed document at in/book.xlsx"));
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(
            source.as_deref(),
            Some("duplicate header \"ID\" in columns 0 and 2")
        );
    }
}
