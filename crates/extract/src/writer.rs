use gridfile_sheet::Workbook;
use gridfile_storage::{upload, ObjectLocation, ObjectStore};

use crate::error::{ExtractError, Result};

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Publishes workbooks to an object store as xlsx documents.
#[derive(Debug)]
pub struct WorkbookWriter<S> {
    store: S,
    expected_owner: Option<String>,
}

impl<S: ObjectStore> WorkbookWriter<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            expected_owner: None,
        }
    }

    #[must_use]
    pub fn with_expected_owner(mut self, owner: impl Into<String>) -> Self {
        self.expected_owner = Some(owner.into());
        self
    }

    /// Serialize `book` and upload it with the bucket's default encryption.
    pub fn write(&self, location: &ObjectLocation, book: &Workbook) -> Result<()> {
        let bytes = book
            .to_xlsx_bytes()
            .map_err(|e| ExtractError::format(location, e))?;
        tracing::info!(%location, workbook = %book.key(), size = bytes.len(), "Writing workbook");
        upload(
            &self.store,
            location,
            bytes,
            Some(XLSX_CONTENT_TYPE),
            self.expected_owner.as_deref(),
        )
        .map_err(|e| ExtractError::storage(location, e))
    }

    /// Load the workbook at `from` and write it to `to`.
    pub fn copy_document(&self, from: &ObjectLocation, to: &ObjectLocation) -> Result<()> {
        let bytes = self
            .store
            .get_bytes(from, self.expected_owner.as_deref())
            .map_err(|e| ExtractError::storage(from, e))?;
        let book = Workbook::from_xlsx_bytes(from.to_string(), &bytes)
            .map_err(|e| ExtractError::format(from, e))?;
        self.write(to, &book)
    }
}
