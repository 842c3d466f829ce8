use gridfile_formulas::{BasicEvaluator, FormulaEvaluator};
use gridfile_sheet::{Workbook, Worksheet};
use gridfile_storage::{ObjectLocation, ObjectStore};

use crate::config::{ExtractOptions, HeaderPolicy};
use crate::error::{ExtractError, FormatFault, Result};
use crate::record::{Columns, Record};
use crate::table::{sheet_columns, sheet_records, sheet_rows};

static BUILTIN_EVALUATOR: BasicEvaluator = BasicEvaluator;

/// Reads xlsx documents from an object store into records.
///
/// Each call fetches and parses the document once; the workbook is dropped
/// before the call returns, on success and on error alike.
pub struct ExcelReader<S> {
    store: S,
    options: ExtractOptions,
    evaluator: Option<Box<dyn FormulaEvaluator>>,
}

impl<S: ObjectStore> ExcelReader<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            options: ExtractOptions::default(),
            evaluator: None,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    /// Use `evaluator` for formula cells instead of the built-in one.
    #[must_use]
    pub fn with_evaluator(mut self, evaluator: impl FormulaEvaluator + 'static) -> Self {
        self.evaluator = Some(Box::new(evaluator));
        self
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    fn evaluator(&self) -> Option<&dyn FormulaEvaluator> {
        if !self.options.evaluate_formulas {
            return None;
        }
        Some(self.evaluator.as_deref().unwrap_or(&BUILTIN_EVALUATOR))
    }

    /// Fetch and parse the document at `location`.
    pub fn open(&self, location: &ObjectLocation) -> Result<Workbook> {
        let bytes = self
            .store
            .get_bytes(location, self.options.owner())
            .map_err(|e| ExtractError::storage(location, e))?;
        let book = Workbook::from_xlsx_bytes(location.to_string(), &bytes)
            .map_err(|e| ExtractError::format(location, e))?;
        tracing::info!(
            %location,
            size = bytes.len(),
            sheets = book.sheet_count(),
            "Opened workbook"
        );
        Ok(book)
    }

    /// The configured sheet, or the first one. A configured sheet that does
    /// not exist is an error here.
    fn default_sheet<'b>(
        &self,
        book: &'b Workbook,
        location: &ObjectLocation,
    ) -> Result<&'b Worksheet> {
        match &self.options.sheet {
            Some(name) => book
                .find_worksheet(name)
                .ok_or_else(|| ExtractError::MissingResource {
                    kind: "worksheet",
                    name: name.clone(),
                    location: location.clone(),
                }),
            None => book
                .worksheet_at(0)
                .ok_or_else(|| ExtractError::format(location, FormatFault::NoWorksheets)),
        }
    }

    /// Records of the default sheet with header text used verbatim.
    /// Repeated header names fail the whole read.
    pub fn records(&self, location: &ObjectLocation) -> Result<Vec<Record>> {
        let book = self.open(location)?;
        let sheet = self.default_sheet(&book, location)?;
        let policy = self.options.policy_or(HeaderPolicy::Strict);
        let records = sheet_records(&book, sheet, policy, self.evaluator())
            .map_err(|e| ExtractError::format(location, e))?;
        tracing::debug!(%location, sheet = %sheet.name(), records = records.len(), "Read records");
        Ok(records)
    }

    /// Records of the named sheet, keying blank and repeated headers by
    /// column index. `Ok(None)` when the sheet does not exist.
    pub fn records_in_sheet(
        &self,
        location: &ObjectLocation,
        sheet: &str,
    ) -> Result<Option<Vec<Record>>> {
        let book = self.open(location)?;
        let Some(worksheet) = book.find_worksheet(sheet) else {
            tracing::debug!(%location, sheet, "Worksheet not present");
            return Ok(None);
        };
        let policy = self.options.policy_or(HeaderPolicy::Positional);
        sheet_records(&book, worksheet, policy, self.evaluator())
            .map(Some)
            .map_err(|e| ExtractError::format(location, e))
    }

    /// Values of the default sheet grouped by header.
    pub fn records_by_column(&self, location: &ObjectLocation) -> Result<Columns> {
        let book = self.open(location)?;
        let sheet = self.default_sheet(&book, location)?;
        let policy = self.options.policy_or(HeaderPolicy::Positional);
        sheet_columns(&book, sheet, policy, self.evaluator())
            .map_err(|e| ExtractError::format(location, e))
    }

    /// Every row of the default sheet, header included, as positional
    /// values.
    pub fn rows(&self, location: &ObjectLocation) -> Result<Vec<Vec<String>>> {
        let book = self.open(location)?;
        let sheet = self.default_sheet(&book, location)?;
        Ok(sheet_rows(&book, sheet, self.evaluator()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridfile_formulas::{FormulaError, Value, ValueResolver};
    use gridfile_sheet::CellValue;
    use gridfile_storage::{InMemoryStore, PutOptions};

    struct Failing;

    impl FormulaEvaluator for Failing {
        fn evaluate(
            &self,
            formula: &str,
            _resolver: &dyn ValueResolver,
        ) -> std::result::Result<Value, FormulaError> {
            Err(FormulaError::Unsupported(formula.to_string()))
        }
    }

    fn store_with(book: &Workbook) -> (InMemoryStore, ObjectLocation) {
        let store = InMemoryStore::new().with_bucket("in", None, None);
        let location = ObjectLocation::new("in", "book.xlsx");
        store
            .put(&location, book.to_xlsx_bytes().unwrap(), &PutOptions::default())
            .unwrap();
        (store, location)
    }

    fn book() -> Workbook {
        let mut book = Workbook::new("fixture");
        let sheet = book.add_worksheet("Data").unwrap();
        for (c, header) in ["A", "B", "Sum"].into_iter().enumerate() {
            sheet.set_value(0, c as u32, header).unwrap();
        }
        sheet.set_value(1, 0, 2.0).unwrap();
        sheet.set_value(1, 1, 3.0).unwrap();
        sheet.set_value(1, 2, CellValue::formula_with_cached("A2+B2", 99.0.into())).unwrap();
        book
    }

    #[test]
    fn test_evaluation_can_be_disabled() {
        let (store, location) = store_with(&book());
        let evaluated = ExcelReader::new(&store).records(&location).unwrap();
        assert_eq!(evaluated[0]["Sum"], "5");

        let cached = ExcelReader::new(&store)
            .with_options(ExtractOptions::default().with_formula_evaluation(false))
            .records(&location)
            .unwrap();
        assert_eq!(cached[0]["Sum"], "99");
    }

    #[test]
    fn test_custom_evaluator_failure_uses_cache() {
        let (store, location) = store_with(&book());
        let records = ExcelReader::new(&store)
            .with_evaluator(Failing)
            .records(&location)
            .unwrap();
        assert_eq!(records[0]["Sum"], "99");
    }

    #[test]
    fn test_configured_sheet_must_exist() {
        let (store, location) = store_with(&book());
        let err = ExcelReader::new(&store)
            .with_options(ExtractOptions::default().with_sheet("Summary"))
            .records(&location)
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractError::MissingResource { kind: "worksheet", .. }
        ));
        assert!(ExcelReader::new(&store)
            .records_in_sheet(&location, "Summary")
            .unwrap()
            .is_none());
    }
}
