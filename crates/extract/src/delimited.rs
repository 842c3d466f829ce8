//! CSV documents: header-keyed reading and writing to object storage.

use std::io::Read;

use gridfile_storage::{upload, ObjectLocation, ObjectStore};

use crate::config::{CsvOptions, ExtractOptions, HeaderPolicy};
use crate::error::{ExtractError, Result};
use crate::record::{is_blank_row, normalize, HeaderKeys, Record};

const CSV_CONTENT_TYPE: &str = "text/csv";

fn reader_builder(options: &CsvOptions) -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .delimiter(options.delimiter)
        .quote(options.quote)
        .has_headers(false) // the header row is keyed by HeaderKeys
        .flexible(true);
    builder
}

fn writer_builder(options: &CsvOptions) -> csv::WriterBuilder {
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(options.delimiter)
        .quote(options.quote)
        .flexible(true)
        .quote_style(if options.quote_all {
            csv::QuoteStyle::Always
        } else {
            csv::QuoteStyle::Necessary
        });
    builder
}

/// Lazy record sequence over one CSV stream.
///
/// Dropping it before exhaustion releases the stream.
pub struct CsvRecords<R> {
    reader: csv::Reader<R>,
    keys: HeaderKeys,
    location: ObjectLocation,
    trim_leading: bool,
    row: csv::StringRecord,
    line: usize,
}

impl<R: Read> CsvRecords<R> {
    /// Read the header line from `reader` and prepare the key mapping.
    pub fn new(
        reader: R,
        location: ObjectLocation,
        options: &CsvOptions,
        policy: HeaderPolicy,
    ) -> Result<Self> {
        let mut reader = reader_builder(options).from_reader(reader);
        let trim_leading = options.trim_leading_whitespace;
        let mut header = csv::StringRecord::new();
        let has_header = reader
            .read_record(&mut header)
            .map_err(|e| ExtractError::csv(&location, e))?;
        let names: Vec<String> = if has_header {
            header.iter().map(normalize).collect()
        } else {
            Vec::new()
        };
        let keys = HeaderKeys::new(&names, policy).map_err(|e| ExtractError::format(&location, e))?;
        Ok(Self {
            reader,
            keys,
            location,
            trim_leading,
            row: csv::StringRecord::new(),
            line: 0,
        })
    }

    #[must_use]
    pub fn keys(&self) -> &[String] {
        self.keys.keys()
    }
}

fn fields(record: &csv::StringRecord, trim_leading: bool) -> Vec<String> {
    record
        .iter()
        .map(|field| {
            if trim_leading {
                field.trim_start().to_string()
            } else {
                field.to_string()
            }
        })
        .collect()
}

impl<R: Read> Iterator for CsvRecords<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.reader.read_record(&mut self.row) {
                Ok(false) => return None,
                Ok(true) => {}
                Err(e) => return Some(Err(ExtractError::csv(&self.location, e))),
            }
            self.line += 1;
            let values = fields(&self.row, self.trim_leading);
            if is_blank_row(&values) {
                continue;
            }
            return Some(
                self.keys
                    .record(values, self.line)
                    .map_err(|e| ExtractError::format(&self.location, e)),
            );
        }
    }
}

/// Reads CSV documents from an object store.
#[derive(Debug)]
pub struct CsvReader<S> {
    store: S,
    options: ExtractOptions,
}

impl<S: ObjectStore> CsvReader<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            options: ExtractOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    /// Open the document and read its header. Rows are parsed as the
    /// returned iterator is advanced; blank rows are skipped.
    pub fn records_iter(
        &self,
        location: &ObjectLocation,
    ) -> Result<CsvRecords<Box<dyn Read + Send>>> {
        let stream = self
            .store
            .get(location, self.options.owner())
            .map_err(|e| ExtractError::storage(location, e))?;
        tracing::debug!(%location, "Opened CSV stream");
        CsvRecords::new(
            stream,
            location.clone(),
            &self.options.csv,
            self.options.policy_or(HeaderPolicy::Strict),
        )
    }

    /// Every non-blank record of the document.
    pub fn records(&self, location: &ObjectLocation) -> Result<Vec<Record>> {
        let records = self.records_iter(location)?.collect::<Result<Vec<_>>>()?;
        tracing::debug!(%location, records = records.len(), "Read CSV records");
        Ok(records)
    }
}

/// Encode rows as CSV bytes.
pub fn encode_rows<I, R, T>(options: &CsvOptions, rows: I) -> std::result::Result<Vec<u8>, csv::Error>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut writer = writer_builder(options).from_writer(Vec::new());
    for row in rows {
        writer.write_record(row)?;
    }
    writer.into_inner().map_err(flush_error)
}

fn flush_error<W>(err: csv::IntoInnerError<W>) -> csv::Error {
    csv::Error::from(std::io::Error::new(
        err.error().kind(),
        err.error().to_string(),
    ))
}

/// Writes whole CSV documents to an object store in one call.
#[derive(Debug)]
pub struct CsvWriter<S> {
    store: S,
    options: ExtractOptions,
}

impl<S: ObjectStore> CsvWriter<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            options: ExtractOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    /// Encode `rows` and publish them to `location` with the bucket's
    /// default encryption.
    pub fn write_records<I, R, T>(&self, location: &ObjectLocation, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let bytes =
            encode_rows(&self.options.csv, rows).map_err(|e| ExtractError::csv(location, e))?;
        upload(
            &self.store,
            location,
            bytes,
            Some(CSV_CONTENT_TYPE),
            self.options.owner(),
        )
        .map_err(|e| ExtractError::storage(location, e))
    }
}

/// Accumulates CSV rows in memory and publishes them once on
/// [`finish`](BufferedCsvWriter::finish).
pub struct BufferedCsvWriter<S> {
    store: S,
    location: ObjectLocation,
    expected_owner: Option<String>,
    writer: csv::Writer<Vec<u8>>,
    rows: usize,
}

impl<S: ObjectStore> BufferedCsvWriter<S> {
    pub fn new(store: S, location: ObjectLocation, options: &ExtractOptions) -> Self {
        Self {
            store,
            location,
            expected_owner: options.expected_owner.clone(),
            writer: writer_builder(&options.csv).from_writer(Vec::new()),
            rows: 0,
        }
    }

    pub fn append<R, T>(&mut self, row: R) -> Result<()>
    where
        R: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer
            .write_record(row)
            .map_err(|e| ExtractError::csv(&self.location, e))?;
        self.rows += 1;
        Ok(())
    }

    #[must_use]
    pub fn rows_written(&self) -> usize {
        self.rows
    }

    /// Publish everything appended so far. Returns the number of rows.
    pub fn finish(self) -> Result<usize> {
        let Self {
            store,
            location,
            expected_owner,
            writer,
            rows,
        } = self;
        let bytes = writer
            .into_inner()
            .map_err(|e| ExtractError::csv(&location, flush_error(e)))?;
        upload(
            &store,
            &location,
            bytes,
            Some(CSV_CONTENT_TYPE),
            expected_owner.as_deref(),
        )
        .map_err(|e| ExtractError::storage(&location, e))?;
        tracing::info!(%location, rows, "Published CSV");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormatFault;

    fn records(content: &str, policy: HeaderPolicy) -> Result<Vec<Record>> {
        CsvRecords::new(
            content.as_bytes(),
            ObjectLocation::new("mem", "test.csv"),
            &CsvOptions::default(),
            policy,
        )?
        .collect()
    }

    #[test]
    fn test_leading_whitespace_is_ignored() {
        let rows = records("name, id\n  Ann,  1\n", HeaderPolicy::Strict).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "Ann");
        assert_eq!(rows[0]["id"], "1");
    }

    #[test]
    fn test_header_names_are_trimmed() {
        let rows = records("id ,\tname \n1,Ann\n", HeaderPolicy::Strict).unwrap();
        assert_eq!(rows[0].keys().collect::<Vec<_>>(), ["id", "name"]);
        assert_eq!(rows[0]["name"], "Ann");
    }

    #[test]
    fn test_blank_rows_are_skipped() {
        let rows = records("a,b\n1,2\n,\n \n3,4\n", HeaderPolicy::Strict).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["a"], "3");
    }

    #[test]
    fn test_short_rows_padded() {
        let rows = records("a,b,c\n1\n", HeaderPolicy::Strict).unwrap();
        assert_eq!(rows[0]["c"], "");
    }

    #[test]
    fn test_duplicate_headers_fail_in_strict_mode() {
        let err = records("id,id\n1,2\n", HeaderPolicy::Strict).unwrap_err();
        assert!(matches!(
            err,
            ExtractError::Format {
                source: FormatFault::DuplicateHeader { .. },
                ..
            }
        ));
        let rows = records("id,id\n1,2\n", HeaderPolicy::Positional).unwrap();
        assert_eq!(rows[0]["1"], "2");
    }

    #[test]
    fn test_empty_document_has_no_records() {
        assert!(records("", HeaderPolicy::Strict).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_utf8_is_a_format_fault() {
        let err = CsvRecords::new(
            &b"a\n\xff\xfe\n"[..],
            ObjectLocation::new("mem", "bad.csv"),
            &CsvOptions::default(),
            HeaderPolicy::Strict,
        )
        .unwrap()
        .next()
        .unwrap()
        .unwrap_err();
        assert!(matches!(err, ExtractError::Format { .. }));
        assert!(err.to_string().contains("mem/bad.csv"));
    }

    #[test]
    fn test_encode_rows_quotes_every_field() {
        let bytes = encode_rows(&CsvOptions::default(), [["a", "b,c"], ["1", "2"]]).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "\"a\",\"b,c\"\n\"1\",\"2\"\n");

        let bytes =
            encode_rows(&CsvOptions::default().with_quote_all(false), [["a", "b,c"]]).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "a,\"b,c\"\n");
    }
}
