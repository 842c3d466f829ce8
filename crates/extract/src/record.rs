//! Header-to-key mapping and record assembly.

use indexmap::IndexMap;

use crate::config::HeaderPolicy;
use crate::error::FormatFault;

/// One data row keyed by header, in column order.
pub type Record = IndexMap<String, String>;

/// Column-oriented extraction result: header key to values in row order.
pub type Columns = IndexMap<String, Vec<String>>;

/// Trimmed display text; the only normalization applied to cell text.
#[must_use]
pub fn normalize(text: &str) -> String {
    text.trim().to_string()
}

/// A row is empty when every value is blank after trimming.
#[must_use]
pub fn is_blank_row<S: AsRef<str>>(values: &[S]) -> bool {
    values.iter().all(|v| v.as_ref().trim().is_empty())
}

/// Record keys derived from a header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderKeys {
    keys: Vec<String>,
    policy: HeaderPolicy,
}

impl HeaderKeys {
    /// Build the key for each header cell under `policy`.
    ///
    /// `Strict` keeps the text verbatim and rejects repeats. `Positional`
    /// keys blank and repeated headers by column index; literal header
    /// text always keeps its name.
    pub fn new<S: AsRef<str>>(header: &[S], policy: HeaderPolicy) -> Result<Self, FormatFault> {
        let names: Vec<&str> = header.iter().map(AsRef::as_ref).collect();
        let keys = match policy {
            HeaderPolicy::Strict => strict_keys(&names)?,
            HeaderPolicy::Positional => positional_keys(&names),
        };
        Ok(Self { keys, policy })
    }

    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    #[must_use]
    pub fn policy(&self) -> HeaderPolicy {
        self.policy
    }

    /// Key for a column past the header's width, if the policy allows one.
    fn extra_key(&self, keys: &[&str], column: usize) -> Option<String> {
        match self.policy {
            HeaderPolicy::Strict => None,
            HeaderPolicy::Positional => {
                let mut key = column.to_string();
                while keys.contains(&key.as_str()) {
                    key.push('_');
                }
                Some(key)
            }
        }
    }

    /// Key every value of a data row. Short rows are padded with `""`;
    /// blank values beyond the header are dropped.
    pub fn record(&self, values: Vec<String>, row: usize) -> Result<Record, FormatFault> {
        let mut record = Record::with_capacity(self.keys.len().max(values.len()));
        for (column, value) in values.into_iter().enumerate() {
            if let Some(key) = self.keys.get(column) {
                record.insert(key.clone(), value);
                continue;
            }
            if value.is_empty() {
                continue;
            }
            let taken: Vec<&str> = record.keys().map(String::as_str).collect();
            let key = self
                .extra_key(&taken, column)
                .ok_or(FormatFault::UnmappedColumn { row, column })?;
            record.insert(key, value);
        }
        for key in &self.keys {
            if !record.contains_key(key) {
                record.insert(key.clone(), String::new());
            }
        }
        Ok(record)
    }

    /// Append each value of a data row to its column's list, creating
    /// columns on demand.
    pub fn append_to(
        &self,
        columns: &mut Columns,
        values: Vec<String>,
        row: usize,
    ) -> Result<(), FormatFault> {
        for (key, value) in self.record(values, row)? {
            columns.entry(key).or_default().push(value);
        }
        Ok(())
    }
}

fn strict_keys(names: &[&str]) -> Result<Vec<String>, FormatFault> {
    let mut keys: Vec<String> = Vec::with_capacity(names.len());
    for (column, name) in names.iter().enumerate() {
        if let Some(first) = keys.iter().position(|k| k == name) {
            return Err(FormatFault::DuplicateHeader {
                name: (*name).to_string(),
                first,
                second: column,
            });
        }
        keys.push((*name).to_string());
    }
    Ok(keys)
}

fn positional_keys(names: &[&str]) -> Vec<String> {
    // first occurrence of each non-blank header keeps its text
    let mut literal: Vec<Option<String>> = vec![None; names.len()];
    let mut taken: Vec<String> = Vec::with_capacity(names.len());
    for (column, name) in names.iter().enumerate() {
        if !name.is_empty() && !taken.iter().any(|k| k == name) {
            taken.push((*name).to_string());
            literal[column] = Some((*name).to_string());
        }
    }

    literal
        .into_iter()
        .enumerate()
        .map(|(column, key)| {
            key.unwrap_or_else(|| {
                let key = positional_key(&taken, column);
                taken.push(key.clone());
                key
            })
        })
        .collect()
}

fn positional_key(keys: &[String], column: usize) -> String {
    let mut key = column.to_string();
    while keys.contains(&key) {
        key.push('_');
    }
    key
}
