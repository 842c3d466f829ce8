//! Extraction options and their file-based configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigFault;

/// How header cells become record keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderPolicy {
    /// Header text is used verbatim; repeated headers are an error.
    Strict,
    /// Blank or repeated headers are keyed by their zero-based column index.
    Positional,
}

/// CSV dialect options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    /// Field delimiter (default: ',')
    pub delimiter: u8,
    /// Quote character (default: '"')
    pub quote: u8,
    /// Ignore whitespace before each field when reading
    pub trim_leading_whitespace: bool,
    /// Quote every field when writing
    pub quote_all: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            delimiter: b',',
            quote: b'"',
            trim_leading_whitespace: true,
            quote_all: true,
        }
    }
}

impl CsvOptions {
    /// Options for tab-separated values
    #[must_use]
    pub fn tsv() -> Self {
        CsvOptions {
            delimiter: b'\t',
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    #[must_use]
    pub fn with_quote(mut self, quote: u8) -> Self {
        self.quote = quote;
        self
    }

    #[must_use]
    pub fn with_trim_leading_whitespace(mut self, trim: bool) -> Self {
        self.trim_leading_whitespace = trim;
        self
    }

    #[must_use]
    pub fn with_quote_all(mut self, quote_all: bool) -> Self {
        self.quote_all = quote_all;
        self
    }
}

/// Options shared by readers and writers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Overrides each operation's own header policy when set.
    pub header_policy: Option<HeaderPolicy>,
    /// Evaluate formula cells instead of showing their cached results.
    pub evaluate_formulas: bool,
    /// Sheet read by the first-sheet operations; the first sheet when unset.
    pub sheet: Option<String>,
    /// Owner that every bucket touched must belong to.
    pub expected_owner: Option<String>,
    pub csv: CsvOptions,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            header_policy: None,
            evaluate_formulas: true,
            sheet: None,
            expected_owner: None,
            csv: CsvOptions::default(),
        }
    }
}

impl ExtractOptions {
    #[must_use]
    pub fn with_header_policy(mut self, policy: HeaderPolicy) -> Self {
        self.header_policy = Some(policy);
        self
    }

    #[must_use]
    pub fn with_formula_evaluation(mut self, evaluate: bool) -> Self {
        self.evaluate_formulas = evaluate;
        self
    }

    #[must_use]
    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    #[must_use]
    pub fn with_expected_owner(mut self, owner: impl Into<String>) -> Self {
        self.expected_owner = Some(owner.into());
        self
    }

    #[must_use]
    pub fn with_csv(mut self, csv: CsvOptions) -> Self {
        self.csv = csv;
        self
    }

    pub(crate) fn policy_or(&self, default: HeaderPolicy) -> HeaderPolicy {
        self.header_policy.unwrap_or(default)
    }

    pub(crate) fn owner(&self) -> Option<&str> {
        self.expected_owner.as_deref()
    }
}

/// Serialized form of [`ExtractOptions`], read from JSON or YAML.
///
/// ```yaml
/// header_policy: positional
/// evaluate_formulas: false
/// expected_owner: "123456789012"
/// csv:
///   delimiter: ";"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractConfig {
    pub header_policy: Option<HeaderPolicy>,
    pub evaluate_formulas: bool,
    pub sheet: Option<String>,
    pub expected_owner: Option<String>,
    pub csv: CsvConfig,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        ExtractConfig {
            header_policy: None,
            evaluate_formulas: true,
            sheet: None,
            expected_owner: None,
            csv: CsvConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CsvConfig {
    pub delimiter: char,
    pub quote: char,
    pub trim_leading_whitespace: bool,
    pub quote_all: bool,
}

impl Default for CsvConfig {
    fn default() -> Self {
        CsvConfig {
            delimiter: ',',
            quote: '"',
            trim_leading_whitespace: true,
            quote_all: true,
        }
    }
}

fn ascii_byte(field: &'static str, value: char) -> Result<u8, ConfigFault> {
    u8::try_from(value)
        .ok()
        .filter(u8::is_ascii)
        .ok_or(ConfigFault::InvalidCsvChar { field, value })
}

impl ExtractConfig {
    pub fn from_json_str(content: &str) -> Result<Self, ConfigFault> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigFault> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigFault> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let read = || {
            std::fs::read_to_string(path).map_err(|source| ConfigFault::Io {
                path: path.to_path_buf(),
                source,
            })
        };
        let config = match extension.as_deref() {
            Some("json") => Self::from_json_str(&read()?)?,
            Some("yaml" | "yml") => Self::from_yaml_str(&read()?)?,
            _ => return Err(ConfigFault::UnknownFormat(path.to_path_buf())),
        };
        tracing::debug!(path = %path.display(), "Loaded extraction config");
        Ok(config)
    }

    pub fn to_options(&self) -> Result<ExtractOptions, ConfigFault> {
        Ok(ExtractOptions {
            header_policy: self.header_policy,
            evaluate_formulas: self.evaluate_formulas,
            sheet: self.sheet.clone(),
            expected_owner: self.expected_owner.clone(),
            csv: CsvOptions {
                delimiter: ascii_byte("delimiter", self.csv.delimiter)?,
                quote: ascii_byte("quote", self.csv.quote)?,
                trim_leading_whitespace: self.csv.trim_leading_whitespace,
                quote_all: self.csv.quote_all,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_config_overrides_defaults() {
        let config = ExtractConfig::from_yaml_str(
            "header_policy: positional\nevaluate_formulas: false\ncsv:\n  delimiter: \";\"\n",
        )
        .unwrap();
        let options = config.to_options().unwrap();
        assert_eq!(options.header_policy, Some(HeaderPolicy::Positional));
        assert!(!options.evaluate_formulas);
        assert_eq!(options.csv.delimiter, b';');
        assert_eq!(options.csv.quote, b'"');
        assert!(options.csv.trim_leading_whitespace);
    }

    #[test]
    fn test_json_config_and_defaults_agree() {
        let config = ExtractConfig::from_json_str("{}").unwrap();
        assert_eq!(config.to_options().unwrap(), ExtractOptions::default());

        let config = ExtractConfig::from_json_str(r#"{"expected_owner":"acct"}"#).unwrap();
        assert_eq!(config.expected_owner.as_deref(), Some("acct"));
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            ExtractConfig::from_json_str(r#"{"bogus":1}"#),
            Err(ConfigFault::Json(_))
        ));
        let config = ExtractConfig {
            csv: CsvConfig {
                delimiter: '§',
                ..CsvConfig::default()
            },
            ..ExtractConfig::default()
        };
        assert!(matches!(
            config.to_options(),
            Err(ConfigFault::InvalidCsvChar { field: "delimiter", .. })
        ));
    }

    #[test]
    fn test_from_path_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extract.yml");
        std::fs::write(&path, "sheet: Data\n").unwrap();
        let config = ExtractConfig::from_path(&path).unwrap();
        assert_eq!(config.sheet.as_deref(), Some("Data"));

        let other = dir.path().join("extract.toml");
        std::fs::write(&other, "").unwrap();
        assert!(matches!(
            ExtractConfig::from_path(&other),
            Err(ConfigFault::UnknownFormat(_))
        ));
    }
}
