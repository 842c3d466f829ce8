use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Zero-based cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellAddress {
    pub row: u32,
    pub col: u32,
}

impl CellAddress {
    #[must_use]
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse an A1 reference; `$` anchors are accepted and ignored.
    #[must_use]
    pub fn parse_a1(text: &str) -> Option<Self> {
        let text = text.trim();
        let caps = a1_regex().captures(text)?;
        let col = column_index(caps.get(1)?.as_str())?;
        let row: u32 = caps.get(2)?.as_str().parse().ok()?;
        if row == 0 {
            return None;
        }
        Some(Self::new(row - 1, col))
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row + 1)
    }
}

/// Convert a zero-based column index to letters (0 = A, 25 = Z, 26 = AA).
#[must_use]
pub fn column_letters(col: u32) -> String {
    let mut n = u64::from(col) + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Convert column letters to a zero-based index (case-insensitive).
#[must_use]
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut col: u32 = 0;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        col = col * 26 + u32::from(b.to_ascii_uppercase() - b'A' + 1);
    }
    Some(col - 1)
}

/// Rewrite every relative row number in `formula` to `row_number` (1-based).
///
/// Each `<letters><digits>` token has its digits replaced; column letters
/// are kept. Tokens inside string literals, sheet names (`Sheet2!`),
/// function names (`LOG10(`) and rows anchored with `$` are left alone.
#[must_use]
pub fn rewrite_row_references(formula: &str, row_number: u32) -> String {
    let literals = string_literal_spans(formula);
    let bytes = formula.as_bytes();
    let mut out = String::with_capacity(formula.len());
    let mut last = 0;

    for caps in cell_token_regex().captures_iter(formula) {
        let (Some(whole), Some(letters)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let (start, end) = (whole.start(), whole.end());

        let in_literal = literals.iter().any(|&(s, e)| start > s && start < e);
        let before = start.checked_sub(1).map(|i| bytes[i]);
        let after = bytes.get(end).copied();
        let glued_before =
            before.is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.'));
        let glued_after = after
            .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'!' | b'('));

        if in_literal || glued_before || glued_after {
            continue;
        }

        out.push_str(&formula[last..start]);
        out.push_str(letters.as_str());
        out.push_str(&row_number.to_string());
        last = end;
    }

    out.push_str(&formula[last..]);
    out
}

fn string_literal_spans(formula: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut open: Option<usize> = None;
    for (idx, ch) in formula.char_indices() {
        if ch == '"' {
            match open.take() {
                Some(start) => spans.push((start, idx)),
                None => open = Some(idx),
            }
        }
    }
    if let Some(start) = open {
        spans.push((start, formula.len()));
    }
    spans
}

fn a1_regex() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\$?([A-Za-z]{1,3})\$?(\d+)$").expect("valid regex"))
}

fn cell_token_regex() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\$?[A-Z]+)(\d+)").expect("valid regex"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(701), "ZZ");
        assert_eq!(column_letters(16_383), "XFD");
        assert_eq!(column_letters(u32::MAX), "MWLQKWV");
        assert_eq!(column_index("A"), Some(0));
        assert_eq!(column_index("aa"), Some(26));
        assert_eq!(column_index("A1"), None);
    }

    #[test]
    fn test_parse_a1() {
        assert_eq!(CellAddress::parse_a1("B3"), Some(CellAddress::new(2, 1)));
        assert_eq!(CellAddress::parse_a1("$C$10"), Some(CellAddress::new(9, 2)));
        assert_eq!(CellAddress::parse_a1("A0"), None);
        assert_eq!(CellAddress::new(0, 27).to_string(), "AB1");
    }

    #[test]
    fn test_rewrite_rows() {
        assert_eq!(rewrite_row_references("A1", 3), "A3");
        assert_eq!(rewrite_row_references("=SUM(B2:D2)*C2", 7), "=SUM(B7:D7)*C7");
        assert_eq!(rewrite_row_references("$A1+b1", 4), "$A4+b4");
    }

    #[test]
    fn test_rewrite_leaves_non_references() {
        assert_eq!(rewrite_row_references("LOG10(A1)", 5), "LOG10(A5)");
        assert_eq!(rewrite_row_references("Sheet2!A1", 5), "Sheet2!A5");
        assert_eq!(rewrite_row_references("A$1+A1", 5), "A$1+A5");
        assert_eq!(rewrite_row_references("\"A1\"&A1", 9), "\"A1\"&A9");
    }
}
