use crate::date::{format_datetime, is_date_format, serial_to_datetime};

/// Format code applied to cells that carry no explicit number format.
pub const GENERAL_FORMAT: &str = "General";

/// Significant digits shown by the General format before switching to
/// scientific notation.
const GENERAL_DIGITS: i32 = 10;

/// Format a number using a spreadsheet number-format code.
///
/// Empty and `General` codes use [`format_general`]; date codes render the
/// value as a serial date.
pub fn format_number(value: f64, pattern: &str) -> String {
    let pattern = pattern.trim();
    if pattern.is_empty() || pattern.eq_ignore_ascii_case(GENERAL_FORMAT) {
        return format_general(value);
    }

    if is_date_format(pattern) {
        return match serial_to_datetime(value) {
            Some(dt) => format_datetime(dt, pattern),
            None => format_general(value),
        };
    }

    let sections: Vec<&str> = pattern.split(';').collect();
    let (section, magnitude) = if value < 0.0 && sections.len() > 1 {
        // The negative section supplies its own sign
        (sections[1], value.abs())
    } else if value == 0.0 && sections.len() > 2 {
        (sections[2], value)
    } else {
        (sections[0], value)
    };

    let cleaned = clean_section(section);
    if cleaned.eq_ignore_ascii_case(GENERAL_FORMAT) {
        return format_general(magnitude);
    }
    format_number_pattern(&cleaned, magnitude)
}

/// Format a number the way the General format displays it.
pub fn format_general(value: f64) -> String {
    if !value.is_finite() {
        return "#NUM!".to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let abs = value.abs();
    if !(1e-9..1e11).contains(&abs) {
        return format_scientific(value);
    }

    let int_digits = if abs >= 1.0 {
        abs.log10().floor() as i32 + 1
    } else {
        1
    };
    let decimals = (GENERAL_DIGITS - int_digits).max(0) as usize;
    trim_fraction(format!("{value:.decimals$}"))
}

fn format_scientific(value: f64) -> String {
    let formatted = format!("{value:.5E}");
    let Some((mantissa, exponent)) = formatted.split_once('E') else {
        return formatted;
    };
    let mantissa = trim_fraction(mantissa.to_string());
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(rest) => ('-', rest),
        None => ('+', exponent),
    };
    format!("{mantissa}E{sign}{digits:0>2}")
}

fn trim_fraction(mut text: String) -> String {
    if text.contains('.') {
        while text.ends_with('0') {
            text.pop();
        }
        if text.ends_with('.') {
            text.pop();
        }
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}

/// Strip color/condition brackets, quotes, escapes and padding directives,
/// leaving placeholders and literal affixes. Locale currency brackets such
/// as `[$€-407]` keep their symbol.
fn clean_section(section: &str) -> String {
    let mut out = String::with_capacity(section.len());
    let mut chars = section.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '[' => {
                let token: String = chars.by_ref().take_while(|c| *c != ']').collect();
                if let Some(locale) = token.strip_prefix('$') {
                    let symbol = locale.split_once('-').map_or(locale, |(symbol, _)| symbol);
                    out.push_str(symbol);
                }
            }
            '"' => {
                for next in chars.by_ref() {
                    if next == '"' {
                        break;
                    }
                    out.push(next);
                }
            }
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '_' => {
                chars.next();
                out.push(' ');
            }
            '*' => {
                chars.next();
            }
            _ => out.push(ch),
        }
    }
    out.trim().to_string()
}

fn is_placeholder(ch: char) -> bool {
    matches!(ch, '0' | '#' | '?')
}

/// Split `0.00E+00` into mantissa pattern, exponent marker, sign mode and
/// exponent pattern.
fn split_exponent(pattern: &str) -> Option<(&str, char, char, &str)> {
    let bytes = pattern.as_bytes();
    let idx = bytes
        .windows(2)
        .position(|w| matches!(w[0], b'E' | b'e') && matches!(w[1], b'+' | b'-'))?;
    Some((
        &pattern[..idx],
        char::from(bytes[idx]),
        char::from(bytes[idx + 1]),
        &pattern[idx + 2..],
    ))
}

/// Scientific notation. The exponent is a multiple of the number of integer
/// placeholders, so `##0.0E+0` gives engineering notation.
fn format_exponential(
    mantissa_pattern: &str,
    marker: char,
    sign: char,
    exponent_pattern: &str,
    value: f64,
) -> String {
    let (int_pattern, frac_pattern) = mantissa_pattern
        .split_once('.')
        .unwrap_or((mantissa_pattern, ""));
    let int_places = int_pattern.chars().filter(|c| is_placeholder(*c)).count().max(1) as i32;
    let decimals = frac_pattern.chars().filter(|c| is_placeholder(*c)).count() as i32;

    let mut exponent = 0;
    let mut mantissa = value;
    if value != 0.0 && value.is_finite() {
        exponent = value.abs().log10().floor() as i32;
        exponent -= exponent.rem_euclid(int_places);
        mantissa = value / 10f64.powi(exponent);
        let scale = 10f64.powi(decimals);
        // rounding can carry into a new integer digit (9.999 -> 10.00)
        if (mantissa.abs() * scale).round() / scale >= 10f64.powi(int_places) {
            exponent += int_places;
            mantissa = value / 10f64.powi(exponent);
        }
    }

    let digits = exponent_pattern.chars().take_while(|c| is_placeholder(*c)).count();
    let width = exponent_pattern[..digits].chars().filter(|c| *c == '0').count();
    let suffix = &exponent_pattern[digits..];
    let sign_text = if exponent < 0 {
        "-"
    } else if sign == '+' {
        "+"
    } else {
        ""
    };
    format!(
        "{}{marker}{sign_text}{:0>width$}{suffix}",
        format_number_pattern(mantissa_pattern, mantissa),
        exponent.unsigned_abs(),
    )
}

fn format_number_pattern(pattern: &str, value: f64) -> String {
    if let Some((mantissa, marker, sign, exponent)) = split_exponent(pattern) {
        return format_exponential(mantissa, marker, sign, exponent, value);
    }

    let mut first_placeholder = None;
    let mut last_placeholder = None;
    for (idx, ch) in pattern.char_indices() {
        if matches!(ch, '0' | '#' | '?') {
            if first_placeholder.is_none() {
                first_placeholder = Some(idx);
            }
            last_placeholder = Some(idx + ch.len_utf8());
        }
    }

    let (Some(first), Some(last)) = (first_placeholder, last_placeholder) else {
        // Only literal text, e.g. a pure "-" section
        return pattern.to_string();
    };

    let prefix = &pattern[..first];
    let suffix = &pattern[last..];
    let body = &pattern[first..last];

    let percent = prefix.contains('%') || suffix.contains('%');
    let number = if percent { value * 100.0 } else { value };

    let (int_pattern, frac_pattern) = body.split_once('.').unwrap_or((body, ""));
    let decimals = frac_pattern
        .chars()
        .filter(|c| matches!(c, '0' | '#' | '?'))
        .count();
    let required_decimals = frac_pattern.chars().filter(|c| *c == '0').count();
    let required_int = int_pattern.chars().filter(|c| *c == '0').count();
    let grouping = int_pattern.contains(',');

    let formatted = format!("{:.*}", decimals, number.abs());
    let (int_part, frac_part) = formatted
        .split_once('.')
        .unwrap_or((formatted.as_str(), ""));

    let mut int_digits = int_part.trim_start_matches('0').to_string();
    while int_digits.len() < required_int {
        int_digits.insert(0, '0');
    }
    if grouping {
        int_digits = group_thousands(&int_digits);
    }

    let mut frac = frac_part.to_string();
    while frac.len() > required_decimals && frac.ends_with('0') {
        frac.pop();
    }

    let mut out = String::new();
    let shows_digits = int_digits.chars().any(|c| c != '0' && c != ',')
        || frac.chars().any(|c| c != '0');
    let negative = number < 0.0 && shows_digits;
    if negative {
        out.push('-');
    }
    out.push_str(prefix);
    out.push_str(&int_digits);
    if !frac.is_empty() {
        out.push('.');
        out.push_str(&frac);
    }
    out.push_str(suffix);
    out
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().rev().enumerate() {
        if idx > 0 && idx % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_general_integers_drop_fraction() {
        assert_eq!(format_general(10.0), "10");
        assert_eq!(format_general(-42.0), "-42");
        assert_eq!(format_general(0.0), "0");
    }

    #[test]
    fn test_general_hides_float_noise() {
        assert_eq!(format_general(0.1 + 0.2), "0.3");
        assert_eq!(format_general(123_456.789), "123456.789");
    }

    #[test]
    fn test_general_scientific() {
        assert_eq!(format_general(1.5e12), "1.5E+12");
        assert_eq!(format_general(2.5e-10), "2.5E-10");
    }

    #[test]
    fn test_grouping_and_decimals() {
        assert_eq!(format_number(1234.5, "#,##0.00"), "1,234.50");
        assert_eq!(format_number(1_234_567.0, "#,##0"), "1,234,567");
        assert_eq!(format_number(0.5, "0.0"), "0.5");
    }

    #[test]
    fn test_percent() {
        assert_eq!(format_number(0.256, "0.0%"), "25.6%");
    }

    #[test]
    fn test_negative_section_uses_magnitude() {
        assert_eq!(format_number(-12.3, "0.0;(0.0)"), "(12.3)");
        assert_eq!(format_number(-12.3, "0.0"), "-12.3");
    }

    #[test]
    fn test_currency_literal_prefix() {
        assert_eq!(format_number(1234.5, "\"$\"#,##0.00"), "$1,234.50");
        assert_eq!(format_number(1234.5, "[$$-409]#,##0.00"), "$1,234.50");
        assert_eq!(format_number(1234.5, "#,##0.00 [$€-407]"), "1,234.50 €");
        assert_eq!(format_number(-5.0, "[Red][$£-809]0.00"), "-£5.00");
        assert_eq!(format_number(7.0, "[$-409]0"), "7");
    }

    #[test]
    fn test_scientific_codes() {
        assert_eq!(format_number(12345.0, "0.00E+00"), "1.23E+04");
        assert_eq!(format_number(0.000_123, "0.0E+00"), "1.2E-04");
        assert_eq!(format_number(-12345.0, "0.00E+0"), "-1.23E+4");
        assert_eq!(format_number(9.999, "0.00E+00"), "1.00E+01");
        assert_eq!(format_number(12345.0, "0.00E-00"), "1.23E04");
        assert_eq!(format_number(0.0, "0.00E+00"), "0.00E+00");
        assert_eq!(format_number(12345.0, "##0.0E+0"), "12.3E+3");
    }

    #[test]
    fn test_date_code_formats_serial() {
        assert_eq!(format_number(44562.0, "yyyy-mm-dd"), "2022-01-01");
    }
}
