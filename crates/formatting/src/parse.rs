/// Parse plain decimal text such as `"42"`, `" -3.5 "` or `"1e3"`.
///
/// Non-finite results are rejected.
pub fn parse_decimal(input: &str) -> Option<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Parse US-dollar currency text such as `"$1,234.50"`, `"-$12"` or
/// `"($12.00)"`.
///
/// The currency symbol is required; grouping separators are stripped.
pub fn parse_currency(input: &str) -> Option<f64> {
    let mut text = input.trim();
    let mut negative = false;

    if let Some(inner) = text.strip_prefix('(').and_then(|rest| rest.strip_suffix(')')) {
        negative = true;
        text = inner.trim();
    } else if let Some(rest) = text.strip_prefix('-') {
        negative = true;
        text = rest.trim_start();
    }

    let amount = text.strip_prefix('$')?.trim_start();
    let (int_part, frac_part) = amount.split_once('.').unwrap_or((amount, ""));

    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if int_part.starts_with(',') || !int_part.chars().all(|c| c.is_ascii_digit() || c == ',') {
        return None;
    }
    if !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let digits: String = amount.chars().filter(|c| *c != ',').collect();
    let value = digits.parse::<f64>().ok()?;
    Some(if negative { -value } else { value })
}
