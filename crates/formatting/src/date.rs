use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike};

/// Format applied to date cells that carry no explicit date format.
pub const DEFAULT_DATE_FORMAT: &str = "m/d/yy";

/// Format applied to date-time cells that carry no explicit date format.
pub const DEFAULT_DATETIME_FORMAT: &str = "m/d/yy h:mm";

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Serial 60 is the phantom 1900-02-29 of the 1900 date system; serials
/// below 61 count from 1899-12-31, the rest from 1899-12-30.
const FIRST_SHIFTED_SERIAL: i64 = 61;

fn epoch(before_leap_bug: bool) -> NaiveDateTime {
    let day = if before_leap_bug { 31 } else { 30 };
    NaiveDate::from_ymd_opt(1899, 12, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Convert a 1900-system serial number into a timestamp.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }

    let days = serial.trunc() as i64;
    let millis = ((serial - serial.trunc()) * MILLIS_PER_DAY).round() as i64;
    let base = epoch(days < FIRST_SHIFTED_SERIAL);

    base.checked_add_signed(TimeDelta::try_days(days)?)?
        .checked_add_signed(TimeDelta::try_milliseconds(millis)?)
}

/// Convert a timestamp into a 1900-system serial number.
pub fn datetime_to_serial(dt: NaiveDateTime) -> f64 {
    let shifted = epoch(false);
    let mut delta = dt.signed_duration_since(shifted);
    if delta.num_days() < FIRST_SHIFTED_SERIAL {
        delta = dt.signed_duration_since(epoch(true));
    }
    delta.num_milliseconds() as f64 / MILLIS_PER_DAY
}

/// Check whether a number-format code renders its value as a date or time.
///
/// Only the first section is considered; elapsed-time codes such as `[h]:mm`
/// are durations, not dates.
pub fn is_date_format(format: &str) -> bool {
    let mut escaped = false;
    let mut quoted = false;
    let mut brackets = 0u8;
    let mut prev = ' ';
    let mut elapsed = false;
    let mut am_pm = false;

    for ch in format.chars() {
        match (ch, escaped, quoted, am_pm, brackets) {
            (_, true, ..) => escaped = false,
            ('_' | '\\', ..) => escaped = true,
            ('"', _, true, _, _) => quoted = false,
            (_, _, true, _, _) => (),
            ('"', ..) => quoted = true,
            (';', ..) => return false,
            ('[', ..) => brackets += 1,
            (']', .., 1) if elapsed => return false,
            (']', ..) => brackets = brackets.saturating_sub(1),
            ('a' | 'A', _, _, false, 0) => am_pm = true,
            ('p' | 'm' | '/' | 'P' | 'M', _, _, true, 0) => return true,
            ('d' | 'm' | 'h' | 'y' | 's' | 'D' | 'M' | 'H' | 'Y' | 'S', _, _, false, 0) => {
                return true;
            }
            _ => {
                if !(elapsed && ch.eq_ignore_ascii_case(&prev)) {
                    elapsed = prev == '[' && matches!(ch, 'm' | 'h' | 's' | 'M' | 'H' | 'S');
                }
            }
        }
        prev = ch;
    }
    false
}

#[derive(Debug, Clone, PartialEq)]
enum DatePart {
    Year(usize),
    Month(usize),
    Minute(usize),
    Day(usize),
    Hour(usize),
    Second(usize),
    AmPm { short: bool },
    Literal(String),
}

/// Render a timestamp with a spreadsheet date-format code such as
/// `yyyy-mm-dd`, `m/d/yy h:mm` or `dddd, mmmm d`.
pub fn format_datetime(dt: NaiveDateTime, pattern: &str) -> String {
    let section = pattern.split(';').next().unwrap_or(pattern);
    let parts = tokenize(section);
    let twelve_hour = parts.iter().any(|p| matches!(p, DatePart::AmPm { .. }));

    let mut out = String::new();
    for part in &parts {
        match part {
            DatePart::Year(n) if *n <= 2 => out.push_str(&format!("{:02}", dt.year() % 100)),
            DatePart::Year(_) => out.push_str(&dt.year().to_string()),
            DatePart::Month(1) => out.push_str(&dt.month().to_string()),
            DatePart::Month(2) => out.push_str(&format!("{:02}", dt.month())),
            DatePart::Month(3) => out.push_str(&dt.format("%b").to_string()),
            DatePart::Month(5) => out.push_str(&dt.format("%B").to_string()[..1]),
            DatePart::Month(_) => out.push_str(&dt.format("%B").to_string()),
            DatePart::Day(1) => out.push_str(&dt.day().to_string()),
            DatePart::Day(2) => out.push_str(&format!("{:02}", dt.day())),
            DatePart::Day(3) => out.push_str(&dt.format("%a").to_string()),
            DatePart::Day(_) => out.push_str(&dt.format("%A").to_string()),
            DatePart::Hour(n) => {
                let hour = if twelve_hour {
                    match dt.hour() % 12 {
                        0 => 12,
                        h => h,
                    }
                } else {
                    dt.hour()
                };
                push_padded(&mut out, hour, *n);
            }
            DatePart::Minute(n) => push_padded(&mut out, dt.minute(), *n),
            DatePart::Second(n) => push_padded(&mut out, dt.second(), *n),
            DatePart::AmPm { short } => {
                let upper = if dt.hour() < 12 { "AM" } else { "PM" };
                out.push_str(if *short { &upper[..1] } else { upper });
            }
            DatePart::Literal(text) => out.push_str(text),
        }
    }
    out
}

fn push_padded(out: &mut String, value: u32, width: usize) {
    if width >= 2 {
        out.push_str(&format!("{value:02}"));
    } else {
        out.push_str(&value.to_string());
    }
}

fn tokenize(pattern: &str) -> Vec<DatePart> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut parts = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let lower = ch.to_ascii_lowercase();

        if matches!(lower, 'y' | 'm' | 'd' | 'h' | 's') {
            let mut run = 1;
            while i + run < chars.len() && chars[i + run].eq_ignore_ascii_case(&ch) {
                run += 1;
            }
            parts.push(match lower {
                'y' => DatePart::Year(run),
                'd' => DatePart::Day(run),
                'h' => DatePart::Hour(run),
                's' => DatePart::Second(run),
                _ => DatePart::Month(run.min(5)),
            });
            i += run;
            continue;
        }

        if lower == 'a' {
            let rest: String = chars[i..].iter().collect::<String>().to_ascii_uppercase();
            if rest.starts_with("AM/PM") {
                parts.push(DatePart::AmPm { short: false });
                i += 5;
                continue;
            }
            if rest.starts_with("A/P") {
                parts.push(DatePart::AmPm { short: true });
                i += 3;
                continue;
            }
        }

        match ch {
            '"' => {
                let mut text = String::new();
                i += 1;
                while i < chars.len() && chars[i] != '"' {
                    text.push(chars[i]);
                    i += 1;
                }
                parts.push(DatePart::Literal(text));
            }
            '\\' => {
                if let Some(next) = chars.get(i + 1) {
                    parts.push(DatePart::Literal(next.to_string()));
                    i += 1;
                }
            }
            '[' => {
                while i < chars.len() && chars[i] != ']' {
                    i += 1;
                }
            }
            '_' | '*' => i += 1,
            _ => parts.push(DatePart::Literal(ch.to_string())),
        }
        i += 1;
    }

    resolve_minutes(&mut parts);
    parts
}

/// `m`/`mm` directly after an hour or directly before a second means minutes.
fn resolve_minutes(parts: &mut [DatePart]) {
    let fields: Vec<usize> = parts
        .iter()
        .enumerate()
        .filter(|(_, p)| !matches!(p, DatePart::Literal(_)))
        .map(|(idx, _)| idx)
        .collect();

    for (pos, &idx) in fields.iter().enumerate() {
        let DatePart::Month(n) = parts[idx] else {
            continue;
        };
        if n > 2 {
            continue;
        }
        let after_hour = pos > 0 && matches!(parts[fields[pos - 1]], DatePart::Hour(_));
        let before_second = fields
            .get(pos + 1)
            .is_some_and(|&next| matches!(parts[next], DatePart::Second(_)));
        if after_hour || before_second {
            parts[idx] = DatePart::Minute(n);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_serial_conversion() {
        assert_eq!(serial_to_datetime(44562.0), Some(dt(2022, 1, 1, 0, 0, 0)));
        assert_eq!(serial_to_datetime(1.0), Some(dt(1900, 1, 1, 0, 0, 0)));
        assert_eq!(serial_to_datetime(44562.5), Some(dt(2022, 1, 1, 12, 0, 0)));
        assert!(serial_to_datetime(-1.0).is_none());
    }

    #[test]
    fn test_serial_round_trip() {
        let value = dt(2023, 7, 14, 18, 30, 0);
        let serial = datetime_to_serial(value);
        assert_eq!(serial_to_datetime(serial), Some(value));
        assert!((datetime_to_serial(dt(1900, 1, 1, 0, 0, 0)) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_is_date_format() {
        assert!(is_date_format("m/d/yy"));
        assert!(is_date_format("yyyy-mm-dd hh:mm:ss"));
        assert!(is_date_format("h:mm AM/PM"));
        assert!(!is_date_format("#,##0.00"));
        assert!(!is_date_format("0.00\"d\""));
        assert!(!is_date_format("[h]:mm"));
        assert!(!is_date_format("General"));
    }

    #[test]
    fn test_format_datetime() {
        let value = dt(2022, 3, 5, 14, 7, 9);
        assert_eq!(format_datetime(value, "m/d/yy"), "3/5/22");
        assert_eq!(format_datetime(value, "yyyy-mm-dd"), "2022-03-05");
        assert_eq!(format_datetime(value, "hh:mm:ss"), "14:07:09");
        assert_eq!(format_datetime(value, "h:mm AM/PM"), "2:07 PM");
        assert_eq!(format_datetime(value, "mmm d, yyyy"), "Mar 5, 2022");
        assert_eq!(format_datetime(value, DEFAULT_DATETIME_FORMAT), "3/5/22 14:07");
    }
}
