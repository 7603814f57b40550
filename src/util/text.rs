use std::str::FromStr;

use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;

const DECIMAL_SEPARATORS: [char; 2] = ['.', ','];
const MINUS_SIGNS: [char; 3] = ['-', '−', '–'];
/// 檔名的長度上限
const MAX_FILE_STEM_LEN: usize = 180;

lazy_static! {
    static ref UNSAFE_FILE_CHARS: Regex = Regex::new(r"[^\w.-]+").unwrap();
}

/// Parses a number written with either `.` or `,` as the decimal separator.
///
/// Everything except digits and separators is dropped first (currency symbols,
/// spaces, apostrophes used for grouping); a minus sign before the first digit
/// makes the value negative. The separator that occurs last decides the
/// locale: when that character occurs exactly once and is followed by one or
/// two digits at the end, it is the decimal point and every other separator is
/// grouping. Otherwise `,` is grouping, a single `.` is the decimal point and
/// repeated `.` are grouping too.
///
/// ```text
/// assert_eq!(parse_decimal("1.234,56").unwrap(), dec!(1234.56));
/// assert_eq!(parse_decimal("$1,234.56").unwrap(), dec!(1234.56));
/// assert_eq!(parse_decimal("1.234").unwrap(), dec!(1.234));
/// ```
pub fn parse_decimal(s: &str) -> Result<Decimal> {
    let mut negative = false;
    let mut body = String::with_capacity(s.len());

    for c in s.chars() {
        if c.is_ascii_digit() || DECIMAL_SEPARATORS.contains(&c) {
            body.push(c);
        } else if MINUS_SIGNS.contains(&c) && !body.chars().any(|b| b.is_ascii_digit()) {
            negative = true;
        }
    }

    if !body.chars().any(|c| c.is_ascii_digit()) {
        return Err(anyhow!("There is no digit in '{}'", s));
    }

    let body = body.trim_end_matches(DECIMAL_SEPARATORS);
    // ".75" 與 ",50" 省略了整數位的 0
    let body = match body.find(|c: char| c.is_ascii_digit()) {
        Some(0) => body.to_string(),
        Some(first_digit) => format!("0{}{}", &body[first_digit - 1..first_digit], &body[first_digit..]),
        None => body.to_string(),
    };
    let mut number = normalize_separators(&body);
    if negative {
        number.insert(0, '-');
    }

    Decimal::from_str(&number)
        .map(|d| d.normalize())
        .map_err(|why| anyhow!("Failed to parse '{}' as Decimal because {:?}", s, why))
}

/// `body` holds only ASCII digits and separators and neither starts nor ends
/// with a separator.
fn normalize_separators(body: &str) -> String {
    let Some(idx) = body.rfind(DECIMAL_SEPARATORS) else {
        return body.to_string();
    };

    let sep = &body[idx..idx + 1];
    let fraction = &body[idx + 1..];

    if body.matches(sep).count() == 1 && (1..=2).contains(&fraction.len()) {
        let integer: String = body[..idx].chars().filter(char::is_ascii_digit).collect();
        return format!("{}.{}", integer, fraction);
    }

    let grouped = body.replace(',', "");
    if grouped.matches('.').count() > 1 {
        grouped.replace('.', "")
    } else {
        grouped
    }
}

/// Turns an arbitrary string into something usable as a file name:
/// runs of characters outside `[\w.-]` become `_`.
pub fn sanitize(name: &str) -> String {
    let replaced = UNSAFE_FILE_CHARS.replace_all(name, "_");
    replaced
        .trim_matches('_')
        .chars()
        .take(MAX_FILE_STEM_LEN)
        .collect()
}
