//! Raw page text to typed quote values. Every function answers `None` instead
//! of failing, so one bad field never spoils the rest of a record.

use chrono::{DateTime, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;

use crate::{
    declare::{ObservedAt, Trend},
    util::text,
};

const PLUS_SIGNS: &[char] = &['+'];
const MINUS_SIGNS: &[char] = &['-', '−', '–'];
const UP_ARROWS: &[char] = &['▲', '↑', '⬆', '△', '▴'];
const DOWN_ARROWS: &[char] = &['▼', '↓', '⬇', '▽', '▾'];

/// Offset-less layouts tried in order after RFC 3339.
const LOCAL_DATETIME_PATTERNS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

lazy_static! {
    static ref PERCENT_RE: Regex = Regex::new(r"((?:\d|[.,]\d)[\d.,]*)\s*%").unwrap();
    static ref DECIMAL_IN_TEXT_RE: Regex = Regex::new(r"(\d[\d.,]*[.,]\d{1,4})(\s*%)?").unwrap();
    static ref PAGE_PRICE_RE: Regex = Regex::new(r"\b(\d{1,3}(?:\.\d{3})*,\d{2})\b").unwrap();
}

/// 名稱只去除前後空白
pub fn name(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn price(text: &str) -> Option<Decimal> {
    text::parse_decimal(text).ok()
}

/// Signed percentage change.
///
/// With a `%` in the text the number right before the first `%` is used, so
/// `+1,01 (+0,64%)` gives `0.64`. The sign comes from a `+`/`-` written right
/// before that number, else from an arrow glyph anywhere in the text, else
/// from `trend`.
pub fn change_pct(text: &str, trend: Option<Trend>) -> Option<Decimal> {
    let text = text.trim();

    let (prefix, number) = match PERCENT_RE.captures(text) {
        Some(caps) => {
            let m = caps.get(1)?;
            (&text[..m.start()], m.as_str())
        }
        None => (&text[..number_start(text)?], text),
    };

    let value = text::parse_decimal(number).ok()?.abs();
    let negative = match written_sign(prefix).or_else(|| arrow_sign(text)).or(trend) {
        Some(Trend::Down) => true,
        Some(Trend::Up) | None => false,
    };

    Some(if negative { -value } else { value })
}

/// Byte offset of the first digit, or of the separator right before it (`-.42`).
fn number_start(text: &str) -> Option<usize> {
    let first_digit = text.find(|c: char| c.is_ascii_digit())?;
    match text[..first_digit].chars().last() {
        Some(c @ ('.' | ',')) => Some(first_digit - c.len_utf8()),
        _ => Some(first_digit),
    }
}

fn written_sign(prefix: &str) -> Option<Trend> {
    let last = prefix.trim_end().chars().last()?;
    if PLUS_SIGNS.contains(&last) {
        Some(Trend::Up)
    } else if MINUS_SIGNS.contains(&last) {
        Some(Trend::Down)
    } else {
        None
    }
}

fn arrow_sign(text: &str) -> Option<Trend> {
    text.chars().find_map(|c| {
        if UP_ARROWS.contains(&c) {
            Some(Trend::Up)
        } else if DOWN_ARROWS.contains(&c) {
            Some(Trend::Down)
        } else {
            None
        }
    })
}

/// The first layout that matches the whole text wins; text without an offset
/// is kept as an unspecified local time.
pub fn observed_at(text: &str) -> Option<ObservedAt> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(ObservedAt::Zoned(dt));
    }

    LOCAL_DATETIME_PATTERNS
        .iter()
        .find_map(|pattern| NaiveDateTime::parse_from_str(text, pattern).ok())
        .map(ObservedAt::Local)
}

/// First decimal-looking number in the hints that is not a percentage.
pub fn price_from_hints(hints: &[String]) -> Option<Decimal> {
    hints.iter().find_map(|hint| {
        DECIMAL_IN_TEXT_RE
            .captures_iter(hint)
            .filter(|caps| caps.get(2).is_none())
            .find_map(|caps| price(&caps[1]))
    })
}

/// First percentage found in the hints.
pub fn change_from_hints(hints: &[String]) -> Option<Decimal> {
    hints
        .iter()
        .filter(|hint| hint.contains('%'))
        .find_map(|hint| change_pct(hint, None))
}

/// Scans page text for a `1.234,56` style amount.
pub fn price_from_page_text(text: &str) -> Option<Decimal> {
    PAGE_PRICE_RE
        .captures(text)
        .and_then(|caps| price(&caps[1]))
}
