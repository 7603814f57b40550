use chrono::{DateTime, FixedOffset, Local, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use strum_macros::{Display, EnumIter};

use crate::util::map::Keyable;

/// 報價欄位
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Field {
    Name,
    Price,
    Change,
    Datetime,
}

impl Field {
    /// Price and change may still be recovered from the URL text fragment.
    pub fn accepts_fragment_hint(&self) -> bool {
        matches!(self, Field::Price | Field::Change)
    }
}

/// Per-URL CSS selectors given in the input file. Blank means "use the defaults".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selectors {
    pub name: Option<String>,
    pub price: Option<String>,
    pub change: Option<String>,
    pub datetime: Option<String>,
}

impl Selectors {
    pub fn get(&self, field: Field) -> Option<&str> {
        let selector = match field {
            Field::Name => &self.name,
            Field::Price => &self.price,
            Field::Change => &self.change,
            Field::Datetime => &self.datetime,
        };

        selector.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// One row of the input list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlEntry {
    pub url: String,
    pub selectors: Selectors,
}

impl UrlEntry {
    pub fn new(url: impl Into<String>) -> Self {
        UrlEntry {
            url: url.into(),
            selectors: Default::default(),
        }
    }

    pub fn with_selectors(url: impl Into<String>, selectors: Selectors) -> Self {
        UrlEntry {
            url: url.into(),
            selectors,
        }
    }

    /// Lower-cased host of the URL, empty when the URL cannot be parsed.
    pub fn host(&self) -> String {
        host_of(&self.url)
    }
}

impl Keyable for UrlEntry {
    fn key(&self) -> String {
        self.url.clone()
    }
}

pub fn host_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_default()
}

/// 欄位值的來源
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
pub enum Source {
    ExplicitSelector,
    SiteDefault,
    FragmentHint,
    PageText,
    None,
}

/// Direction suggested by the styling of the element a value came from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
pub enum Trend {
    Up,
    Down,
}

/// A field value as found on the page, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawField {
    pub value: Option<String>,
    pub source: Source,
    pub trend: Option<Trend>,
}

impl RawField {
    pub fn none() -> Self {
        RawField {
            value: None,
            source: Source::None,
            trend: None,
        }
    }

    pub fn found(value: String, source: Source) -> Self {
        RawField {
            value: Some(value),
            source,
            trend: None,
        }
    }

    pub fn with_trend(mut self, trend: Option<Trend>) -> Self {
        self.trend = trend;
        self
    }

    pub fn is_none(&self) -> bool {
        self.value.is_none()
    }
}

/// The quote's own timestamp. Text without an offset stays local and unspecified.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ObservedAt {
    Zoned(DateTime<FixedOffset>),
    Local(NaiveDateTime),
}

impl ObservedAt {
    pub fn naive_local(&self) -> NaiveDateTime {
        match self {
            ObservedAt::Zoned(dt) => dt.naive_local(),
            ObservedAt::Local(dt) => *dt,
        }
    }
}

impl std::fmt::Display for ObservedAt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObservedAt::Zoned(dt) => write!(f, "{}", dt.to_rfc3339()),
            ObservedAt::Local(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}

impl Serialize for ObservedAt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// 一個網址的擷取結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteRecord {
    pub url: String,
    /// host of the url
    pub source: String,
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub change_pct: Option<Decimal>,
    pub observed_at: Option<ObservedAt>,
    pub screenshot_path: String,
    pub extracted_at: DateTime<Local>,
    /// render failure diagnostic
    pub note: Option<String>,
}

impl QuoteRecord {
    /// A record whose page never rendered: every quote field is left empty.
    pub fn unresolved(url: &str, screenshot_path: String, note: String) -> Self {
        QuoteRecord {
            url: url.to_string(),
            source: host_of(url),
            name: None,
            price: None,
            change_pct: None,
            observed_at: None,
            screenshot_path,
            extracted_at: Local::now(),
            note: Some(note),
        }
    }

    pub fn resolved_fields(&self) -> usize {
        [
            self.name.is_some(),
            self.price.is_some(),
            self.change_pct.is_some(),
            self.observed_at.is_some(),
        ]
        .iter()
        .filter(|x| **x)
        .count()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn test_selectors_blank_means_default() {
        let selectors = Selectors {
            name: Some("  ".to_string()),
            price: Some(" span.last ".to_string()),
            change: None,
            datetime: Some(String::new()),
        };

        assert_eq!(selectors.get(Field::Name), None);
        assert_eq!(selectors.get(Field::Price), Some("span.last"));
        assert_eq!(selectors.get(Field::Change), None);
        assert_eq!(selectors.get(Field::Datetime), None);
    }

    #[test]
    fn test_host() {
        let entry = UrlEntry::new("https://IT.Investing.com/equities/eni");
        assert_eq!(entry.host(), "it.investing.com");
        assert_eq!(host_of("not a url"), "");
    }

    #[test]
    fn test_field_display() {
        assert_eq!(Field::Datetime.to_string(), "datetime");
        assert!(Field::Price.accepts_fragment_hint());
        assert!(!Field::Name.accepts_fragment_hint());
    }

    #[test]
    fn test_observed_at_display() {
        let naive = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        assert_eq!(ObservedAt::Local(naive).to_string(), "2024-01-15T10:30:00");

        let zoned = DateTime::parse_from_rfc3339("2024-01-15T10:30:00+01:00").unwrap();
        assert_eq!(ObservedAt::Zoned(zoned).to_string(), "2024-01-15T10:30:00+01:00");
        assert_eq!(ObservedAt::Zoned(zoned).naive_local(), naive);
    }

    #[test]
    fn test_unresolved_record() {
        let record = QuoteRecord::unresolved(
            "https://www.investing.com/indices/us-spx-500",
            "out/www.investing.com_indices_us-spx-500.png".to_string(),
            "navigation timed out".to_string(),
        );

        assert_eq!(record.source, "www.investing.com");
        assert_eq!(record.resolved_fields(), 0);
        assert_eq!(record.note.as_deref(), Some("navigation timed out"));
    }
}
