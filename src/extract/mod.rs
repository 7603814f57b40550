//! # 報價擷取
//!
//! 對一個已經渲染完成的頁面，依序嘗試：
//!
//! - 輸入檔中為該網址指定的 CSS selector
//! - 已知網站 (`rules::SITE_RULES`) 的預設 selector
//! - 網址 `#:~:text=` 片段中的文字（僅價格與漲跌幅）
//! - 頁面本文中第一個像價格的數字（僅價格）
//!
//! 每個欄位各自獨立，找不到就留空，不會讓整筆紀錄失敗。

use chrono::Local;
use rust_decimal::Decimal;

use crate::{
    declare::{host_of, Field, ObservedAt, QuoteRecord, RawField, Source, UrlEntry},
    logging,
    util::element::Dom,
};

/// 單一欄位的 CSS 擷取
pub mod field;
/// `#:~:text=` fragment parsing
pub mod fragment;
pub mod normalize;
pub mod rules;

/// 掃描頁面本文的字元上限
const PAGE_TEXT_SCAN_LIMIT: usize = 200_000;

/// Typed quote fields of one page, each with the place it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedQuote {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub change_pct: Option<Decimal>,
    pub observed_at: Option<ObservedAt>,
    pub sources: [(Field, Source); 4],
}

/// Runs resolution, extraction, fragment parsing and normalization for one page.
pub fn extract_quote<D: Dom + ?Sized>(dom: &D, entry: &UrlEntry) -> NormalizedQuote {
    let rules = rules::resolve(entry);
    let hints = fragment::parse_hints(&entry.url);

    let name_raw = field::extract(dom, rules.get(Field::Name));
    let price_raw = field::extract(dom, rules.get(Field::Price));
    let change_raw = field::extract(dom, rules.get(Field::Change));
    let datetime_raw = field::extract(dom, rules.get(Field::Datetime));

    let name = typed(&name_raw, normalize::name);
    let observed_at = typed(&datetime_raw, normalize::observed_at);

    let mut price = typed(&price_raw, normalize::price);
    let mut price_source = source_of(&price, &price_raw);
    if price.is_none() && accepts_hint(&rules, Field::Price) {
        price = normalize::price_from_hints(&hints);
        price_source = source_or_none(&price, Source::FragmentHint);
    }
    if price.is_none() {
        price = normalize::price_from_page_text(&dom.body_text(PAGE_TEXT_SCAN_LIMIT));
        price_source = source_or_none(&price, Source::PageText);
    }

    let mut change_pct = change_raw
        .value
        .as_deref()
        .and_then(|text| normalize::change_pct(text, change_raw.trend));
    let mut change_source = source_of(&change_pct, &change_raw);
    if change_pct.is_none() && accepts_hint(&rules, Field::Change) {
        change_pct = normalize::change_from_hints(&hints);
        change_source = source_or_none(&change_pct, Source::FragmentHint);
    }

    NormalizedQuote {
        sources: [
            (Field::Name, source_of(&name, &name_raw)),
            (Field::Price, price_source),
            (Field::Change, change_source),
            (Field::Datetime, source_of(&observed_at, &datetime_raw)),
        ],
        name,
        price,
        change_pct,
        observed_at,
    }
}

/// Assembles the record of a page that rendered. No cross-field checks: a
/// price without a name is still a valid record.
pub fn build_record(entry: &UrlEntry, quote: NormalizedQuote, screenshot_path: String) -> QuoteRecord {
    let sources = quote
        .sources
        .iter()
        .map(|(field, source)| format!("{}={}", field, source))
        .collect::<Vec<_>>()
        .join(" ");
    logging::debug_file_async(format!("{} sources: {}", entry.url, sources));

    QuoteRecord {
        url: entry.url.clone(),
        source: host_of(&entry.url),
        name: quote.name,
        price: quote.price,
        change_pct: quote.change_pct,
        observed_at: quote.observed_at,
        screenshot_path,
        extracted_at: Local::now(),
        note: None,
    }
}

fn typed<T>(raw: &RawField, normalize: impl Fn(&str) -> Option<T>) -> Option<T> {
    raw.value.as_deref().and_then(normalize)
}

fn accepts_hint(rules: &rules::ResolvedRules, field: Field) -> bool {
    rules.get(field).contains(&rules::Rule::FragmentHint)
}

fn source_of<T>(value: &Option<T>, raw: &RawField) -> Source {
    source_or_none(value, raw.source)
}

fn source_or_none<T>(value: &Option<T>, source: Source) -> Source {
    if value.is_some() {
        source
    } else {
        Source::None
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use scraper::Html;

    use super::*;
    use crate::declare::Selectors;

    const INVESTING_HTML: &str = r#"
        <html><body>
            <div class="instrument-header"><h1>Eni SpA (ENI)</h1></div>
            <div data-test="instrument-price-last">14,386</div>
            <div data-test="instrument-price-change-percent" class="text-negative-main">(0,42%)</div>
            <time data-test="instrument-price-last-update-time">15/01/2024 10:30</time>
            <div id="custom"><b>  Custom Name  </b></div>
        </body></html>
    "#;

    fn source(quote: &NormalizedQuote, field: Field) -> Source {
        quote
            .sources
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, s)| *s)
            .unwrap()
    }

    #[test]
    fn test_site_defaults() {
        let document = Html::parse_document(INVESTING_HTML);
        let entry = UrlEntry::new("https://it.investing.com/equities/eni");

        let quote = extract_quote(&document, &entry);
        assert_eq!(quote.name.as_deref(), Some("Eni SpA (ENI)"));
        assert_eq!(quote.price, Some(dec!(14386)));
        assert_eq!(quote.change_pct, Some(dec!(-0.42)));
        assert_eq!(
            quote.observed_at.map(|o| o.to_string()).as_deref(),
            Some("2024-01-15T10:30:00")
        );
        assert_eq!(source(&quote, Field::Price), Source::SiteDefault);
        assert_eq!(source(&quote, Field::Change), Source::SiteDefault);
    }

    #[test]
    fn test_explicit_selector() {
        let document = Html::parse_document(INVESTING_HTML);
        let entry = UrlEntry::with_selectors(
            "https://it.investing.com/equities/eni",
            Selectors {
                name: Some("#custom b".to_string()),
                ..Default::default()
            },
        );

        let quote = extract_quote(&document, &entry);
        assert_eq!(quote.name.as_deref(), Some("Custom Name"));
        assert_eq!(source(&quote, Field::Name), Source::ExplicitSelector);
    }

    #[test]
    fn test_fragment_hints_when_dom_misses() {
        let document = Html::parse_document("<html><body><h1>Eni</h1></body></html>");
        let entry = UrlEntry::new(
            "https://it.investing.com/equities/eni#:~:text=158%2C75%20(%2B1%2C01%25)",
        );

        let quote = extract_quote(&document, &entry);
        assert_eq!(quote.name.as_deref(), Some("Eni"));
        assert_eq!(quote.price, Some(dec!(158.75)));
        assert_eq!(quote.change_pct, Some(dec!(1.01)));
        assert_eq!(quote.observed_at, None);
        assert_eq!(source(&quote, Field::Price), Source::FragmentHint);
        assert_eq!(source(&quote, Field::Change), Source::FragmentHint);
        assert_eq!(source(&quote, Field::Datetime), Source::None);
    }

    #[test]
    fn test_unparseable_dom_value_falls_back_to_hint() {
        let document = Html::parse_document(
            r#"<html><body><div data-test="instrument-price-last">--</div></body></html>"#,
        );
        let entry = UrlEntry::new("https://www.investing.com/x#:~:text=99%2C10");

        let quote = extract_quote(&document, &entry);
        assert_eq!(quote.price, Some(dec!(99.1)));
        assert_eq!(source(&quote, Field::Price), Source::FragmentHint);
    }

    #[test]
    fn test_page_text_and_nothing() {
        let document =
            Html::parse_document("<html><body><p>Ultimo 1.234,56 EUR</p></body></html>");
        let entry = UrlEntry::new("https://example.org/quote");

        let quote = extract_quote(&document, &entry);
        assert_eq!(quote.price, Some(dec!(1234.56)));
        assert_eq!(source(&quote, Field::Price), Source::PageText);
        assert_eq!(quote.name, None);
        assert_eq!(quote.change_pct, None);

        let empty = Html::parse_document("<html><body></body></html>");
        let quote = extract_quote(&empty, &entry);
        assert_eq!(quote.price, None);
        assert!(quote.sources.iter().all(|(_, s)| *s == Source::None));
    }

    #[test]
    fn test_build_record() {
        let document = Html::parse_document(INVESTING_HTML);
        let entry = UrlEntry::new("https://it.investing.com/equities/eni");
        let quote = extract_quote(&document, &entry);

        let record = build_record(&entry, quote, "out/eni.png".to_string());
        assert_eq!(record.url, entry.url);
        assert_eq!(record.source, "it.investing.com");
        assert_eq!(record.screenshot_path, "out/eni.png");
        assert_eq!(record.resolved_fields(), 4);
        assert_eq!(record.note, None);
    }
}
