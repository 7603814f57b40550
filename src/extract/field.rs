use crate::{
    declare::{RawField, Trend},
    extract::rules::Rule,
    util::element::Dom,
};

const UP_CLASS_WORDS: &[&str] = &["up", "green", "greenfont", "positive", "gain", "rise"];
const DOWN_CLASS_WORDS: &[&str] = &["down", "red", "redfont", "negative", "loss", "fall"];

/// Tries the CSS rules in order and returns the first non-empty text.
///
/// Rules that are not CSS based are skipped; a selector with no match, or one
/// whose first match is blank, falls through to the next rule.
pub fn extract<D: Dom + ?Sized>(dom: &D, rules: &[Rule]) -> RawField {
    for rule in rules {
        let Some(selector) = rule.css_selector() else {
            continue;
        };

        if let Some(matched) = dom.first_match(selector) {
            if !matched.text.is_empty() {
                return RawField::found(matched.text, rule.source())
                    .with_trend(trend_from_classes(&matched.classes));
            }
        }
    }

    RawField::none()
}

/// Reads the direction a site paints a value with out of its class names,
/// e.g. `greenFont`, `text-negative-main` or `C($c-trend-up)`.
pub fn trend_from_classes(classes: &str) -> Option<Trend> {
    let words: Vec<String> = classes
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();

    let up = words.iter().any(|w| UP_CLASS_WORDS.contains(&w.as_str()));
    let down = words.iter().any(|w| DOWN_CLASS_WORDS.contains(&w.as_str()));

    match (up, down) {
        (true, false) => Some(Trend::Up),
        (false, true) => Some(Trend::Down),
        _ => None,
    }
}
