//! Built-in selectors per site and the rule list resolved for every URL.

use once_cell::sync::Lazy;
use strum::IntoEnumIterator;

use crate::declare::{Field, Source, UrlEntry};

/// Default selectors for one family of hosts.
#[derive(Debug)]
pub struct SiteRuleSet {
    pub name: &'static str,
    /// bare domain; the domain itself and any of its subdomains match
    pub domain: &'static str,
    pub name_selectors: &'static [&'static str],
    pub price_selectors: &'static [&'static str],
    pub change_selectors: &'static [&'static str],
    pub datetime_selectors: &'static [&'static str],
}

impl SiteRuleSet {
    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.');
        host.eq_ignore_ascii_case(self.domain)
            || (host.len() > self.domain.len()
                && host.to_ascii_lowercase().ends_with(&format!(".{}", self.domain)))
    }

    pub fn selectors(&self, field: Field) -> &'static [&'static str] {
        match field {
            Field::Name => self.name_selectors,
            Field::Price => self.price_selectors,
            Field::Change => self.change_selectors,
            Field::Datetime => self.datetime_selectors,
        }
    }
}

/// 已知網站的預設規則，啟動後不會再變動
pub static SITE_RULES: Lazy<Vec<SiteRuleSet>> = Lazy::new(|| {
    vec![SiteRuleSet {
        name: "investing",
        domain: "investing.com",
        name_selectors: &["h1", "div.instrument-header h1", "div.float_lang_base_1 h1"],
        price_selectors: &[
            "span.text-2xl",
            "[data-test='instrument-price-last']",
            "div.instrument-price_instrument-price__3uw25 span",
            "div.tradingViewHtml5 span",
            "div.price span",
        ],
        change_selectors: &[
            "[data-test='instrument-price-change-percent']",
            "[data-test='instrument-price-change']",
            "span.bold.greenFont",
            "span.bold.redFont",
            "span.instrument-price_change-percent__19cas",
        ],
        datetime_selectors: &[
            "time[data-test='instrument-price-last-update-time']",
            "div.u-text-left time",
        ],
    }]
});

/// Returns the rule set whose domain covers `host`.
pub fn site_for_host(host: &str) -> Option<&'static SiteRuleSet> {
    SITE_RULES.iter().find(|site| site.matches_host(host))
}

/// One way of finding a field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// a CSS selector given for this URL in the input file
    Explicit(String),
    /// a built-in selector of a known site
    SiteDefault {
        site: &'static str,
        selector: &'static str,
    },
    /// the `#:~:text=` fragment of the URL
    FragmentHint,
}

impl Rule {
    pub fn css_selector(&self) -> Option<&str> {
        match self {
            Rule::Explicit(selector) => Some(selector.as_str()),
            Rule::SiteDefault { selector, .. } => Some(*selector),
            Rule::FragmentHint => None,
        }
    }

    pub fn source(&self) -> Source {
        match self {
            Rule::Explicit(_) => Source::ExplicitSelector,
            Rule::SiteDefault { .. } => Source::SiteDefault,
            Rule::FragmentHint => Source::FragmentHint,
        }
    }
}

/// Rules for every field, highest priority first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRules {
    pub name: Vec<Rule>,
    pub price: Vec<Rule>,
    pub change: Vec<Rule>,
    pub datetime: Vec<Rule>,
}

impl ResolvedRules {
    pub fn get(&self, field: Field) -> &[Rule] {
        match field {
            Field::Name => &self.name,
            Field::Price => &self.price,
            Field::Change => &self.change,
            Field::Datetime => &self.datetime,
        }
    }

    fn get_mut(&mut self, field: Field) -> &mut Vec<Rule> {
        match field {
            Field::Name => &mut self.name,
            Field::Price => &mut self.price,
            Field::Change => &mut self.change,
            Field::Datetime => &mut self.datetime,
        }
    }
}

/// Resolves the rule list of every field for `entry`: the explicit selector,
/// then the site defaults, then (price and change only) the URL fragment.
pub fn resolve(entry: &UrlEntry) -> ResolvedRules {
    let site = site_for_host(&entry.host());
    let mut rules = ResolvedRules {
        name: Vec::new(),
        price: Vec::new(),
        change: Vec::new(),
        datetime: Vec::new(),
    };

    for field in Field::iter() {
        let list = rules.get_mut(field);

        if let Some(selector) = entry.selectors.get(field) {
            list.push(Rule::Explicit(selector.to_string()));
        }

        if let Some(site) = site {
            list.extend(site.selectors(field).iter().map(|&selector| Rule::SiteDefault {
                site: site.name,
                selector,
            }));
        }

        if field.accepts_fragment_hint() {
            list.push(Rule::FragmentHint);
        }
    }

    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declare::Selectors;

    #[test]
    fn test_matches_host() {
        let site = site_for_host("it.investing.com").unwrap();
        assert_eq!(site.name, "investing");
        assert!(site.matches_host("investing.com"));
        assert!(site.matches_host("WWW.Investing.com"));
        assert!(site_for_host("notinvesting.com").is_none());
        assert!(site_for_host("investing.com.evil.org").is_none());
        assert!(site_for_host("").is_none());
    }

    #[test]
    fn test_resolve_explicit_before_site_default() {
        let entry = UrlEntry::with_selectors(
            "https://it.investing.com/equities/eni",
            Selectors {
                price: Some("span#last".to_string()),
                ..Default::default()
            },
        );
        let rules = resolve(&entry);

        assert_eq!(rules.price[0], Rule::Explicit("span#last".to_string()));
        assert_eq!(
            rules.price[1],
            Rule::SiteDefault {
                site: "investing",
                selector: "span.text-2xl"
            }
        );
        assert_eq!(rules.price.last(), Some(&Rule::FragmentHint));
        assert_eq!(rules.price.len(), 1 + 5 + 1);

        assert_eq!(rules.name[0].source(), Source::SiteDefault);
        assert!(!rules.name.contains(&Rule::FragmentHint));
        assert!(!rules.datetime.contains(&Rule::FragmentHint));
    }

    #[test]
    fn test_resolve_unknown_site() {
        let entry = UrlEntry::with_selectors(
            "https://example.org/quote",
            Selectors {
                name: Some(" h2.title ".to_string()),
                change: Some("".to_string()),
                ..Default::default()
            },
        );
        let rules = resolve(&entry);

        assert_eq!(rules.name, vec![Rule::Explicit("h2.title".to_string())]);
        assert_eq!(rules.price, vec![Rule::FragmentHint]);
        assert_eq!(rules.change, vec![Rule::FragmentHint]);
        assert!(rules.datetime.is_empty());
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let entry = UrlEntry::new("https://www.investing.com/indices/us-spx-500");
        assert_eq!(resolve(&entry), resolve(&entry));
    }
}
