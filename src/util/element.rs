use scraper::{ElementRef, Html, Selector};

use crate::logging;

/// How many ancestors of a matched element are searched for class names.
const CLASS_ANCESTOR_DEPTH: usize = 2;

/// The first element matched by a selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matched {
    /// trimmed text content
    pub text: String,
    /// class attributes of the element and its closest ancestors, space separated
    pub classes: String,
}

/// Read access to a rendered page.
pub trait Dom {
    /// Returns the first element in document order matched by `css_selector`.
    /// An invalid selector matches nothing.
    fn first_match(&self, css_selector: &str) -> Option<Matched>;

    /// The visible text of `<body>`, at most `limit` characters.
    fn body_text(&self, limit: usize) -> String;
}

impl Dom for Html {
    fn first_match(&self, css_selector: &str) -> Option<Matched> {
        let selector = match Selector::parse(css_selector) {
            Ok(s) => s,
            Err(why) => {
                logging::debug_file_async(format!(
                    "Failed to Selector::parse({}) because: {:?}",
                    css_selector, why
                ));
                return None;
            }
        };

        self.select(&selector).next().map(|element| Matched {
            text: element_text(&element),
            classes: element_classes(&element),
        })
    }

    fn body_text(&self, limit: usize) -> String {
        let Ok(selector) = Selector::parse("body") else {
            return String::new();
        };

        self.select(&selector)
            .next()
            .map(|body| {
                // 每個文字節點之間補一個空白，避免相鄰元素的字黏在一起
                body.text()
                    .flat_map(|t| t.chars().chain(std::iter::once(' ')))
                    .take(limit)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn element_classes(element: &ElementRef) -> String {
    std::iter::once(*element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .take(1 + CLASS_ANCESTOR_DEPTH)
        .filter_map(|e| e.value().attr("class"))
        .collect::<Vec<_>>()
        .join(" ")
}
