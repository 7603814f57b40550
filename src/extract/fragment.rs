//! Text fragment directives, e.g.
//! `https://host/page#:~:text=prefix-,start,end,-suffix`.

const DIRECTIVE_DELIMITER: &str = ":~:";
const TEXT_DIRECTIVE: &str = "text=";

/// Decoded `start` (and `end` when a range was given) of the first text
/// directive in `url`. Prefix and suffix context terms are dropped. An absent
/// or malformed directive gives an empty list.
pub fn parse_hints(url: &str) -> Vec<String> {
    let Some((_, fragment)) = url.split_once('#') else {
        return Vec::new();
    };

    let Some((_, directives)) = fragment.split_once(DIRECTIVE_DELIMITER) else {
        return Vec::new();
    };

    directives
        .split('&')
        .find_map(|directive| directive.strip_prefix(TEXT_DIRECTIVE))
        .and_then(parse_text_directive)
        .unwrap_or_default()
}

fn parse_text_directive(value: &str) -> Option<Vec<String>> {
    let mut terms: Vec<&str> = value.split(',').collect();

    if terms.len() > 1 && terms.first().is_some_and(|t| t.ends_with('-')) {
        terms.remove(0);
    }

    if terms.len() > 1 && terms.last().is_some_and(|t| t.starts_with('-')) {
        terms.pop();
    }

    if terms.is_empty() || terms.len() > 2 {
        return None;
    }

    terms
        .into_iter()
        .map(|term| {
            let decoded = urlencoding::decode(term).ok()?;
            let decoded = decoded.trim();
            if decoded.is_empty() {
                None
            } else {
                Some(decoded.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_term() {
        let url = "https://it.investing.com/equities/eni#:~:text=158%2C75%20(%2B1%2C01%25)";
        assert_eq!(parse_hints(url), vec!["158,75 (+1,01%)".to_string()]);
    }

    #[test]
    fn test_range_with_prefix_and_suffix() {
        let url = "https://example.org/q#:~:text=Last-,12%2C50,%2B0%2C40%25,-today";
        assert_eq!(
            parse_hints(url),
            vec!["12,50".to_string(), "+0,40%".to_string()]
        );
    }

    #[test]
    fn test_fragment_before_directive_and_other_directives() {
        let url = "https://example.org/q#section:~:note=x&text=Price%3A%2099.10";
        assert_eq!(parse_hints(url), vec!["Price: 99.10".to_string()]);
    }

    #[test]
    fn test_absent_or_malformed() {
        assert!(parse_hints("https://example.org/q").is_empty());
        assert!(parse_hints("https://example.org/q#top").is_empty());
        assert!(parse_hints("https://example.org/q#:~:text=").is_empty());
        assert!(parse_hints("https://example.org/q#:~:text=a,b,c").is_empty());
        assert!(parse_hints("https://example.org/q#:~:text=a,,").is_empty());
        assert!(parse_hints("https://example.org/q#:~:text=%FF%FE").is_empty());
        assert!(parse_hints("https://example.org/q#:~:note=1").is_empty());
    }

    #[test]
    fn test_parse_is_pure() {
        let url = "https://example.org/q#:~:text=1.234,56";
        assert_eq!(parse_hints(url), parse_hints(url));
        assert_eq!(parse_hints(url), vec!["1.234".to_string(), "56".to_string()]);
    }
}
