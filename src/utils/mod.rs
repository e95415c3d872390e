//! Utility functions and helpers.

pub mod http;

use unicode_segmentation::UnicodeSegmentation;
use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> Option<Url> {
    base.join(href.trim()).ok()
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep the last `max` grapheme clusters of `s`.
pub fn tail_graphemes(s: &str, max: usize) -> &str {
    let total = s.graphemes(true).count();
    if total <= max {
        return s;
    }
    let skip = total - max;
    match s.grapheme_indices(true).nth(skip) {
        Some((idx, _)) => &s[idx..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://example.com/News/Notice").unwrap();
        assert_eq!(
            resolve_url(&base, "/News/Notice/12").unwrap().as_str(),
            "https://example.com/News/Notice/12"
        );
        assert_eq!(
            resolve_url(&base, "https://other.com/x").unwrap().as_str(),
            "https://other.com/x"
        );
        assert_eq!(
            resolve_url(&base, " Notice/3 ").unwrap().as_str(),
            "https://example.com/News/Notice/3"
        );
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  점검\n\t 안내  "), "점검 안내");
        assert_eq!(normalize_whitespace("   "), "");
    }

    #[test]
    fn test_tail_graphemes() {
        assert_eq!(tail_graphemes("abcdef", 3), "def");
        assert_eq!(tail_graphemes("abc", 10), "abc");
        assert_eq!(tail_graphemes("가나다라", 2), "다라");
        assert_eq!(tail_graphemes("abc", 0), "");
    }
}
