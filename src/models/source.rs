//! News source registry entries.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;

/// A watched news page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsSource {
    /// Unique key, also the key in the dedup state document
    pub name: String,

    /// Listing page to poll
    pub url: String,

    /// Display label used in notifications (e.g. "📣 공지")
    pub label: String,
}

impl NewsSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            label: label.into(),
        }
    }

    /// Parsed listing URL, used as the base for relative links.
    pub fn base_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.url)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url() {
        let source = NewsSource::new("공지사항", "https://example.com/News/Notice", "📣 공지");
        assert_eq!(source.base_url().unwrap().host_str(), Some("example.com"));

        let broken = NewsSource::new("x", "not a url", "x");
        assert!(broken.base_url().is_err());
    }
}
