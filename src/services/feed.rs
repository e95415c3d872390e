// src/services/feed.rs

//! News feed fetcher.
//!
//! Fetches a source's listing page, pulls anchors out of it and turns the
//! ones that point at articles into a bounded, newest-first list of items.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use scraper::{Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Config, Item, NewsSource};
use crate::utils::http::fetch_text;
use crate::utils::{normalize_whitespace, resolve_url};

/// A link found in page markup, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Visible text of the link
    pub text: String,
    /// Raw `href` value, possibly relative
    pub href: String,
}

impl Anchor {
    pub fn new(text: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            href: href.into(),
        }
    }
}

/// Turns raw page text into ordered `(text, href)` pairs.
pub trait MarkupExtractor: Send + Sync {
    fn extract_anchors(&self, html: &str) -> Result<Vec<Anchor>>;
}

/// Retrieves raw page text.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String>;
}

/// [`MarkupExtractor`] that selects every `a[href]` with `scraper`.
pub struct AnchorExtractor {
    selector: Selector,
}

impl AnchorExtractor {
    pub fn new() -> Result<Self> {
        Self::with_selector("a[href]")
    }

    /// Use a narrower selector, e.g. to skip navigation menus.
    pub fn with_selector(selector: &str) -> Result<Self> {
        let selector =
            Selector::parse(selector).map_err(|e| AppError::selector(selector, format!("{e:?}")))?;
        Ok(Self { selector })
    }
}

impl MarkupExtractor for AnchorExtractor {
    fn extract_anchors(&self, html: &str) -> Result<Vec<Anchor>> {
        let document = Html::parse_document(html);
        let anchors = document
            .select(&self.selector)
            .filter_map(|a| {
                let href = a.value().attr("href")?;
                let text: String = a.text().collect();
                Some(Anchor::new(normalize_whitespace(&text), href))
            })
            .collect();
        Ok(anchors)
    }
}

/// [`PageFetcher`] backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String> {
        fetch_text(&self.client, url, timeout).await
    }
}

/// Service turning news sources into candidate items.
pub struct FeedFetcher {
    pages: Arc<dyn PageFetcher>,
    extractor: Arc<dyn MarkupExtractor>,
    link_patterns: Vec<String>,
    timeout: Duration,
    limit: usize,
    concurrency: usize,
}

impl FeedFetcher {
    /// Create a feed fetcher with the crawler and poller settings from `config`.
    pub fn new(
        pages: Arc<dyn PageFetcher>,
        extractor: Arc<dyn MarkupExtractor>,
        config: &Config,
    ) -> Self {
        Self {
            pages,
            extractor,
            link_patterns: config.crawler.link_patterns.clone(),
            timeout: Duration::from_secs(config.crawler.timeout_secs),
            limit: config.poller.fetch_limit,
            concurrency: config.crawler.max_concurrent.max(1),
        }
    }

    /// Fetch the newest items of one source.
    ///
    /// Any fetch or extraction failure is logged and yields an empty list;
    /// there is no retry within a cycle.
    pub async fn fetch_latest(&self, source: &NewsSource) -> Vec<Item> {
        match self.try_fetch(source).await {
            Ok(items) => {
                log::debug!("[news] {}: {} candidate item(s)", source.name, items.len());
                items
            }
            Err(e) if e.is_fetch_error() => {
                log::warn!("[news] {} fetch failed: {}", source.name, e);
                Vec::new()
            }
            Err(e) => {
                log::error!("[news] {} unexpected failure: {}", source.name, e);
                Vec::new()
            }
        }
    }

    /// Fetch every source concurrently. Results keep the order of `sources`.
    pub async fn fetch_all<'a>(
        &self,
        sources: &'a [NewsSource],
    ) -> Vec<(&'a NewsSource, Vec<Item>)> {
        let fetches: Vec<_> = sources
            .iter()
            .map(|source| async move { (source, self.fetch_latest(source).await) })
            .collect();
        stream::iter(fetches)
            .buffered(self.concurrency)
            .collect()
            .await
    }

    /// Fetch one source, surfacing errors instead of swallowing them.
    pub async fn try_fetch(&self, source: &NewsSource) -> Result<Vec<Item>> {
        let base = source.base_url()?;
        let html = self.pages.fetch(&source.url, self.timeout).await?;
        let anchors = self.extractor.extract_anchors(&html)?;
        Ok(self.select_items(&base, anchors))
    }

    /// Filter, normalize, dedup and bound extracted anchors.
    pub fn select_items(&self, base: &Url, anchors: Vec<Anchor>) -> Vec<Item> {
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        for anchor in anchors {
            if items.len() >= self.limit {
                break;
            }

            let title = normalize_whitespace(&anchor.text);
            if title.is_empty() {
                continue;
            }

            let Some(mut link) = resolve_url(base, &anchor.href) else {
                continue;
            };
            link.set_fragment(None);
            if !self.is_article_link(base, &link) {
                continue;
            }

            let item = Item::new(title, link.to_string());
            if seen.insert(item.id.clone()) {
                items.push(item);
            }
        }

        items
    }

    fn is_article_link(&self, base: &Url, link: &Url) -> bool {
        matches!(link.scheme(), "http" | "https")
            && link.host_str() == base.host_str()
            && link.as_str() != base.as_str()
            && self
                .link_patterns
                .iter()
                .any(|pattern| link.as_str().contains(pattern.as_str()))
    }
}
