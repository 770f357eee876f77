use std::sync::Arc;

use async_trait::async_trait;
use nr_core::{ArticleDetails, ListingEntry, Result};

pub mod nepal;

use nepal::OnlineKhabarScraper;

/// Desktop browser agent; the listing pages serve a stripped page to unknown clients.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceMetadata {
    pub name: &'static str,
    pub base_url: &'static str,
    pub language: &'static str,
}

#[async_trait]
pub trait Scraper: Send + Sync {
    fn source_metadata(&self) -> SourceMetadata;

    /// Returns true if this scraper can handle the given URL
    fn can_handle(&self, url: &str) -> bool;

    /// Returns the article anchors found on the listing page
    async fn get_article_urls(&self) -> Result<Vec<ListingEntry>>;

    /// Fetches one article page and extracts its body and hero image
    async fn scrape_article(&self, url: &str) -> Result<ArticleDetails>;
}

pub fn get_scrapers() -> Vec<Arc<dyn Scraper>> {
    vec![Arc::new(OnlineKhabarScraper::new())]
}

/// Common utilities for scrapers
pub(crate) mod utils {
    use nr_core::{Error, Result};
    use scraper::{ElementRef, Html, Selector};
    use url::Url;

    pub fn selector(css: &str) -> Result<Selector> {
        Selector::parse(css).map_err(|e| Error::Scraping(format!("Invalid selector '{}': {}", css, e)))
    }

    pub fn element_text(element: &ElementRef<'_>) -> String {
        element.text().collect::<String>().trim().to_string()
    }

    pub fn extract_texts(document: &Html, css: &str) -> Result<Vec<String>> {
        let selector = selector(css)?;
        Ok(document.select(&selector).map(|el| element_text(&el)).collect())
    }

    pub fn extract_attr(document: &Html, css: &str, attr: &str) -> Result<Option<String>> {
        let selector = selector(css)?;
        Ok(document
            .select(&selector)
            .next()
            .and_then(|el| el.value().attr(attr))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }

    /// Absolute hrefs pass through, anything else is joined onto `base`.
    pub fn resolve_link(base: &Url, href: &str) -> Result<String> {
        if href.starts_with("http://") || href.starts_with("https://") {
            return Ok(href.to_string());
        }
        Ok(base.join(href)?.to_string())
    }

    /// Raw page body. Parse it after the last await: `Html` is not `Send`.
    pub async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String> {
        Ok(client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?)
    }
}
