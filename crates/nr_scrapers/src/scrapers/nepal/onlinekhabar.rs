use std::time::Duration;

use async_trait::async_trait;
use nr_core::{ArticleDetails, ListingEntry, Result};
use scraper::Html;
use tracing::debug;
use url::Url;

use crate::scrapers::utils;
use crate::scrapers::{Scraper, SourceMetadata, USER_AGENT};

const LISTING_BLOCK: &str = ".ok-bises";
const LISTING_ANCHOR: &str = "h2 > a";
const HERO_IMAGE: &str = ".ok-post-detail-featured-img img";
const BODY_PARAGRAPHS: &str = ".ok18-single-post-content-wrap p";

#[derive(Debug, Clone)]
pub struct OnlineKhabarScraper {
    client: reqwest::Client,
    base_url: Url,
}

impl OnlineKhabarScraper {
    const BASE_URL: &'static str = "https://www.onlinekhabar.com";

    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: Url::parse(Self::BASE_URL).expect("static base URL is valid"),
        }
    }

    /// Pull the headline anchors out of the front page.
    pub fn parse_listing(&self, html: &str) -> Result<Vec<ListingEntry>> {
        let document = Html::parse_document(html);
        let block = utils::selector(LISTING_BLOCK)?;
        let anchor = utils::selector(LISTING_ANCHOR)?;

        let mut entries = Vec::new();
        for item in document.select(&block) {
            let Some(link) = item.select(&anchor).next() else {
                continue;
            };
            let Some(href) = link.value().attr("href").filter(|h| !h.trim().is_empty()) else {
                continue;
            };
            entries.push(ListingEntry {
                title: utils::element_text(&link),
                link: utils::resolve_link(&self.base_url, href.trim())?,
            });
        }
        Ok(entries)
    }

    pub fn parse_article(&self, html: &str) -> Result<ArticleDetails> {
        let document = Html::parse_document(html);
        let image_url = utils::extract_attr(&document, HERO_IMAGE, "src")?
            .map(|src| utils::resolve_link(&self.base_url, &src))
            .transpose()?;
        let paragraphs = utils::extract_texts(&document, BODY_PARAGRAPHS)?;
        Ok(ArticleDetails { image_url, paragraphs })
    }
}

impl Default for OnlineKhabarScraper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scraper for OnlineKhabarScraper {
    fn source_metadata(&self) -> SourceMetadata {
        SourceMetadata {
            name: "Online Khabar",
            base_url: Self::BASE_URL,
            language: "ne",
        }
    }

    fn can_handle(&self, url: &str) -> bool {
        url.contains("onlinekhabar.com")
    }

    async fn get_article_urls(&self) -> Result<Vec<ListingEntry>> {
        let html = utils::fetch_text(&self.client, self.base_url.as_str()).await?;
        let entries = self.parse_listing(&html)?;
        debug!("{} listing entries on {}", entries.len(), self.base_url);
        Ok(entries)
    }

    async fn scrape_article(&self, url: &str) -> Result<ArticleDetails> {
        let html = utils::fetch_text(&self.client, url).await?;
        self.parse_article(&html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
          <div class="ok-bises">
            <h2><a href="https://www.onlinekhabar.com/2024/05/100">  पहिलो समाचार </a></h2>
          </div>
          <div class="ok-bises">
            <h2><a href="/2024/05/101">दोस्रो समाचार</a></h2>
          </div>
          <div class="ok-bises">
            <h2><a>No link</a></h2>
          </div>
          <div class="ok-bises"><p>No heading at all</p></div>
          <div class="other"><h2><a href="/ignored">Ignored</a></h2></div>
        </body></html>
    "#;

    const ARTICLE: &str = r#"
        <html><body>
          <div class="ok-post-detail-featured-img">
            <img src="https://www.onlinekhabar.com/wp-content/uploads/hero.jpg">
          </div>
          <div class="ok18-single-post-content-wrap">
            <p> पहिलो अनुच्छेद </p>
            <p>दोस्रो अनुच्छेद</p>
          </div>
          <p>Footer text</p>
        </body></html>
    "#;

    #[test]
    fn test_can_handle() {
        let scraper = OnlineKhabarScraper::new();
        assert!(scraper.can_handle("https://www.onlinekhabar.com/2024/05/100"));
        assert!(!scraper.can_handle("https://www.clarin.com/article"));
    }

    #[test]
    fn test_parse_listing() {
        let scraper = OnlineKhabarScraper::new();
        let entries = scraper.parse_listing(LISTING).unwrap();
        assert_eq!(
            entries,
            vec![
                ListingEntry {
                    title: "पहिलो समाचार".to_string(),
                    link: "https://www.onlinekhabar.com/2024/05/100".to_string(),
                },
                ListingEntry {
                    title: "दोस्रो समाचार".to_string(),
                    link: "https://www.onlinekhabar.com/2024/05/101".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_parse_article() {
        let scraper = OnlineKhabarScraper::new();
        let details = scraper.parse_article(ARTICLE).unwrap();
        assert_eq!(
            details.image_url.as_deref(),
            Some("https://www.onlinekhabar.com/wp-content/uploads/hero.jpg")
        );
        assert_eq!(details.paragraphs, vec!["पहिलो अनुच्छेद", "दोस्रो अनुच्छेद"]);
        assert_eq!(details.body(), "पहिलो अनुच्छेद\nदोस्रो अनुच्छेद");
    }

    #[test]
    fn test_parse_article_without_image() {
        let scraper = OnlineKhabarScraper::new();
        let details = scraper.parse_article("<html><body><p>x</p></body></html>").unwrap();
        assert!(details.image_url.is_none());
        assert!(details.paragraphs.is_empty());
    }
}
