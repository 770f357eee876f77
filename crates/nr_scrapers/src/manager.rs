use std::collections::HashSet;
use std::sync::Arc;

use nr_core::{Article, ArticleStorage, ListingEntry, NewArticle, Paraphraser, Result};
use nr_inference::paraphrase_or_original;
use tracing::{debug, error, info, warn};

use crate::scrapers::{get_scrapers, Scraper};

pub const DEFAULT_INSTRUCTION: &str = "Summarize in Nepali, under 200 characters.";

#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Appended on its own line after the article body before paraphrasing
    pub instruction: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            instruction: DEFAULT_INSTRUCTION.to_string(),
        }
    }
}

pub struct ScraperManager {
    storage: Arc<dyn ArticleStorage>,
    paraphraser: Arc<dyn Paraphraser>,
    scrapers: Vec<Arc<dyn Scraper>>,
    config: ManagerConfig,
}

impl ScraperManager {
    pub fn new(storage: Arc<dyn ArticleStorage>, paraphraser: Arc<dyn Paraphraser>, config: ManagerConfig) -> Self {
        Self {
            storage,
            paraphraser,
            scrapers: Vec::new(),
            config,
        }
    }

    /// Manager preloaded with every built-in scraper.
    pub fn with_default_scrapers(
        storage: Arc<dyn ArticleStorage>,
        paraphraser: Arc<dyn Paraphraser>,
        config: ManagerConfig,
    ) -> Self {
        let mut manager = Self::new(storage, paraphraser, config);
        for scraper in get_scrapers() {
            manager.add_scraper(scraper);
        }
        manager
    }

    pub fn add_scraper(&mut self, scraper: Arc<dyn Scraper>) {
        self.scrapers.push(scraper);
    }

    pub fn scrapers(&self) -> &[Arc<dyn Scraper>] {
        &self.scrapers
    }

    pub fn storage(&self) -> &Arc<dyn ArticleStorage> {
        &self.storage
    }

    fn build_prompt(&self, body: &str) -> String {
        format!("{}\n{}", body, self.config.instruction)
    }

    /// Walk every listing, store the articles not seen before and return the
    /// full set currently on the listings (stored ones included).
    ///
    /// A listing that cannot be fetched fails the pass; a single article that
    /// cannot be fetched or stored is logged and skipped.
    pub async fn scrape_and_process(&self) -> Result<Vec<Article>> {
        let mut current = Vec::new();

        for scraper in &self.scrapers {
            let meta = scraper.source_metadata();
            let entries = scraper.get_article_urls().await?;
            info!("📰 {} listing entries on {}", entries.len(), meta.name);

            for entry in entries {
                if let Some(existing) = self.storage.find_by_link(&entry.link).await? {
                    debug!("⏭️ Already stored: {}", entry.link);
                    current.push(existing);
                    continue;
                }

                match self.process_entry(scraper.as_ref(), &entry).await {
                    Ok(article) => {
                        info!("🆕 {} - {}", article.title, article.link);
                        current.push(article);
                    }
                    Err(e) => error!("Failed to scrape {}: {}", entry.link, e),
                }
            }
        }

        Ok(current)
    }

    async fn process_entry(&self, scraper: &dyn Scraper, entry: &ListingEntry) -> Result<Article> {
        let details = scraper.scrape_article(&entry.link).await?;
        let prompt = self.build_prompt(&details.body());
        let content = paraphrase_or_original(self.paraphraser.as_ref(), &prompt).await;

        self.storage
            .insert_article(&NewArticle {
                title: entry.title.clone(),
                link: entry.link.clone(),
                image_url: details.image_url,
                content,
            })
            .await
    }

    /// Delete stored articles whose link is not part of `current`.
    pub async fn cleanup_old_articles(&self, current: &[Article]) -> Result<usize> {
        let stored = self.storage.list_articles().await?;
        let stale = stale_article_ids(&stored, current);
        if stale.is_empty() {
            return Ok(0);
        }

        let deleted = self.storage.delete_articles(&stale).await?;
        if deleted as usize != stale.len() {
            warn!("Expected to delete {} articles, store reported {}", stale.len(), deleted);
        }
        info!("🧹 Deleted {} old articles", stale.len());
        Ok(stale.len())
    }
}

/// Ids of `stored` articles whose link is absent from `current`.
pub fn stale_article_ids(stored: &[Article], current: &[Article]) -> Vec<i64> {
    let live: HashSet<&str> = current.iter().map(|a| a.link.as_str()).collect();
    stored
        .iter()
        .filter(|a| !live.contains(a.link.as_str()))
        .map(|a| a.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use nr_core::{ArticleDetails, Error};
    use nr_storage::InMemoryStorage;
    use std::sync::Mutex;

    use crate::scrapers::SourceMetadata;

    struct MockScraper {
        listing: Vec<ListingEntry>,
        fetched: Mutex<Vec<String>>,
        broken_link: Option<String>,
    }

    impl MockScraper {
        fn new(links: &[&str]) -> Self {
            Self {
                listing: links
                    .iter()
                    .map(|l| ListingEntry {
                        title: format!("Title for {}", l),
                        link: l.to_string(),
                    })
                    .collect(),
                fetched: Mutex::new(Vec::new()),
                broken_link: None,
            }
        }
    }

    #[async_trait]
    impl Scraper for MockScraper {
        fn source_metadata(&self) -> SourceMetadata {
            SourceMetadata {
                name: "Mock",
                base_url: "https://mock.test",
                language: "en",
            }
        }

        fn can_handle(&self, url: &str) -> bool {
            url.contains("mock.test")
        }

        async fn get_article_urls(&self) -> Result<Vec<ListingEntry>> {
            Ok(self.listing.clone())
        }

        async fn scrape_article(&self, url: &str) -> Result<ArticleDetails> {
            if self.broken_link.as_deref() == Some(url) {
                return Err(Error::Scraping("boom".to_string()));
            }
            self.fetched.lock().unwrap().push(url.to_string());
            Ok(ArticleDetails {
                image_url: Some(format!("{}/hero.jpg", url)),
                paragraphs: vec!["first".to_string(), "second".to_string()],
            })
        }
    }

    struct FailingListing;

    #[async_trait]
    impl Scraper for FailingListing {
        fn source_metadata(&self) -> SourceMetadata {
            SourceMetadata {
                name: "Down",
                base_url: "https://down.test",
                language: "en",
            }
        }

        fn can_handle(&self, _url: &str) -> bool {
            false
        }

        async fn get_article_urls(&self) -> Result<Vec<ListingEntry>> {
            Err(Error::Scraping("listing unavailable".to_string()))
        }

        async fn scrape_article(&self, _url: &str) -> Result<ArticleDetails> {
            unreachable!()
        }
    }

    struct EchoParaphraser;

    #[async_trait]
    impl Paraphraser for EchoParaphraser {
        fn name(&self) -> &str {
            "echo"
        }

        async fn paraphrase(&self, text: &str) -> Result<String> {
            Ok(format!("summary of [{}]", text))
        }
    }

    struct DownParaphraser;

    #[async_trait]
    impl Paraphraser for DownParaphraser {
        fn name(&self) -> &str {
            "down"
        }

        async fn paraphrase(&self, _text: &str) -> Result<String> {
            Err(Error::Paraphrase("timeout".to_string()))
        }
    }

    fn article(id: i64, link: &str) -> Article {
        Article {
            id,
            title: "t".to_string(),
            link: link.to_string(),
            image_url: None,
            content: "c".to_string(),
            video_generation: false,
            processed_at: None,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_new_articles_are_paraphrased_and_stored() {
        let storage = Arc::new(InMemoryStorage::new());
        let mut manager = ScraperManager::new(storage.clone(), Arc::new(EchoParaphraser), ManagerConfig::default());
        manager.add_scraper(Arc::new(MockScraper::new(&["https://mock.test/1"])));

        let current = manager.scrape_and_process().await.unwrap();
        assert_eq!(current.len(), 1);
        let stored = storage.find_by_link("https://mock.test/1").await.unwrap().unwrap();
        assert_eq!(
            stored.content,
            format!("summary of [first\nsecond\n{}]", DEFAULT_INSTRUCTION)
        );
        assert_eq!(stored.image_url.as_deref(), Some("https://mock.test/1/hero.jpg"));
        assert!(!stored.video_generation);
    }

    #[tokio::test]
    async fn test_existing_link_is_not_reinserted() {
        let storage = Arc::new(InMemoryStorage::new());
        let existing = storage
            .insert_article(&NewArticle {
                title: "Old".to_string(),
                link: "https://mock.test/1".to_string(),
                image_url: None,
                content: "kept".to_string(),
            })
            .await
            .unwrap();

        let scraper = Arc::new(MockScraper::new(&["https://mock.test/1", "https://mock.test/2"]));
        let mut manager = ScraperManager::new(storage.clone(), Arc::new(EchoParaphraser), ManagerConfig::default());
        manager.add_scraper(scraper.clone());

        let current = manager.scrape_and_process().await.unwrap();
        assert_eq!(current.len(), 2);
        assert!(current.contains(&existing));
        assert_eq!(*scraper.fetched.lock().unwrap(), vec!["https://mock.test/2".to_string()]);

        let all = storage.list_articles().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].content, "kept");
    }

    #[tokio::test]
    async fn test_paraphrase_failure_stores_prompt_text() {
        let storage = Arc::new(InMemoryStorage::new());
        let mut manager = ScraperManager::new(storage.clone(), Arc::new(DownParaphraser), ManagerConfig::default());
        manager.add_scraper(Arc::new(MockScraper::new(&["https://mock.test/1"])));

        manager.scrape_and_process().await.unwrap();
        let stored = storage.find_by_link("https://mock.test/1").await.unwrap().unwrap();
        assert_eq!(stored.content, format!("first\nsecond\n{}", DEFAULT_INSTRUCTION));
    }

    #[tokio::test]
    async fn test_broken_article_is_skipped() {
        let storage = Arc::new(InMemoryStorage::new());
        let mut scraper = MockScraper::new(&["https://mock.test/1", "https://mock.test/2"]);
        scraper.broken_link = Some("https://mock.test/1".to_string());
        let mut manager = ScraperManager::new(storage.clone(), Arc::new(EchoParaphraser), ManagerConfig::default());
        manager.add_scraper(Arc::new(scraper));

        let current = manager.scrape_and_process().await.unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].link, "https://mock.test/2");
    }

    #[tokio::test]
    async fn test_listing_failure_fails_the_pass() {
        let storage = Arc::new(InMemoryStorage::new());
        let mut manager = ScraperManager::new(storage, Arc::new(EchoParaphraser), ManagerConfig::default());
        manager.add_scraper(Arc::new(FailingListing));
        assert!(manager.scrape_and_process().await.is_err());
    }

    #[test]
    fn test_stale_article_ids() {
        let stored = vec![
            article(1, "https://mock.test/1"),
            article(2, "https://mock.test/2"),
            article(3, "https://mock.test/3"),
        ];
        let current = vec![article(2, "https://mock.test/2"), article(9, "https://mock.test/9")];
        assert_eq!(stale_article_ids(&stored, &current), vec![1, 3]);
        assert!(stale_article_ids(&stored, &stored).is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_removes_exactly_absent_articles() {
        let storage = Arc::new(InMemoryStorage::new());
        for link in ["https://mock.test/1", "https://mock.test/2", "https://mock.test/3"] {
            storage
                .insert_article(&NewArticle {
                    title: "t".to_string(),
                    link: link.to_string(),
                    image_url: None,
                    content: "c".to_string(),
                })
                .await
                .unwrap();
        }
        let manager = ScraperManager::new(storage.clone(), Arc::new(EchoParaphraser), ManagerConfig::default());

        let current = vec![storage.find_by_link("https://mock.test/2").await.unwrap().unwrap()];
        let deleted = manager.cleanup_old_articles(&current).await.unwrap();
        assert_eq!(deleted, 2);

        let remaining = storage.list_articles().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].link, "https://mock.test/2");

        assert_eq!(manager.cleanup_old_articles(&current).await.unwrap(), 0);
    }
}
