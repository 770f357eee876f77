use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nr_core::{Article, ArticleStorage, Error, NewArticle, Result};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryStore {
    articles: Vec<Article>,
    next_id: i64,
}

impl MemoryStore {
    fn insert(&mut self, article: &NewArticle) -> Result<Article> {
        if self.articles.iter().any(|a| a.link == article.link) {
            return Err(Error::Storage(format!("Article already stored: {}", article.link)));
        }
        self.next_id += 1;
        let stored = Article {
            id: self.next_id,
            title: article.title.clone(),
            link: article.link.clone(),
            image_url: article.image_url.clone(),
            content: article.content.clone(),
            video_generation: false,
            processed_at: None,
            timestamp: Utc::now(),
        };
        self.articles.push(stored.clone());
        Ok(stored)
    }
}

/// Process-local store, mostly useful for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    store: RwLock<MemoryStore>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArticleStorage for InMemoryStorage {
    async fn find_by_link(&self, link: &str) -> Result<Option<Article>> {
        let store = self.store.read().await;
        Ok(store.articles.iter().find(|a| a.link == link).cloned())
    }

    async fn insert_article(&self, article: &NewArticle) -> Result<Article> {
        let mut store = self.store.write().await;
        store.insert(article)
    }

    async fn list_articles(&self) -> Result<Vec<Article>> {
        let store = self.store.read().await;
        Ok(store.articles.clone())
    }

    async fn list_pending_videos(&self) -> Result<Vec<Article>> {
        let store = self.store.read().await;
        Ok(store
            .articles
            .iter()
            .filter(|a| !a.video_generation)
            .cloned()
            .collect())
    }

    async fn mark_video_generated(&self, id: i64, processed_at: DateTime<Utc>) -> Result<()> {
        let mut store = self.store.write().await;
        let article = store
            .articles
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| Error::Storage(format!("No article with id {}", id)))?;
        article.video_generation = true;
        article.processed_at = Some(processed_at);
        Ok(())
    }

    async fn delete_articles(&self, ids: &[i64]) -> Result<u64> {
        let mut store = self.store.write().await;
        let before = store.articles.len();
        store.articles.retain(|a| !ids.contains(&a.id));
        Ok((before - store.articles.len()) as u64)
    }
}
