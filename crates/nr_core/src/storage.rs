use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{Article, NewArticle};
use crate::Result;

#[async_trait]
pub trait ArticleStorage: Send + Sync {
    /// Look up an article by its unique link
    async fn find_by_link(&self, link: &str) -> Result<Option<Article>>;

    /// Insert a new article; fails if the link is already stored
    async fn insert_article(&self, article: &NewArticle) -> Result<Article>;

    /// All stored articles
    async fn list_articles(&self) -> Result<Vec<Article>>;

    /// Articles that still need a video
    async fn list_pending_videos(&self) -> Result<Vec<Article>>;

    /// Flag an article as rendered and posted
    async fn mark_video_generated(&self, id: i64, processed_at: DateTime<Utc>) -> Result<()>;

    /// Delete the given articles, returning how many rows went away
    async fn delete_articles(&self, ids: &[i64]) -> Result<u64>;
}
