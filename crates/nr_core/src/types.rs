use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored news article. `link` is unique across the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub link: String,
    pub image_url: Option<String>,
    /// Paraphrased text, not the original article body.
    pub content: String,
    #[serde(default)]
    pub video_generation: bool,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

/// Insert payload for a freshly scraped article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewArticle {
    pub title: String,
    pub link: String,
    pub image_url: Option<String>,
    pub content: String,
}

/// One anchor found on a listing page, with `link` already absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub title: String,
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleDetails {
    pub image_url: Option<String>,
    pub paragraphs: Vec<String>,
}

impl ArticleDetails {
    pub fn body(&self) -> String {
        self.paragraphs.join("\n")
    }
}

/// What the renderer needs to draw a single article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRequest {
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
}

impl From<&Article> for VideoRequest {
    fn from(article: &Article) -> Self {
        Self {
            title: article.title.clone(),
            content: article.content.clone(),
            image_url: article.image_url.clone(),
        }
    }
}

/// A rendered video waiting to be posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub video_path: PathBuf,
    pub article_id: i64,
}
