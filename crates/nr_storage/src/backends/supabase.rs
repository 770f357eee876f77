use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nr_core::{Article, ArticleStorage, Error, NewArticle, Result};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::ARTICLES_TABLE;

#[derive(Serialize)]
struct InsertRow<'a> {
    #[serde(flatten)]
    article: &'a NewArticle,
    video_generation: bool,
}

#[derive(Serialize)]
struct MarkProcessed {
    video_generation: bool,
    processed_at: DateTime<Utc>,
}

/// Rows echoed back by `Prefer: return=representation` with `select=id`.
#[derive(Debug, Deserialize)]
struct AffectedRow {
    id: i64,
}

/// Articles table behind a Supabase project, spoken to through its PostgREST API.
pub struct SupabaseStorage {
    client: Client,
    table_url: Url,
    api_key: String,
}

impl fmt::Debug for SupabaseStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseStorage")
            .field("table_url", &self.table_url.as_str())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl SupabaseStorage {
    pub fn new(project_url: &str, api_key: &str) -> Result<Self> {
        Ok(Self {
            client: Client::new(),
            table_url: table_url(project_url, ARTICLES_TABLE)?,
            api_key: api_key.to_string(),
        })
    }

    fn request(&self, method: reqwest::Method) -> RequestBuilder {
        self.client
            .request(method, self.table_url.clone())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn select(&self, filters: &[(&str, String)]) -> Result<Vec<Article>> {
        let mut query: Vec<(&str, String)> = vec![("select", "*".to_string()), ("order", "id.asc".to_string())];
        query.extend(filters.iter().cloned());

        let articles = self
            .request(reqwest::Method::GET)
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Article>>()
            .await?;
        Ok(articles)
    }
}

fn table_url(project_url: &str, table: &str) -> Result<Url> {
    let base = Url::parse(project_url.trim_end_matches('/'))?;
    Ok(base.join(&format!("/rest/v1/{}", table))?)
}

fn ensure_updated(rows: &[AffectedRow], id: i64) -> Result<()> {
    if !rows.iter().any(|row| row.id == id) {
        return Err(Error::Storage(format!("No article with id {}", id)));
    }
    Ok(())
}

/// PostgREST `in` filter, e.g. `in.(1,2,3)`.
fn id_in_filter(ids: &[i64]) -> String {
    let ids = ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",");
    format!("in.({})", ids)
}

#[async_trait]
impl ArticleStorage for SupabaseStorage {
    async fn find_by_link(&self, link: &str) -> Result<Option<Article>> {
        let mut rows = self.select(&[("link", format!("eq.{}", link))]).await?;
        Ok(if rows.is_empty() { None } else { Some(rows.remove(0)) })
    }

    async fn insert_article(&self, article: &NewArticle) -> Result<Article> {
        let mut rows = self
            .request(reqwest::Method::POST)
            .header("Prefer", "return=representation")
            .json(&InsertRow {
                article,
                video_generation: false,
            })
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Article>>()
            .await?;

        if rows.is_empty() {
            return Err(Error::Storage(format!("Insert returned no row for {}", article.link)));
        }
        Ok(rows.remove(0))
    }

    async fn list_articles(&self) -> Result<Vec<Article>> {
        self.select(&[]).await
    }

    async fn list_pending_videos(&self) -> Result<Vec<Article>> {
        self.select(&[("video_generation", "eq.false".to_string())]).await
    }

    async fn mark_video_generated(&self, id: i64, processed_at: DateTime<Utc>) -> Result<()> {
        let rows = self
            .request(reqwest::Method::PATCH)
            .header("Prefer", "return=representation")
            .query(&[("id", format!("eq.{}", id)), ("select", "id".to_string())])
            .json(&MarkProcessed {
                video_generation: true,
                processed_at,
            })
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<AffectedRow>>()
            .await?;
        ensure_updated(&rows, id)
    }

    async fn delete_articles(&self, ids: &[i64]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let rows = self
            .request(reqwest::Method::DELETE)
            .header("Prefer", "return=representation")
            .query(&[("id", id_in_filter(ids)), ("select", "id".to_string())])
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<AffectedRow>>()
            .await?;
        Ok(rows.len() as u64)
    }
}
