use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nr_core::{Article, ArticleStorage, Error, NewArticle, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqliteRow};
use sqlx::Row;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS news_articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        link TEXT NOT NULL UNIQUE,
        image_url TEXT,
        content TEXT NOT NULL,
        video_generation INTEGER NOT NULL DEFAULT 0,
        processed_at TEXT,
        timestamp TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_news_articles_pending ON news_articles (video_generation)",
];

fn db_error(context: &str, e: sqlx::Error) -> Error {
    Error::Database(format!("{}: {}", context, e))
}

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Database(format!("Failed to parse date '{}': {}", value, e)))
}

fn row_to_article(row: &SqliteRow) -> Result<Article> {
    let processed_at = row
        .get::<Option<String>, _>("processed_at")
        .map(|t| parse_time(&t))
        .transpose()?;

    Ok(Article {
        id: row.get("id"),
        title: row.get("title"),
        link: row.get("link"),
        image_url: row.get("image_url"),
        content: row.get("content"),
        video_generation: row.get::<i64, _>("video_generation") != 0,
        processed_at,
        timestamp: parse_time(&row.get::<String, _>("timestamp"))?,
    })
}

pub struct SQLiteStorage {
    pool: SqlitePool,
}

impl SQLiteStorage {
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| db_error("Failed to connect to database", e))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| db_error(&format!("Failed to run migration {}", i), e))?;
        }

        Ok(Self { pool })
    }

    async fn fetch(&self, sql: &str) -> Result<Vec<Article>> {
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to list articles", e))?;
        rows.iter().map(row_to_article).collect()
    }
}

#[async_trait]
impl ArticleStorage for SQLiteStorage {
    async fn find_by_link(&self, link: &str) -> Result<Option<Article>> {
        let row = sqlx::query("SELECT * FROM news_articles WHERE link = ?")
            .bind(link)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to look up article", e))?;
        row.as_ref().map(row_to_article).transpose()
    }

    async fn insert_article(&self, article: &NewArticle) -> Result<Article> {
        let timestamp = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO news_articles (title, link, image_url, content, video_generation, timestamp)
            VALUES (?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(&article.title)
        .bind(&article.link)
        .bind(article.image_url.as_deref())
        .bind(&article.content)
        .bind(timestamp.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to store article", e))?;

        Ok(Article {
            id: result.last_insert_rowid(),
            title: article.title.clone(),
            link: article.link.clone(),
            image_url: article.image_url.clone(),
            content: article.content.clone(),
            video_generation: false,
            processed_at: None,
            timestamp,
        })
    }

    async fn list_articles(&self) -> Result<Vec<Article>> {
        self.fetch("SELECT * FROM news_articles ORDER BY id").await
    }

    async fn list_pending_videos(&self) -> Result<Vec<Article>> {
        self.fetch("SELECT * FROM news_articles WHERE video_generation = 0 ORDER BY id")
            .await
    }

    async fn mark_video_generated(&self, id: i64, processed_at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query(
            "UPDATE news_articles SET video_generation = 1, processed_at = ? WHERE id = ?",
        )
        .bind(processed_at.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to flag article", e))?;

        if result.rows_affected() == 0 {
            return Err(Error::Storage(format!("No article with id {}", id)));
        }
        Ok(())
    }

    async fn delete_articles(&self, ids: &[i64]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("DELETE FROM news_articles WHERE id IN ({})", placeholders);
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(*id);
        }
        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete articles", e))?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn new_article(link: &str) -> NewArticle {
        NewArticle {
            title: "Test Article".to_string(),
            link: link.to_string(),
            image_url: None,
            content: "Test content".to_string(),
        }
    }

    #[tokio::test]
    async fn test_sqlite_storage() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let storage = SQLiteStorage::new_with_path(&db_path).await.unwrap();

        let stored = storage.insert_article(&new_article("http://example.com/a")).await.unwrap();
        let found = storage.find_by_link("http://example.com/a").await.unwrap().unwrap();
        assert_eq!(found.id, stored.id);
        assert_eq!(found.content, "Test content");
        assert!(!found.video_generation);

        let pending = storage.list_pending_videos().await.unwrap();
        assert_eq!(pending.len(), 1);

        let now = Utc::now();
        storage.mark_video_generated(stored.id, now).await.unwrap();
        assert!(storage.list_pending_videos().await.unwrap().is_empty());
        let found = storage.find_by_link("http://example.com/a").await.unwrap().unwrap();
        assert!(found.video_generation);
        assert!(found.processed_at.is_some());
    }

    #[tokio::test]
    async fn test_sqlite_unique_link_and_delete() {
        let temp_dir = tempdir().unwrap();
        let storage = SQLiteStorage::new_with_path(&temp_dir.path().join("test.db"))
            .await
            .unwrap();

        let a = storage.insert_article(&new_article("http://example.com/a")).await.unwrap();
        let b = storage.insert_article(&new_article("http://example.com/b")).await.unwrap();
        assert!(storage.insert_article(&new_article("http://example.com/a")).await.is_err());

        assert_eq!(storage.delete_articles(&[]).await.unwrap(), 0);
        assert_eq!(storage.delete_articles(&[a.id]).await.unwrap(), 1);
        let remaining = storage.list_articles().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, b.id);
    }
}
