use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use nr_core::{ArticleStorage, Error, Result};

pub mod backends;

pub use backends::*;

/// Table holding the scraped articles, shared by every backend.
pub const ARTICLES_TABLE: &str = "news_articles";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    Sqlite,
    Supabase,
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            "supabase" => Ok(Self::Supabase),
            other => Err(Error::Storage(format!("Unknown storage backend: {}", other))),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
            Self::Supabase => "supabase",
        };
        f.write_str(name)
    }
}

#[derive(Clone)]
pub struct StorageConfig {
    pub kind: StorageKind,
    pub sqlite_path: PathBuf,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("kind", &self.kind)
            .field("sqlite_path", &self.sqlite_path)
            .field("supabase_url", &self.supabase_url)
            .field("supabase_key", &self.supabase_key.as_deref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::Sqlite,
            sqlite_path: PathBuf::from("articles.db"),
            supabase_url: None,
            supabase_key: None,
        }
    }
}

/// Build the backend selected by `config`.
pub async fn create_storage(config: &StorageConfig) -> Result<Arc<dyn ArticleStorage>> {
    match config.kind {
        StorageKind::Memory => Ok(Arc::new(InMemoryStorage::new())),
        #[cfg(feature = "sqlite")]
        StorageKind::Sqlite => Ok(Arc::new(SQLiteStorage::new_with_path(&config.sqlite_path).await?)),
        #[cfg(feature = "supabase")]
        StorageKind::Supabase => {
            let url = config
                .supabase_url
                .as_deref()
                .ok_or_else(|| Error::Storage("SUPABASE_URL is required for the supabase backend".to_string()))?;
            let key = config
                .supabase_key
                .as_deref()
                .ok_or_else(|| Error::Storage("SUPABASE_KEY is required for the supabase backend".to_string()))?;
            Ok(Arc::new(SupabaseStorage::new(url, key)?))
        }
        #[allow(unreachable_patterns)]
        other => Err(Error::Storage(format!(
            "Storage backend '{}' was not compiled in",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_storage_kind() {
        assert_eq!("memory".parse::<StorageKind>().unwrap(), StorageKind::Memory);
        assert_eq!("SQLite".parse::<StorageKind>().unwrap(), StorageKind::Sqlite);
        assert_eq!("supabase".parse::<StorageKind>().unwrap(), StorageKind::Supabase);
        assert!("qdrant".parse::<StorageKind>().is_err());
    }

    #[test]
    fn test_config_debug_redacts_key() {
        let config = StorageConfig {
            supabase_key: Some("secret".to_string()),
            ..StorageConfig::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_create_memory_storage() {
        let config = StorageConfig {
            kind: StorageKind::Memory,
            ..StorageConfig::default()
        };
        let storage = create_storage(&config).await.unwrap();
        assert!(storage.list_articles().await.unwrap().is_empty());
    }
}
