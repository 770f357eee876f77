pub mod manager;
pub mod scrapers;

pub use manager::{ManagerConfig, ScraperManager};
pub use scrapers::{get_scrapers, Scraper, SourceMetadata};

pub mod prelude {
    pub use super::scrapers::Scraper;
    pub use nr_core::{Article, ArticleDetails, Error, ListingEntry, Result};
}
