pub mod error;
pub mod models;
pub mod render;
pub mod storage;
pub mod types;
pub mod upload;

pub use error::Error;
pub use models::Paraphraser;
pub use render::VideoRenderer;
pub use storage::ArticleStorage;
pub use types::{Article, ArticleDetails, ListingEntry, NewArticle, QueueEntry, VideoRequest};
pub use upload::Uploader;

pub type Result<T> = std::result::Result<T, Error>;
