use std::path::PathBuf;

use async_trait::async_trait;

use crate::types::VideoRequest;
use crate::Result;

#[async_trait]
pub trait VideoRenderer: Send + Sync {
    /// Render a video for the article and return the path of the file on disk
    async fn render(&self, request: &VideoRequest) -> Result<PathBuf>;
}
