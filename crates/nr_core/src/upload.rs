use std::path::Path;

use async_trait::async_trait;

use crate::Result;

#[async_trait]
pub trait Uploader: Send + Sync {
    fn platform(&self) -> &str;

    /// Post the video. Any failure aborts the whole session.
    async fn upload(&self, video_path: &Path) -> Result<()>;
}
