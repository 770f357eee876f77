use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use nr_core::{Error, Result, VideoRenderer, VideoRequest};
use tracing::{info, warn};
use uuid::Uuid;

use crate::compose::FrameComposer;
use crate::encoder::FfmpegEncoder;
use crate::RenderConfig;

/// 12 hex characters, used for intermediate and output file names.
pub fn random_id() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

pub struct FfmpegVideoRenderer {
    composer: Arc<FrameComposer>,
    encoder: FfmpegEncoder,
    output_dir: PathBuf,
    audio: PathBuf,
    client: reqwest::Client,
}

impl FfmpegVideoRenderer {
    pub fn new(config: &RenderConfig) -> Result<Self> {
        let composer = FrameComposer::load(&config.background_path(), &config.font_path())?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            composer: Arc::new(composer),
            encoder: FfmpegEncoder::new(config.ffmpeg.clone()),
            output_dir: config.output_dir.clone(),
            audio: config.audio_path(),
            client,
        })
    }

    /// Best effort: a missing hero image leaves the background showing.
    async fn fetch_image(&self, url: &str) -> Option<DynamicImage> {
        let bytes = match self.client.get(url).send().await.and_then(|r| r.error_for_status()) {
            Ok(response) => match response.bytes().await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Failed to read image {}: {}", url, e);
                    return None;
                }
            },
            Err(e) => {
                warn!("Failed to download image {}: {}", url, e);
                return None;
            }
        };

        match image::load_from_memory(&bytes) {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("Failed to decode image {}: {}", url, e);
                None
            }
        }
    }

    async fn render_still(&self, request: &VideoRequest, still: &Path) -> Result<()> {
        let hero = match request.image_url.as_deref() {
            Some(url) => self.fetch_image(url).await,
            None => None,
        };

        let composer = self.composer.clone();
        let title = request.title.clone();
        let content = request.content.clone();
        let still = still.to_path_buf();

        tokio::task::spawn_blocking(move || {
            composer
                .compose(&title, &content, hero.as_ref())?
                .save_with_format(&still, ImageFormat::Png)
                .map_err(|e| Error::Render(format!("Failed to write still {}: {}", still.display(), e)))
        })
        .await
        .map_err(|e| Error::Render(format!("Still rendering task failed: {}", e)))?
    }
}

#[async_trait]
impl VideoRenderer for FfmpegVideoRenderer {
    async fn render(&self, request: &VideoRequest) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let output_dir = tokio::fs::canonicalize(&self.output_dir).await?;
        let audio = tokio::fs::canonicalize(&self.audio)
            .await
            .map_err(|e| Error::Render(format!("Background audio {} unavailable: {}", self.audio.display(), e)))?;

        let still = output_dir.join(format!("{}.png", random_id()));
        let video = output_dir.join(format!("{}.mp4", random_id()));

        self.render_still(request, &still).await?;
        info!("🖼️ Still rendered at {}", still.display());

        let encoded = self.encoder.encode(&still, &audio, &video).await;
        if let Err(e) = tokio::fs::remove_file(&still).await {
            warn!("Failed to remove still {}: {}", still.display(), e);
        }
        encoded?;

        Ok(video)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_id() {
        let id = random_id();
        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, random_id());
    }

    #[test]
    fn test_new_requires_assets() {
        let dir = tempfile::tempdir().unwrap();
        let config = RenderConfig {
            assets_dir: dir.path().to_path_buf(),
            ..RenderConfig::default()
        };
        assert!(FfmpegVideoRenderer::new(&config).is_err());
    }
}
