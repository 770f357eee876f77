//! Turns an article into a vertical video: a composited still frame muxed
//! with a looped background track by ffmpeg.

use std::path::PathBuf;

pub mod compose;
pub mod encoder;
pub mod renderer;

pub use compose::FrameComposer;
pub use encoder::FfmpegEncoder;
pub use renderer::FfmpegVideoRenderer;

#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Static assets root (background image, audio track, font)
    pub assets_dir: PathBuf,
    pub background: PathBuf,
    pub audio: PathBuf,
    pub font: PathBuf,
    /// Where stills and finished videos are written
    pub output_dir: PathBuf,
    pub ffmpeg: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("public"),
            background: PathBuf::from("images/background.png"),
            audio: PathBuf::from("audio/audio.mp3"),
            font: PathBuf::from("fonts/NotoSansDevanagari-Regular.ttf"),
            output_dir: PathBuf::from("output"),
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}

impl RenderConfig {
    pub fn background_path(&self) -> PathBuf {
        self.assets_dir.join(&self.background)
    }

    pub fn audio_path(&self) -> PathBuf {
        self.assets_dir.join(&self.audio)
    }

    pub fn font_path(&self) -> PathBuf {
        self.assets_dir.join(&self.font)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_paths_are_relative_to_assets_dir() {
        let config = RenderConfig {
            assets_dir: PathBuf::from("/srv/newsreel/public"),
            ..RenderConfig::default()
        };
        assert_eq!(
            config.audio_path(),
            PathBuf::from("/srv/newsreel/public/audio/audio.mp3")
        );
        assert_eq!(
            config.background_path(),
            PathBuf::from("/srv/newsreel/public/images/background.png")
        );
    }
}
