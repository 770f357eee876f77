use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use nr_core::{Error, Result};
use tokio::process::Command;
use tracing::{debug, info};

/// Muxes a still image and an audio track into an H.264/AAC vertical video.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    binary: PathBuf,
}

impl FfmpegEncoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }

    pub fn args(&self, still: &Path, audio: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-y", "-loop", "1", "-i"].iter().map(OsString::from).collect();
        args.push(still.as_os_str().to_owned());
        args.push(OsString::from("-i"));
        args.push(audio.as_os_str().to_owned());
        args.extend(
            [
                "-c:v", "libx264", "-preset", "ultrafast", "-tune", "stillimage", "-c:a", "aac", "-b:a", "192k",
                "-shortest", "-vf", "scale=1080:1920",
            ]
            .iter()
            .map(OsString::from),
        );
        args.push(output.as_os_str().to_owned());
        args
    }

    pub async fn encode(&self, still: &Path, audio: &Path, output: &Path) -> Result<()> {
        let args = self.args(still, audio, output);
        debug!("Running {} {:?}", self.binary.display(), args);

        let result = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::Render(format!("Failed to start {}: {}", self.binary.display(), e)))?;

        let stderr = String::from_utf8_lossy(&result.stderr);
        if !result.status.success() {
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            return Err(Error::Render(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                result.status,
                tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
            )));
        }
        if !stderr.is_empty() {
            debug!("ffmpeg stderr: {}", stderr);
        }

        info!("🎬 Video generated at {}", output.display());
        Ok(())
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}
