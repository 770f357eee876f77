use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use fantoccini::key::Key;
use fantoccini::{Client, Locator};
use nr_core::{Error, Result, Uploader};
use serde_json::{json, Value};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::browser::{self, chord, jitter, key, pause, step};
use crate::session::{SessionCookie, SessionData};
use crate::UploadConfig;

const LOGIN_URL: &str = "https://tiktok.com/login";
const FRIENDS_URL: &str = "https://www.tiktok.com/friends";
const UPLOAD_URL: &str = "https://www.tiktok.com/tiktokstudio/upload?from=upload";

const LOGGED_IN_MARKER: &str = r#"[data-e2e="search-box"]"#;
const FILE_INPUT: &str = r#"input[type="file"]"#;
const PROGRESS_TEXT: &str = r#"div.info-progress-num, [role="progressbar"], progress, .info-progress"#;
const SUCCESS_ICON: &str = r#"[data-icon*="Check"], [data-icon*="Success"]"#;
const ERROR_ELEMENT: &str = r#"[class*="error"], [class*="Error"]"#;
const SUCCESS_INDICATORS: [&str; 3] = [
    r#"[data-icon*="success"]"#,
    r#"[class*="success"]"#,
    r#"[aria-label*="uploaded successfully"]"#,
];
const CAPTION_BOX: &str = r#"div[role="combobox"]"#;
const POST_LABEL: &str = "Post";

const FILE_INPUT_TIMEOUT: Duration = Duration::from_secs(30);
const SESSION_CHECK_TIMEOUT: Duration = Duration::from_secs(10);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);
const POLL_INTERVAL: Duration = Duration::from_secs(1);

const PROGRESS_COMPLETE_JS: &str = r#"
return Array.from(document.querySelectorAll('[role="progressbar"], progress, .info-progress')).some(el => {
    const style = window.getComputedStyle(el);
    const width = parseFloat(style.width) / parseFloat(style.maxWidth) * 100;
    return width >= 100 || Number(el.value) >= 100;
});"#;
const UPLOADED_TEXT_JS: &str = "return !!document.body && document.body.innerText.includes('Uploaded');";
const CLICK_BUTTON_JS: &str = r#"
const button = Array.from(document.querySelectorAll('[role="button"]'))
    .find(b => b.textContent.trim() === arguments[0]);
if (!button) { return false; }
button.click();
return true;"#;
const CLIPBOARD_WRITE_JS: &str = "return navigator.clipboard.writeText(arguments[0]);";
const LOCAL_STORAGE_LOAD_JS: &str = r#"
const data = arguments[0];
Object.keys(data).forEach(k => localStorage.setItem(k, data[k]));"#;
const LOCAL_STORAGE_DUMP_JS: &str = r#"
const data = {};
for (let i = 0; i < localStorage.length; i++) {
    const k = localStorage.key(i);
    data[k] = localStorage.getItem(k);
}
return data;"#;

/// Posts videos through the TikTok Studio web UI, authenticated with a
/// previously captured session.
pub struct TikTokUploader {
    config: UploadConfig,
}

impl TikTokUploader {
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    async fn post(&self, client: &Client, video: &Path) -> Result<()> {
        info!("Navigating to TikTok login page");
        client.goto(LOGIN_URL).await.map_err(step("Failed to open login page"))?;
        self.load_session(client).await?;
        validate_session(client).await?;

        info!("Navigating to upload page");
        client.goto(UPLOAD_URL).await.map_err(step("Failed to open upload page"))?;
        let input = client
            .wait()
            .at_most(FILE_INPUT_TIMEOUT)
            .for_element(Locator::Css(FILE_INPUT))
            .await
            .map_err(step("File input not found"))?;
        input
            .send_keys(&video.to_string_lossy())
            .await
            .map_err(step("Failed to attach video"))?;
        info!("📤 Uploading {}", video.display());

        wait_for_upload(client).await?;
        check_upload_status(client).await?;
        self.fill_caption(client).await?;
        submit(client).await?;

        let settle = jitter(45_000..60_001);
        info!("✅ Video posted, waiting {}s before closing", settle.as_secs());
        tokio::time::sleep(settle).await;
        Ok(())
    }

    async fn load_session(&self, client: &Client) -> Result<()> {
        let session = SessionData::load(&self.config.session_file).await?;

        let mut loaded = 0;
        for cookie in &session.cookies {
            match client.add_cookie(cookie.to_webdriver()).await {
                Ok(()) => loaded += 1,
                Err(e) => warn!("Failed to set cookie {}: {}", cookie.name, e),
            }
        }
        if loaded == 0 {
            return Err(Error::Session("None of the saved cookies could be set".to_string()));
        }

        if !session.local_storage_data.is_empty() {
            client
                .execute(LOCAL_STORAGE_LOAD_JS, vec![json!(session.local_storage_data)])
                .await
                .map_err(step("Failed to restore local storage"))?;
        }
        info!("🔑 Session restored ({} cookies)", loaded);
        Ok(())
    }

    async fn fill_caption(&self, client: &Client) -> Result<()> {
        let caption_box = client
            .wait()
            .at_most(FILE_INPUT_TIMEOUT)
            .for_element(Locator::Css(CAPTION_BOX))
            .await
            .map_err(step("Caption box not found"))?;
        caption_box.click().await.map_err(step("Failed to focus caption box"))?;
        pause(500).await;

        press(client, &chord(Key::Control, 'a')).await?;
        press(client, &key(Key::Backspace)).await?;

        match client
            .execute(CLIPBOARD_WRITE_JS, vec![json!(self.config.caption)])
            .await
        {
            Ok(_) => press(client, &chord(Key::Control, 'v')).await?,
            Err(e) => {
                warn!("Clipboard unavailable ({}), typing caption instead", e);
                press(client, &self.config.caption).await?;
            }
        }

        for stroke in hashtag_keys(&self.config.hashtag_list()) {
            match stroke {
                HashtagKey::Char(c) => {
                    press(client, &c.to_string()).await?;
                    tokio::time::sleep(jitter(100..200)).await;
                }
                HashtagKey::Commit => {
                    pause(1600).await;
                    press(client, &key(Key::Tab)).await?;
                }
            }
        }
        debug!("Caption filled");
        Ok(())
    }
}

#[async_trait]
impl Uploader for TikTokUploader {
    fn platform(&self) -> &str {
        "tiktok"
    }

    async fn upload(&self, video_path: &Path) -> Result<()> {
        if !tokio::fs::try_exists(video_path).await.unwrap_or(false) {
            return Err(Error::Upload(format!("Video file not found: {}", video_path.display())));
        }
        let video = tokio::fs::canonicalize(video_path).await?;

        let client = browser::connect(&self.config).await?;
        let result = self.post(&client, &video).await;
        browser::close(client).await;
        result
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HashtagKey {
    Char(char),
    /// Wait for the suggestion list, then Tab to accept it
    Commit,
}

/// Hashtags typed one character at a time, each followed by a commit. With no
/// hashtags a single commit still runs: the Tab moves focus out of the
/// caption box before the submit keys are sent.
fn hashtag_keys(hashtags: &[&str]) -> Vec<HashtagKey> {
    if hashtags.is_empty() {
        return vec![HashtagKey::Commit];
    }
    hashtags
        .iter()
        .flat_map(|tag| tag.chars().map(HashtagKey::Char).chain(std::iter::once(HashtagKey::Commit)))
        .collect()
}

/// Keys go to whatever holds focus; TikTok moves it between steps.
async fn press(client: &Client, keys: &str) -> Result<()> {
    let focused = client.active_element().await.map_err(step("No focused element"))?;
    focused.send_keys(keys).await.map_err(step("Failed to send keys"))
}

async fn script_flag(client: &Client, script: &str) -> bool {
    match client.execute(script, vec![]).await {
        Ok(value) => value.as_bool().unwrap_or(false),
        Err(e) => {
            debug!("Script check failed: {}", e);
            false
        }
    }
}

async fn validate_session(client: &Client) -> Result<()> {
    client.goto(FRIENDS_URL).await.map_err(step("Failed to open friends page"))?;
    client
        .wait()
        .at_most(SESSION_CHECK_TIMEOUT)
        .for_element(Locator::Css(LOGGED_IN_MARKER))
        .await
        .map_err(|_| Error::Session("Session validation failed - cookies may be expired".to_string()))?;
    info!("Session is valid");
    Ok(())
}

async fn wait_for_upload(client: &Client) -> Result<()> {
    let deadline = Instant::now() + UPLOAD_TIMEOUT;
    loop {
        if let Ok(progress) = client.find(Locator::Css(PROGRESS_TEXT)).await {
            if let Ok(text) = progress.text().await {
                if !text.trim().is_empty() {
                    info!("Upload progress: {}", text.trim());
                }
            }
        }

        if client.find(Locator::Css(SUCCESS_ICON)).await.is_ok()
            || script_flag(client, UPLOADED_TEXT_JS).await
            || script_flag(client, PROGRESS_COMPLETE_JS).await
        {
            info!("Upload finished");
            return Ok(());
        }

        if Instant::now() >= deadline {
            return Err(Error::Upload(format!(
                "Upload did not finish within {}s",
                UPLOAD_TIMEOUT.as_secs()
            )));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

async fn check_upload_status(client: &Client) -> Result<()> {
    if let Ok(element) = client.find(Locator::Css(ERROR_ELEMENT)).await {
        let text = element.text().await.unwrap_or_default();
        return Err(Error::Upload(format!("Upload verification failed: {}", text.trim())));
    }
    for selector in SUCCESS_INDICATORS {
        if client.find(Locator::Css(selector)).await.is_ok() {
            return Ok(());
        }
    }
    Err(Error::Upload(
        "Upload verification failed: no success indicator found".to_string(),
    ))
}

async fn submit(client: &Client) -> Result<()> {
    pause(500).await;
    press(client, &key(Key::Enter)).await?;
    press(client, &key(Key::Tab)).await?;
    for _ in 0..20 {
        press(client, &key(Key::Down)).await?;
        pause(100).await;
    }
    pause(2000).await;

    let clicked = client
        .execute(CLICK_BUTTON_JS, vec![json!(POST_LABEL)])
        .await
        .map_err(step("Failed to click Post"))?;
    if clicked.as_bool() != Some(true) {
        return Err(Error::Upload("Post button not found".to_string()));
    }
    info!("Post button clicked");
    Ok(())
}

/// Opens the login page, leaves `wait` for a manual login, then writes the
/// browser's cookies and local storage to the session file.
pub async fn capture_session(config: &UploadConfig, wait: Duration) -> Result<SessionData> {
    let client = browser::connect(config).await?;
    let result = collect_session(&client, wait).await;
    browser::close(client).await;

    let session = result?;
    if session.cookies.is_empty() {
        return Err(Error::Session("Browser returned no cookies; was the login completed?".to_string()));
    }
    session.save(&config.session_file).await?;
    Ok(session)
}

async fn collect_session(client: &Client, wait: Duration) -> Result<SessionData> {
    client.goto(LOGIN_URL).await.map_err(step("Failed to open login page"))?;
    info!("⏳ Log in within {}s, the session is captured afterwards", wait.as_secs());
    tokio::time::sleep(wait).await;

    let cookies = client
        .get_all_cookies()
        .await
        .map_err(step("Failed to read cookies"))?
        .iter()
        .map(SessionCookie::from_webdriver)
        .collect();
    let local_storage_data = match client.execute(LOCAL_STORAGE_DUMP_JS, vec![]).await {
        Ok(value) => local_storage_from(value),
        Err(e) => {
            warn!("Failed to read local storage: {}", e);
            HashMap::new()
        }
    };

    Ok(SessionData {
        cookies,
        local_storage_data,
    })
}

/// Non-string values are dropped.
fn local_storage_from(value: Value) -> HashMap<String, String> {
    match value {
        Value::Object(map) => map
            .into_iter()
            .filter_map(|(k, v)| match v {
                Value::String(s) => Some((k, s)),
                _ => None,
            })
            .collect(),
        _ => HashMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_video_fails_before_browser() {
        // Unroutable WebDriver: reaching it would surface a different error.
        let uploader = TikTokUploader::new(UploadConfig {
            webdriver_url: "http://127.0.0.1:9".to_string(),
            ..UploadConfig::default()
        });
        let err = uploader.upload(Path::new("/nonexistent/video.mp4")).await.unwrap_err();
        match err {
            Error::Upload(msg) => assert!(msg.contains("Video file not found")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_webdriver_is_an_upload_error() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        std::fs::write(&video, b"video").unwrap();

        let uploader = TikTokUploader::new(UploadConfig {
            webdriver_url: "http://127.0.0.1:9".to_string(),
            ..UploadConfig::default()
        });
        assert!(matches!(uploader.upload(&video).await, Err(Error::Upload(_))));
        assert!(video.exists());
    }

    #[test]
    fn test_hashtag_keys() {
        use HashtagKey::{Char, Commit};
        assert_eq!(hashtag_keys(&[]), vec![Commit]);
        assert_eq!(
            hashtag_keys(&["#a", "#b"]),
            vec![Char('#'), Char('a'), Commit, Char('#'), Char('b'), Commit]
        );

        let config = UploadConfig::default();
        assert_eq!(hashtag_keys(&config.hashtag_list()), vec![Commit]);
    }

    #[test]
    fn test_local_storage_from() {
        let data = local_storage_from(json!({"theme": "dark", "count": 3}));
        assert_eq!(data.len(), 1);
        assert_eq!(data["theme"], "dark");
        assert!(local_storage_from(Value::Null).is_empty());
    }

    #[test]
    fn test_platform() {
        assert_eq!(TikTokUploader::new(UploadConfig::default()).platform(), "tiktok");
    }
}
