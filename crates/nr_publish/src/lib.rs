pub mod browser;
pub mod queue;
pub mod session;
pub mod tiktok;

use std::path::PathBuf;

pub use queue::{DrainOutcome, PostQueue};
pub use session::{SessionCookie, SessionData};
pub use tiktok::{capture_session, TikTokUploader};

pub const DEFAULT_CAPTION: &str = "Follow for more news content like these. \n \n";

#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// WebDriver endpoint (chromedriver, selenium, ...)
    pub webdriver_url: String,
    pub session_file: PathBuf,
    pub caption: String,
    /// Space separated, typed one by one after the caption
    pub hashtags: String,
    pub headless: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:4444".to_string(),
            session_file: PathBuf::from("Cookies/tiktok_cookies.json"),
            caption: DEFAULT_CAPTION.to_string(),
            hashtags: String::new(),
            headless: false,
        }
    }
}

impl UploadConfig {
    pub fn hashtag_list(&self) -> Vec<&str> {
        self.hashtags.split_whitespace().collect()
    }
}
