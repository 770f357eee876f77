//! WebDriver session plumbing shared by the uploaders.

use std::fmt::Display;
use std::ops::Range;
use std::time::Duration;

use fantoccini::key::Key;
use fantoccini::{Client, ClientBuilder};
use nr_core::{Error, Result};
use rand::Rng;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::UploadConfig;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/115.0.0.0 Safari/537.36";

pub fn chrome_capabilities(headless: bool) -> Map<String, Value> {
    let mut args = vec![
        "--start-maximized".to_string(),
        "--no-sandbox".to_string(),
        "--disable-setuid-sandbox".to_string(),
        "--disable-blink-features=AutomationControlled".to_string(),
        format!("--user-agent={}", USER_AGENT),
    ];
    if headless {
        args.push("--headless=new".to_string());
    }

    let mut caps = Map::new();
    caps.insert("browserName".to_string(), json!("chrome"));
    caps.insert(
        "goog:chromeOptions".to_string(),
        json!({
            "args": args,
            "excludeSwitches": ["enable-automation"],
        }),
    );
    caps
}

pub async fn connect(config: &UploadConfig) -> Result<Client> {
    info!("🌐 Launching browser via {}", config.webdriver_url);
    let mut builder = ClientBuilder::native();
    builder.capabilities(chrome_capabilities(config.headless));
    builder
        .connect(&config.webdriver_url)
        .await
        .map_err(|e| Error::Upload(format!("Failed to start browser session: {}", e)))
}

/// Always called, whatever happened during the session.
pub async fn close(client: Client) {
    info!("Closing browser");
    if let Err(e) = client.close().await {
        warn!("Failed to close browser session: {}", e);
    }
}

/// Maps a WebDriver failure into an upload error tagged with the step.
pub fn step<E: Display>(context: &'static str) -> impl FnOnce(E) -> Error {
    move |e| Error::Upload(format!("{}: {}", context, e))
}

pub async fn pause(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

pub fn jitter(range: Range<u64>) -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(range))
}

pub fn key(k: Key) -> String {
    char::from(k).to_string()
}

/// Modifier held for a single key, released at the end of the send.
pub fn chord(modifier: Key, c: char) -> String {
    format!("{}{}", char::from(modifier), c)
}
