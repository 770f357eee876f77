use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use nr_core::{Error, Paraphraser, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Config;

#[derive(Serialize)]
struct ParaphraseRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct ParaphraseResponse {
    #[serde(default)]
    response: Option<String>,
}

impl ParaphraseResponse {
    fn into_text(self, original: &str) -> String {
        match self.response {
            Some(text) if !text.trim().is_empty() => text,
            _ => original.to_string(),
        }
    }
}

/// Client for the hosted summarization endpoint (`{"text"}` in, `{"response"}` out).
pub struct RemoteParaphraser {
    client: Client,
    endpoint: Url,
}

impl RemoteParaphraser {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: Url::parse(&config.endpoint)?,
        })
    }
}

impl fmt::Debug for RemoteParaphraser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteParaphraser")
            .field("client", &"<reqwest::Client>")
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

#[async_trait]
impl Paraphraser for RemoteParaphraser {
    fn name(&self) -> &str {
        "remote"
    }

    async fn paraphrase(&self, text: &str) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&ParaphraseRequest { text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Paraphrase(format!(
                "{} answered with status {}",
                self.endpoint, status
            )));
        }

        let body = response.json::<ParaphraseResponse>().await?;
        Ok(body.into_text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paraphrase_or_original;

    #[test]
    fn test_empty_response_keeps_original() {
        let body: ParaphraseResponse = serde_json::from_str(r#"{"response": "  "}"#).unwrap();
        assert_eq!(body.into_text("original"), "original");

        let body: ParaphraseResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(body.into_text("original"), "original");

        let body: ParaphraseResponse = serde_json::from_str(r#"{"response": "सारांश"}"#).unwrap();
        assert_eq!(body.into_text("original"), "सारांश");
    }

    #[test]
    fn test_rejects_invalid_endpoint() {
        let config = Config {
            endpoint: "not a url".to_string(),
            ..Config::default()
        };
        assert!(RemoteParaphraser::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_falls_back() {
        // Port 9 (discard) is closed on any sane test host.
        let config = Config {
            endpoint: "http://127.0.0.1:9/api/askgemini".to_string(),
            timeout_secs: 5,
            ..Config::default()
        };
        let model = RemoteParaphraser::new(&config).unwrap();
        assert!(model.paraphrase("text").await.is_err());
        assert_eq!(paraphrase_or_original(&model, "text").await, "text");
    }
}
