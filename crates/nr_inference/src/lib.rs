use nr_core::Paraphraser;
use tracing::warn;

pub mod models;

pub use models::create_model;

pub const DEFAULT_ENDPOINT: &str = "https://gemini-uts6.onrender.com/api/askgemini";

#[derive(Debug, Clone)]
pub struct Config {
    /// `remote` or `dummy`
    pub model_name: String,
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_name: "remote".to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 60,
        }
    }
}

/// Paraphrase `text`, handing it back untouched if the model fails.
pub async fn paraphrase_or_original(model: &dyn Paraphraser, text: &str) -> String {
    match model.paraphrase(text).await {
        Ok(rewritten) => rewritten,
        Err(e) => {
            warn!("Paraphrasing error ({}): {}", model.name(), e);
            text.to_string()
        }
    }
}

pub mod prelude {
    pub use super::models::create_model;
    pub use super::{paraphrase_or_original, Config};
    pub use nr_core::{Error, Paraphraser, Result};
}
