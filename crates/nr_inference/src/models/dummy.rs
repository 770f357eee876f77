use std::fmt;

use async_trait::async_trait;
use nr_core::{Paraphraser, Result};

/// Offline stand-in that keeps the first twenty words.
pub struct DummyModel;

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel").finish()
    }
}

impl DummyModel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DummyModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Paraphraser for DummyModel {
    fn name(&self) -> &str {
        "dummy"
    }

    async fn paraphrase(&self, text: &str) -> Result<String> {
        let words: Vec<&str> = text.split_whitespace().take(20).collect();
        Ok(words.join(" "))
    }
}
