use async_trait::async_trait;

use crate::Result;

#[async_trait]
pub trait Paraphraser: Send + Sync {
    fn name(&self) -> &str;

    /// Send text (prompt instruction included) and return the rewritten text
    async fn paraphrase(&self, text: &str) -> Result<String>;
}
