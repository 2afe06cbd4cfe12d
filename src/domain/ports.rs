use crate::utils::error::Result;
use async_trait::async_trait;

/// Settings the completion relay needs from whichever config source is in use.
pub trait ConfigProvider: Send + Sync {
    fn api_endpoint(&self) -> &str;
    fn api_key(&self) -> &str;
    fn model(&self) -> &str;
    fn referer(&self) -> &str;
    fn title(&self) -> &str;
    fn timeout_seconds(&self) -> Option<u64>;
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Sends one system + user message pair and returns the first choice's text.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}
