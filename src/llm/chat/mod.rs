pub mod completions;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use super::LlmConfig;
use self::completions::CompletionsClient;
use crate::models::chat::ChatMessage;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("chat API key not configured")]
    NotConfigured,
    #[error("invalid base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid API key format")]
    InvalidApiKey,
    #[error("upstream API error: {status} - {body}")]
    Status {
        status: u16,
        body: String,
    },
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("could not decode upstream response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("upstream returned no completion")]
    EmptyResponse,
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends `system_prompt` followed by `history` (already trimmed) and
    /// returns the first choice's text. One request, no retries.
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatMessage]
    ) -> Result<String, LlmError>;

    fn is_configured(&self) -> bool;
    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, LlmError> {
    let client: Arc<dyn ChatClient> = Arc::new(CompletionsClient::from_config(config)?);
    Ok(client)
}
