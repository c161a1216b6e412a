use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;

use crate::errors::SeeDroidResult;
use crate::llm::types::{CallConfig, ChatMessage, LlmResponse};

/// Unified LLM provider trait. All providers implement this trait.
/// New providers only need to implement this trait and register in config.toml.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider's identifier (matches config.toml key).
    fn name(&self) -> &str;

    async fn chat(&self, messages: Vec<ChatMessage>, cfg: &CallConfig)
        -> SeeDroidResult<LlmResponse>;
}

/// The narrow gateway the locator, planner and verifier talk to.
///
/// Answers are free-form text and must be parsed defensively by the caller.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// `image` is PNG bytes when the question concerns a rendered screen.
    async fn generate(&self, prompt: &str, image: Option<&[u8]>) -> SeeDroidResult<String>;
}

/// Binds a provider to one role's call settings.
pub struct RoleClassifier {
    provider: Arc<dyn LlmProvider>,
    cfg: CallConfig,
}

impl RoleClassifier {
    pub fn new(provider: Arc<dyn LlmProvider>, cfg: CallConfig) -> Self {
        Self { provider, cfg }
    }
}

#[async_trait]
impl Classifier for RoleClassifier {
    async fn generate(&self, prompt: &str, image: Option<&[u8]>) -> SeeDroidResult<String> {
        let message = match image {
            Some(bytes) => ChatMessage::user_with_image(prompt, png_data_url(bytes)),
            None => ChatMessage::user_text(prompt),
        };
        let response = self.provider.chat(vec![message], &self.cfg).await?;
        if !response.reasoning.is_empty() {
            tracing::trace!(reasoning = %response.reasoning, "classifier reasoning");
        }
        Ok(response.content)
    }
}

pub fn png_data_url(bytes: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}
