//! LLM provider trait for text completion

use async_trait::async_trait;
use crate::error::Result;

/// Trait for prompt completion
///
/// Implementations:
/// - `OpenAiLlm`: OpenAI completions API (gpt-3.5-turbo-instruct)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a prompt, returning the raw generated text
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
