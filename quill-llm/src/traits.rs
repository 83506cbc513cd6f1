use async_trait::async_trait;
use quill_common::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub model: Option<String>,
    pub tokens_used: Option<u32>,
}

/// Sampling knobs for one call site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl GenerationParams {
    /// Temperature 0: the same prompt should give the same answer.
    pub fn deterministic() -> Self {
        Self {
            temperature: Some(0.0),
            max_tokens: None,
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a response to the given prompt with optional system prompt
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse>;

    /// Check if the LLM service is available
    async fn health_check(&self) -> Result<bool>;

    /// Get the model name being used
    fn model_name(&self) -> &str;

    /// [`LlmClient::generate`] with the knobs of one call site.
    async fn generate_with(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        params: GenerationParams,
    ) -> Result<LlmResponse> {
        self.generate(prompt, system_prompt, params.max_tokens, params.temperature)
            .await
    }
}
