//! Provider-agnostic LLM integration for Quill.
//!
//! This crate exposes a common [`traits::LlmClient`] interface and concrete
//! clients for OpenAI-compatible chat endpoints (OpenAI, Groq) and Ollama,
//! plus [`ensure_llm_ready`] to build one from a [`ClientSpec`].
//!
//! # Examples
//! ```no_run
//! use quill_llm::{ensure_llm_ready, ClientSpec, LlmProvider};
//!
//! # #[tokio::main]
//! # async fn main() -> quill_common::Result<()> {
//! let spec = ClientSpec::new(LlmProvider::Groq, "llama-3.1-8b-instant")
//!     .with_api_key(std::env::var("GROQ_API_KEY").unwrap_or_default());
//! let client = ensure_llm_ready(&spec).await?;
//! assert_eq!(client.model_name(), "llama-3.1-8b-instant");
//! # Ok(())
//! # }
//! ```
#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "openai")]
pub mod openai;
pub mod traits;

use quill_common::{QuillError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use traits::LlmClient;

/// Model used by the synthesize stage unless configured otherwise.
pub const DEFAULT_SYNTHESIZE_MODEL: &str = "llama-3.3-70b-versatile";
/// Model used by the draft and validate stages unless configured otherwise.
pub const DEFAULT_DRAFT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2:3b";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Groq,
    OpenAi,
    Ollama,
}

/// Everything needed to construct one client.
#[derive(Debug, Clone)]
pub struct ClientSpec {
    pub provider: LlmProvider,
    pub model: String,
    pub api_key: Option<String>,
    /// Override of the provider's default base URL.
    pub endpoint: Option<String>,
    pub timeout: Option<Duration>,
}

impl ClientSpec {
    pub fn new(provider: LlmProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            api_key: None,
            endpoint: None,
            timeout: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn require_key(&self) -> Result<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                QuillError::Config(format!(
                    "{:?} model `{}` needs an api_key",
                    self.provider, self.model
                ))
            })
    }
}

/// Build a client for `spec`. For Ollama this also probes the server and
/// pulls the model when missing.
pub async fn ensure_llm_ready(spec: &ClientSpec) -> Result<Arc<dyn LlmClient + Send + Sync>> {
    match spec.provider {
        #[cfg(feature = "openai")]
        LlmProvider::Groq | LlmProvider::OpenAi => {
            let base = spec.endpoint.as_deref().unwrap_or(match spec.provider {
                LlmProvider::Groq => openai::GROQ_API_BASE,
                _ => openai::OPENAI_API_BASE,
            });
            let mut client =
                openai::OpenAiClient::new(base, Some(spec.require_key()?), spec.model.clone())?;
            if let Some(t) = spec.timeout {
                client = client.with_timeout(t);
            }
            Ok(Arc::new(client))
        }
        #[cfg(feature = "ollama")]
        LlmProvider::Ollama => {
            let base = spec.endpoint.as_deref().unwrap_or(ollama::OLLAMA_DEFAULT_BASE);
            let mut client = ollama::OllamaClient::connect(base, spec.model.clone()).await?;
            if let Some(t) = spec.timeout {
                client = client.with_timeout(t);
            }
            Ok(Arc::new(client))
        }
        #[allow(unreachable_patterns)]
        _ => Err(QuillError::Config(format!(
            "LLM provider {:?} not enabled in this build",
            spec.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hosted_providers_need_a_key() {
        let spec = ClientSpec::new(LlmProvider::Groq, DEFAULT_DRAFT_MODEL);
        let err = ensure_llm_ready(&spec).await.err().unwrap();
        assert!(matches!(err, QuillError::Config(_)));
    }

    #[tokio::test]
    async fn groq_client_keeps_model_name() {
        let spec = ClientSpec::new(LlmProvider::Groq, DEFAULT_SYNTHESIZE_MODEL).with_api_key("k");
        let client = ensure_llm_ready(&spec).await.unwrap();
        assert_eq!(client.model_name(), DEFAULT_SYNTHESIZE_MODEL);
    }

    #[test]
    fn provider_names_parse() {
        let p: LlmProvider = serde_json::from_str("\"openai\"").unwrap();
        assert_eq!(p, LlmProvider::OpenAi);
        let p: LlmProvider = serde_json::from_str("\"groq\"").unwrap();
        assert_eq!(p, LlmProvider::Groq);
    }
}
