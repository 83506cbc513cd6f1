use crate::traits::{LlmClient, LlmResponse};
use async_trait::async_trait;
use quill_common::{QuillError, Result};
use quill_http::{HttpClient, RequestOpts};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};
use std::time::Duration;

pub const OLLAMA_DEFAULT_BASE: &str = "http://localhost:11434/";

const OLLAMA_CONNECTION_ERROR: &str = "No running Ollama server detected. Start it with: `ollama serve` (after installing). Install instructions: https://github.com/ollama/ollama";
const PULL_TIMEOUT: Duration = Duration::from_secs(600);

/// Ollama client for local model inference.
pub struct OllamaClient {
    client: HttpClient,
    model: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: Map<String, JsonValue>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

impl OllamaClient {
    /// Build a client without touching the network.
    pub fn new(base_url: &str, model: String) -> Result<Self> {
        let base = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let client = HttpClient::new(&base)
            .map_err(|e| QuillError::Config(format!("HttpClient init failed: {e}")))?
            .with_timeout(Duration::from_secs(120));
        Ok(Self { client, model })
    }

    /// Build a client, verify the server answers and pull the model if it is
    /// not available locally.
    pub async fn connect(base_url: &str, model: String) -> Result<Self> {
        let client = Self::new(base_url, model)?;
        client.ensure_model_available().await?;
        Ok(client)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = self.client.with_timeout(timeout);
        self
    }

    async fn fetch_available_models(&self) -> Result<Vec<String>> {
        let tags: TagsResponse = self
            .client
            .get_json(
                "api/tags",
                RequestOpts {
                    retries: Some(0),
                    timeout: Some(Duration::from_secs(10)),
                    ..Default::default()
                },
            )
            .await
            .map_err(|_| QuillError::Llm(OLLAMA_CONNECTION_ERROR.to_string()))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn ensure_model_available(&self) -> Result<()> {
        let models = self.fetch_available_models().await?;
        if models.iter().any(|m| m == &self.model) {
            return Ok(());
        }

        tracing::info!(model = %self.model, "model not found locally, pulling");
        let _: JsonValue = self
            .client
            .post_json_opts(
                "api/pull",
                &json!({ "model": self.model, "stream": false }),
                RequestOpts {
                    timeout: Some(PULL_TIMEOUT),
                    retries: Some(0),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| QuillError::Llm(format!("Failed to pull model {}: {e}", self.model)))?;
        tracing::info!(model = %self.model, "pulled model");
        Ok(())
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let mut options = Map::new();
        if let Some(temp) = temperature {
            options.insert("temperature".to_string(), json!(temp));
        }
        if let Some(max_tok) = max_tokens {
            options.insert("num_predict".to_string(), json!(max_tok));
        }

        let req = GenerateRequest {
            model: &self.model,
            prompt,
            system: system_prompt,
            stream: false,
            options,
        };
        let resp: GenerateResponse = self
            .client
            .post_json("api/generate", None, &req)
            .await
            .map_err(|e| QuillError::Llm(format!("Generate request failed: {e}")))?;

        Ok(LlmResponse {
            text: resp.response,
            model: Some(self.model.clone()),
            tokens_used: resp.eval_count,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.fetch_available_models().await.is_ok())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
