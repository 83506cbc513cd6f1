//! Client for OpenAI-compatible chat completion endpoints (OpenAI, Groq,
//! self-hosted gateways).
use crate::traits::{LlmClient, LlmResponse};
use async_trait::async_trait;
use quill_common::{QuillError, Result};
use quill_http::{HttpClient, HttpError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1/";
pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1/";

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

pub struct OpenAiClient {
    client: HttpClient,
    api_key: Option<String>,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u32,
}

impl OpenAiClient {
    /// Create a client for `base_url` (trailing slash added when missing).
    ///
    /// `api_key` may be `None` for local gateways that do not check it.
    pub fn new(base_url: &str, api_key: Option<String>, model: String) -> Result<Self> {
        if model.trim().is_empty() {
            return Err(QuillError::Config("model name must not be empty".into()));
        }
        let base = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let client = HttpClient::new(&base)
            .map_err(|e| QuillError::Config(format!("HttpClient init failed: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model,
        })
    }

    pub fn groq(api_key: String, model: String) -> Result<Self> {
        Self::new(GROQ_API_BASE, Some(api_key), model)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = self.client.with_timeout(timeout);
        self
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let req = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt.unwrap_or(DEFAULT_SYSTEM_PROMPT),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature,
            max_tokens,
        };

        tracing::debug!(
            model = %self.model,
            base = %self.client.base_url(),
            prompt_chars = prompt.len(),
            ?temperature,
            "llm.chat.start"
        );

        let resp: ChatResponse = self
            .client
            .post_json("chat/completions", self.api_key.as_deref(), &req)
            .await
            .map_err(http_to_quill)?;

        let text = resp
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .ok_or_else(|| QuillError::Llm(format!("{}: response had no choices", self.model)))?;

        Ok(LlmResponse {
            text,
            model: resp.model.or_else(|| Some(self.model.clone())),
            tokens_used: resp.usage.map(|u| u.total_tokens),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        match self.generate("Respond with just 'OK'", None, Some(5), Some(0.0)).await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!(model = %self.model, "chat health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

fn http_to_quill(e: HttpError) -> QuillError {
    QuillError::Llm(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn sends_chat_request_and_reads_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer gsk-test"))
            .and(body_partial_json(json!({
                "model": "llama-3.3-70b-versatile",
                "temperature": 0.0,
                "messages": [
                    {"role": "system", "content": "be terse"},
                    {"role": "user", "content": "hello"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "llama-3.3-70b-versatile",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "hi"}}],
                "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(
            &format!("{}/v1", server.uri()),
            Some("gsk-test".into()),
            "llama-3.3-70b-versatile".into(),
        )
        .unwrap();
        let resp = client
            .generate("hello", Some("be terse"), None, Some(0.0))
            .await
            .unwrap();

        assert_eq!(resp.text, "hi");
        assert_eq!(resp.tokens_used, Some(4));
    }

    #[tokio::test]
    async fn api_errors_surface_as_llm_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"error": {"message": "model not found"}})),
            )
            .mount(&server)
            .await;

        let client = OpenAiClient::new(&server.uri(), None, "nope".into()).unwrap();
        let err = client.generate("x", None, None, None).await.unwrap_err();
        assert!(matches!(err, QuillError::Llm(ref m) if m.contains("model not found")));
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(&server.uri(), None, "m".into()).unwrap();
        assert!(client.generate("x", None, None, None).await.is_err());
    }

    #[test]
    fn rejects_blank_model() {
        assert!(OpenAiClient::new(OPENAI_API_BASE, None, "  ".into()).is_err());
    }
}
