#![allow(dead_code)]

use async_trait::async_trait;
use quill_common::observability::{LogConfig, LogFormat};
use quill_common::{QuillError, Result};
use quill_llm::traits::{LlmClient, LlmResponse};
use quill_search::{SearchClient, SearchHit, SearchRequest};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

static INIT_PATH: OnceLock<PathBuf> = OnceLock::new();

pub fn init_test_tracing() {
    let _ = INIT_PATH.get_or_init(|| {
        let config = LogConfig {
            app_name: "quill-tests",
            log_dir: Some(std::env::temp_dir().join("quill-tests")),
            format: if std::env::var("QUILL_LOG_FORMAT")
                .map(|raw| raw.trim().eq_ignore_ascii_case("json"))
                .unwrap_or(false)
            {
                LogFormat::Json
            } else {
                LogFormat::Text
            },
            default_filter: "debug".to_string(),
            ..LogConfig::default()
        };

        quill_common::observability::init_logging(config).unwrap_or_default()
    });
}

/// LLM fake that replays a script; the last reply repeats once the script
/// runs out.
pub struct ScriptedLlm {
    model: String,
    replies: Mutex<VecDeque<String>>,
    last: Mutex<String>,
    fail_with: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    temperatures: Mutex<Vec<Option<f32>>>,
}

impl ScriptedLlm {
    pub fn new(model: &str, replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            model: model.to_string(),
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            last: Mutex::new(String::new()),
            fail_with: None,
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            temperatures: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(model: &str, message: &str) -> Arc<Self> {
        Arc::new(Self {
            model: model.to_string(),
            replies: Mutex::new(VecDeque::new()),
            last: Mutex::new(String::new()),
            fail_with: Some(message.to_string()),
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            temperatures: Mutex::new(Vec::new()),
        })
    }

    pub fn slow(model: &str, reply: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            model: model.to_string(),
            replies: Mutex::new(VecDeque::from([reply.to_string()])),
            last: Mutex::new(String::new()),
            fail_with: None,
            delay: Some(delay),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            temperatures: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn temperatures(&self) -> Vec<Option<f32>> {
        self.temperatures.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn generate(
        &self,
        prompt: &str,
        _system_prompt: Option<&str>,
        _max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.temperatures.lock().unwrap().push(temperature);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(msg) = &self.fail_with {
            return Err(QuillError::Llm(msg.clone()));
        }

        let text = {
            let mut last = self.last.lock().unwrap();
            if let Some(next) = self.replies.lock().unwrap().pop_front() {
                *last = next;
            }
            last.clone()
        };
        Ok(LlmResponse {
            text,
            model: Some(self.model.clone()),
            tokens_used: None,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

pub struct FakeSearch {
    hits: Vec<SearchHit>,
    fail: bool,
    calls: AtomicUsize,
    requests: Mutex<Vec<SearchRequest>>,
}

impl FakeSearch {
    pub fn with_hits(hits: Vec<SearchHit>) -> Arc<Self> {
        Arc::new(Self {
            hits,
            fail: false,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            hits: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchClient for FakeSearch {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(QuillError::Search("fake: 401 Unauthorized".into()));
        }
        Ok(self
            .hits
            .iter()
            .take(request.max_results as usize)
            .cloned()
            .collect())
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

pub fn sample_hits() -> Vec<SearchHit> {
    vec![
        SearchHit {
            url: "https://news.example/ai-chips".into(),
            title: "AI chip demand keeps growing".into(),
            content: "Menu | Login | Chipmakers report record demand for AI accelerators.".into(),
        },
        SearchHit {
            url: "https://blog.example/agents".into(),
            title: "Agents in production".into(),
            content: "Teams are moving LLM agents from demos to production workloads.".into(),
        },
    ]
}

pub const BULLETS: &str =
    "- Chipmakers report record demand for AI accelerators.\n- LLM agents are moving into production.";
pub const PASS: &str = r#"{"passed": true, "feedback": ""}"#;
pub const FAIL_TONE: &str = r#"{"passed": false, "feedback": "Too stiff for the brand voice."}"#;
