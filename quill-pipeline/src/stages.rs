//! The four pipeline stages.
//!
//! Each stage consumes a [`PipelineState`] and returns the next one. Stages
//! keep no counters between calls; retry bookkeeping belongs to the
//! orchestrator.
use crate::prompts::{self, DRAFT_SYSTEM_PROMPT, SYNTHESIZE_SYSTEM_PROMPT, VALIDATE_SYSTEM_PROMPT};
use crate::query::QueryPolicy;
use crate::state::{PipelineState, SearchResult};
use crate::validation::{parse_verdict, ValidationRules, ValidationVerdict};
use async_trait::async_trait;
use quill_common::{Result, Stage};
use quill_llm::traits::{GenerationParams, LlmClient};
use quill_search::{SearchClient, SearchDepth, SearchRequest};
use std::sync::Arc;
use std::time::Instant;

pub type SharedLlm = Arc<dyn LlmClient + Send + Sync>;

#[async_trait]
pub trait PipelineStage: Send + Sync {
    fn stage(&self) -> Stage;

    async fn run(&self, state: PipelineState) -> Result<PipelineState>;
}

pub struct SearchStage {
    client: Arc<dyn SearchClient>,
    policy: QueryPolicy,
    max_results: u32,
    depth: SearchDepth,
}

impl SearchStage {
    pub fn new(client: Arc<dyn SearchClient>) -> Self {
        Self {
            client,
            policy: QueryPolicy::default(),
            max_results: 2,
            depth: SearchDepth::Fast,
        }
    }

    pub fn with_policy(mut self, policy: QueryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_results(mut self, n: u32) -> Self {
        self.max_results = n;
        self
    }

    pub fn with_depth(mut self, depth: SearchDepth) -> Self {
        self.depth = depth;
        self
    }
}

#[async_trait]
impl PipelineStage for SearchStage {
    fn stage(&self) -> Stage {
        Stage::Search
    }

    async fn run(&self, state: PipelineState) -> Result<PipelineState> {
        let request = SearchRequest::new(self.policy.build(&state.topic))
            .max_results(self.max_results)
            .depth(self.depth);
        let started = Instant::now();

        let hits = self.client.search(&request).await?;
        let search_result: Vec<SearchResult> = hits.into_iter().map(SearchResult::from).collect();

        tracing::info!(
            stage = %Stage::Search,
            provider = self.client.provider_name(),
            hit_count = search_result.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "stage.search.done"
        );
        if search_result.is_empty() {
            tracing::warn!(stage = %Stage::Search, query = %request.query, "search returned no results");
        }

        Ok(PipelineState {
            search_result,
            ..state
        })
    }
}

pub struct SynthesizeStage {
    llm: SharedLlm,
    template: String,
    params: GenerationParams,
}

impl SynthesizeStage {
    pub fn new(llm: SharedLlm) -> Self {
        Self {
            llm,
            template: prompts::DEFAULT_SYNTHESIZE_TEMPLATE.to_string(),
            params: GenerationParams::deterministic(),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }
}

#[async_trait]
impl PipelineStage for SynthesizeStage {
    fn stage(&self) -> Stage {
        Stage::Synthesize
    }

    async fn run(&self, state: PipelineState) -> Result<PipelineState> {
        let count = state.search_result.len().to_string();
        let records = prompts::render_records(&state.search_result);
        let prompt = prompts::render(
            &self.template,
            &[("count", count.as_str()), ("records", records.as_str())],
        );
        let started = Instant::now();

        let resp = self
            .llm
            .generate_with(&prompt, Some(SYNTHESIZE_SYSTEM_PROMPT), self.params)
            .await?;

        let bullets = prompts::count_bullets(&resp.text);
        tracing::info!(
            stage = %Stage::Synthesize,
            model = self.llm.model_name(),
            records = state.search_result.len(),
            bullets,
            tokens = ?resp.tokens_used,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "stage.synthesize.done"
        );
        if bullets != state.search_result.len() {
            tracing::warn!(
                stage = %Stage::Synthesize,
                expected = state.search_result.len(),
                got = bullets,
                "bullet count differs from record count"
            );
        }

        Ok(PipelineState {
            synthesized_content: resp.text,
            ..state
        })
    }
}

pub struct DraftStage {
    llm: SharedLlm,
    template: String,
    params: GenerationParams,
}

impl DraftStage {
    pub fn new(llm: SharedLlm) -> Self {
        Self {
            llm,
            template: prompts::DEFAULT_DRAFT_TEMPLATE.to_string(),
            params: GenerationParams::default(),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }
}

#[async_trait]
impl PipelineStage for DraftStage {
    fn stage(&self) -> Stage {
        Stage::Draft
    }

    async fn run(&self, state: PipelineState) -> Result<PipelineState> {
        let feedback = prompts::feedback_section(&state.validation_feedback);
        let prompt = prompts::render(
            &self.template,
            &[
                ("brand_voice", state.brand_voice.as_str()),
                ("feedback_section", feedback.as_str()),
                ("validation_feedback", state.validation_feedback.as_str()),
                ("bullet_points", state.synthesized_content.as_str()),
            ],
        );
        let started = Instant::now();

        let resp = self
            .llm
            .generate_with(&prompt, Some(DRAFT_SYSTEM_PROMPT), self.params)
            .await?;

        tracing::info!(
            stage = %Stage::Draft,
            model = self.llm.model_name(),
            with_feedback = !state.validation_feedback.is_empty(),
            retry_count = state.retry_count,
            chars = resp.text.chars().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "stage.draft.done"
        );

        Ok(PipelineState {
            draft_content: resp.text,
            ..state
        })
    }
}

pub struct ValidateStage {
    llm: SharedLlm,
    template: String,
    params: GenerationParams,
    rules: ValidationRules,
}

impl ValidateStage {
    pub fn new(llm: SharedLlm) -> Self {
        Self {
            llm,
            template: prompts::DEFAULT_VALIDATE_TEMPLATE.to_string(),
            params: GenerationParams::deterministic(),
            rules: ValidationRules::default(),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_rules(mut self, rules: ValidationRules) -> Self {
        self.rules = rules;
        self
    }

    async fn verdict(&self, state: &PipelineState) -> Result<ValidationVerdict> {
        if let Some(v) = self.rules.check(&state.draft_content) {
            tracing::debug!(stage = %Stage::Validate, feedback = %v.feedback, "rule check failed");
            return Ok(v);
        }

        let prompt = prompts::render(
            &self.template,
            &[
                ("brand_voice", state.brand_voice.as_str()),
                ("bullet_points", state.synthesized_content.as_str()),
                ("draft", state.draft_content.as_str()),
            ],
        );
        let resp = self
            .llm
            .generate_with(&prompt, Some(VALIDATE_SYSTEM_PROMPT), self.params)
            .await?;
        Ok(parse_verdict(&resp.text))
    }
}

#[async_trait]
impl PipelineStage for ValidateStage {
    fn stage(&self) -> Stage {
        Stage::Validate
    }

    async fn run(&self, state: PipelineState) -> Result<PipelineState> {
        let started = Instant::now();
        let verdict = self.verdict(&state).await?;

        tracing::info!(
            stage = %Stage::Validate,
            model = self.llm.model_name(),
            passed = verdict.passed,
            retry_count = state.retry_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "stage.validate.done"
        );

        Ok(PipelineState {
            validation_passed: verdict.passed,
            validation_feedback: verdict.feedback,
            ..state
        })
    }
}
