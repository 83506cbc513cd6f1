use crate::stages::{
    DraftStage, PipelineStage, SearchStage, SharedLlm, SynthesizeStage, ValidateStage,
};
use crate::state::PipelineState;
use quill_common::{QuillError, Result};
use quill_search::SearchClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Extra draft attempts after the first one fails validation.
pub const MAX_RETRIES: u32 = 1;
pub const DEFAULT_BRAND_VOICE: &str = "professional";
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub max_retries: u32,
    /// Budget for one stage call; exceeding it fails the run.
    pub stage_timeout: Duration,
    pub default_brand_voice: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
            default_brand_voice: DEFAULT_BRAND_VOICE.to_string(),
        }
    }
}

/// How the retry loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    /// The returned draft passed validation.
    Passed,
    /// Retries ran out; the returned draft is the last, unvalidated one.
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub content: String,
    pub status: ValidationStatus,
    pub retry_count: u32,
    pub draft_calls: u32,
    pub validate_calls: u32,
    pub state: PipelineState,
}

impl PipelineOutcome {
    pub fn is_validated(&self) -> bool {
        self.status == ValidationStatus::Passed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running { attempt: u32 },
    Passed,
    Exhausted,
}

/// Search → Synthesize → Draft, then the bounded Validate/Draft loop.
pub struct Pipeline {
    search: Box<dyn PipelineStage>,
    synthesize: Box<dyn PipelineStage>,
    draft: Box<dyn PipelineStage>,
    validate: Box<dyn PipelineStage>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        search: impl PipelineStage + 'static,
        synthesize: impl PipelineStage + 'static,
        draft: impl PipelineStage + 'static,
        validate: impl PipelineStage + 'static,
    ) -> Self {
        Self {
            search: Box::new(search),
            synthesize: Box::new(synthesize),
            draft: Box::new(draft),
            validate: Box::new(validate),
            options: PipelineOptions::default(),
        }
    }

    /// All four stages with their default prompts and settings.
    pub fn from_clients(
        search: Arc<dyn SearchClient>,
        synthesize: SharedLlm,
        draft: SharedLlm,
        validate: SharedLlm,
    ) -> Self {
        Self::new(
            SearchStage::new(search),
            SynthesizeStage::new(synthesize),
            DraftStage::new(draft),
            ValidateStage::new(validate),
        )
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub async fn run_with_default_voice(&self, topic: &str) -> Result<PipelineOutcome> {
        self.run(topic, &self.options.default_brand_voice).await
    }

    /// Run once for `topic`. Collaborator failures and stage timeouts abort
    /// the run; a draft that never passes validation does not.
    pub async fn run(&self, topic: &str, brand_voice: &str) -> Result<PipelineOutcome> {
        let max_retries = self.options.max_retries;
        let started = Instant::now();
        tracing::info!(topic, brand_voice, max_retries, "pipeline.run.start");

        let mut state = PipelineState::new(topic, brand_voice);
        state = self.step(self.search.as_ref(), state).await?;
        state = self.step(self.synthesize.as_ref(), state).await?;
        state = self.step(self.draft.as_ref(), state).await?;
        let mut draft_calls = 1;
        let mut validate_calls = 0;

        let mut phase = Phase::Running { attempt: 0 };
        while let Phase::Running { attempt } = phase {
            state = self.step(self.validate.as_ref(), state).await?;
            validate_calls += 1;

            phase = if state.validation_passed {
                Phase::Passed
            } else if attempt < max_retries {
                tracing::info!(
                    attempt,
                    feedback = %state.validation_feedback,
                    "validation failed; redrafting"
                );
                state = PipelineState {
                    retry_count: attempt + 1,
                    ..state
                };
                state = self.step(self.draft.as_ref(), state).await?;
                draft_calls += 1;
                Phase::Running {
                    attempt: attempt + 1,
                }
            } else {
                tracing::warn!(
                    attempt,
                    feedback = %state.validation_feedback,
                    "retries exhausted; accepting latest draft"
                );
                Phase::Exhausted
            };
        }

        let status = match phase {
            Phase::Passed => ValidationStatus::Passed,
            _ => ValidationStatus::Exhausted,
        };
        state = PipelineState {
            final_content: state.draft_content.clone(),
            ..state
        };

        tracing::info!(
            ?status,
            retry_count = state.retry_count,
            draft_calls,
            validate_calls,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline.run.done"
        );

        Ok(PipelineOutcome {
            content: state.final_content.clone(),
            status,
            retry_count: state.retry_count,
            draft_calls,
            validate_calls,
            state,
        })
    }

    async fn step(&self, stage: &dyn PipelineStage, state: PipelineState) -> Result<PipelineState> {
        let kind = stage.stage();
        let after = self.options.stage_timeout;
        match tokio::time::timeout(after, stage.run(state)).await {
            Ok(Ok(next)) => Ok(next),
            Ok(Err(e)) => {
                tracing::error!(stage = %kind, error = %e, "stage failed");
                Err(QuillError::at(kind, e))
            }
            Err(_) => {
                tracing::error!(stage = %kind, timeout_ms = after.as_millis() as u64, "stage timed out");
                Err(QuillError::Timeout { stage: kind, after })
            }
        }
    }
}
