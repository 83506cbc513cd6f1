//! Search → synthesize → draft → validate, with a bounded redraft loop.
//!
//! - [`state`]: [`PipelineState`] and [`SearchResult`]
//! - [`stages`]: the four [`PipelineStage`] implementations
//! - [`pipeline`]: the orchestrator and its [`PipelineOutcome`]
//! - [`validation`]: rule checks and critic verdict parsing
//! - [`prompts`], [`query`]: default templates and the search query policy
//!
//! # Examples
//! ```no_run
//! use quill_llm::{ensure_llm_ready, ClientSpec, LlmProvider};
//! use quill_pipeline::Pipeline;
//! use quill_search::{build_search_client, SearchProvider};
//!
//! # #[tokio::main]
//! # async fn main() -> quill_common::Result<()> {
//! let key = std::env::var("GROQ_API_KEY").unwrap_or_default();
//! let llm = ensure_llm_ready(
//!     &ClientSpec::new(LlmProvider::Groq, "llama-3.1-8b-instant").with_api_key(key),
//! )
//! .await?;
//! let search = build_search_client(
//!     SearchProvider::Tavily,
//!     &std::env::var("TAVILY_API_KEY").unwrap_or_default(),
//!     None,
//! )?;
//!
//! let pipeline = Pipeline::from_clients(search, llm.clone(), llm.clone(), llm);
//! let outcome = pipeline.run_with_default_voice("AI").await?;
//! println!("{} ({:?})", outcome.content, outcome.status);
//! # Ok(())
//! # }
//! ```
pub mod pipeline;
pub mod prompts;
pub mod query;
pub mod stages;
pub mod state;
pub mod validation;

pub use pipeline::{
    Pipeline, PipelineOptions, PipelineOutcome, ValidationStatus, DEFAULT_BRAND_VOICE, MAX_RETRIES,
};
pub use stages::{
    DraftStage, PipelineStage, SearchStage, SharedLlm, SynthesizeStage, ValidateStage,
};
pub use state::{PipelineState, SearchResult};
pub use validation::{ValidationRules, ValidationVerdict};
