//! Common types and utilities shared across Quill crates.
//!
//! Everything here is deliberately small so that the HTTP, LLM, search and
//! pipeline crates can all depend on it without dragging in each other.
//!
//! # Overview
//!
//! - [`QuillError`] and [`Result`]: shared error handling
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`OutputFormat`]: how binaries render a finished run
//!
//! # Examples
//!
//! ```rust
//! use quill_common::{QuillError, Stage};
//!
//! let err = QuillError::at(Stage::Search, QuillError::Search("quota exceeded".into()));
//! assert_eq!(err.stage(), Some(Stage::Search));
//! assert!(err.to_string().contains("quota exceeded"));
//! ```
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub mod observability;

/// The four pipeline stages, used to tag errors and log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Search,
    Synthesize,
    Draft,
    Validate,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Search => "search",
            Stage::Synthesize => "synthesize",
            Stage::Draft => "draft",
            Stage::Validate => "validate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Preferred rendering for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format `{other}` (expected text or json)")),
        }
    }
}

/// Error types used across the Quill workspace.
#[derive(thiserror::Error, Debug)]
pub enum QuillError {
    /// The search collaborator failed (network, auth, quota, decode).
    #[error("Search error: {0}")]
    Search(String),

    /// The text-generation collaborator failed.
    #[error("LLM error: {0}")]
    Llm(String),

    /// A stage did not finish within its per-call budget.
    #[error("Stage `{stage}` timed out after {after:?}")]
    Timeout { stage: Stage, after: Duration },

    /// A stage failed; the inner error names the collaborator.
    #[error("Stage `{stage}` failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<QuillError>,
    },

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything bubbling up from lower layers without a dedicated variant.
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl QuillError {
    /// Tag an error with the stage it came from. Already tagged errors and
    /// timeouts keep their original stage.
    pub fn at(stage: Stage, source: QuillError) -> Self {
        match source {
            e @ (QuillError::Stage { .. } | QuillError::Timeout { .. }) => e,
            other => QuillError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Stage that produced this error, if known.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            QuillError::Stage { stage, .. } | QuillError::Timeout { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Convenient alias for results that use [`QuillError`].
pub type Result<T> = std::result::Result<T, QuillError>;
