//! Web search collaborators.
//!
//! - [`SearchClient`]: the seam the pipeline's search stage talks to
//! - [`tavily::TavilyApi`]: Tavily `/search` (default provider)
//! - [`brave::BraveApi`]: Brave Search web vertical
//!
//! Both clients return hits in the provider's ranking order; nothing here
//! re-ranks or deduplicates.

pub mod brave;
pub mod tavily;

use async_trait::async_trait;
use quill_common::{QuillError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// One search hit as returned by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub content: String,
}

/// How much work the provider should spend per query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchDepth {
    Basic,
    Advanced,
    #[default]
    Fast,
    UltraFast,
}

impl SearchDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchDepth::Basic => "basic",
            SearchDepth::Advanced => "advanced",
            SearchDepth::Fast => "fast",
            SearchDepth::UltraFast => "ultra-fast",
        }
    }
}

impl fmt::Display for SearchDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub max_results: u32,
    pub depth: SearchDepth,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: 2,
            depth: SearchDepth::Fast,
        }
    }

    pub fn max_results(mut self, n: u32) -> Self {
        self.max_results = n;
        self
    }

    pub fn depth(mut self, depth: SearchDepth) -> Self {
        self.depth = depth;
        self
    }
}

#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Run one query. Hits come back in provider order, at most
    /// `request.max_results` of them.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>>;

    /// Short provider name for logs.
    fn provider_name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchProvider {
    #[default]
    Tavily,
    Brave,
}

/// Build the configured search client.
pub fn build_search_client(
    provider: SearchProvider,
    api_key: &str,
    timeout: Option<Duration>,
) -> Result<Arc<dyn SearchClient>> {
    if api_key.trim().is_empty() {
        return Err(QuillError::Config(format!(
            "{provider:?} search needs an api_key"
        )));
    }
    let client: Arc<dyn SearchClient> = match provider {
        SearchProvider::Tavily => {
            let mut api = tavily::TavilyApi::new(api_key.to_string())?;
            if let Some(t) = timeout {
                api = api.with_timeout(t);
            }
            Arc::new(api)
        }
        SearchProvider::Brave => {
            let mut api = brave::BraveApi::new(api_key.to_string())?;
            if let Some(t) = timeout {
                api = api.with_timeout(t);
            }
            Arc::new(api)
        }
    };
    Ok(client)
}

pub(crate) fn query_snippet(query: &str) -> String {
    const MAX: usize = 160;
    if query.chars().count() <= MAX {
        query.to_string()
    } else {
        let mut s: String = query.chars().take(MAX).collect();
        s.push('…');
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_uses_provider_spelling() {
        let d: SearchDepth = serde_json::from_str("\"ultra-fast\"").unwrap();
        assert_eq!(d, SearchDepth::UltraFast);
        assert_eq!(serde_json::to_string(&SearchDepth::Fast).unwrap(), "\"fast\"");
    }

    #[test]
    fn request_defaults_match_pipeline_defaults() {
        let req = SearchRequest::new("AI");
        assert_eq!(req.max_results, 2);
        assert_eq!(req.depth, SearchDepth::Fast);
    }

    #[test]
    fn blank_key_is_a_config_error() {
        let err = build_search_client(SearchProvider::Tavily, " ", None).err().unwrap();
        assert!(matches!(err, QuillError::Config(_)));
    }

    #[test]
    fn long_queries_are_clipped_for_logs() {
        let q = "x".repeat(500);
        assert_eq!(query_snippet(&q).chars().count(), 161);
    }
}
