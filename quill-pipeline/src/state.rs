use quill_search::SearchHit;
use serde::{Deserialize, Serialize};

/// One search record as the pipeline sees it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub content: String,
}

impl From<SearchHit> for SearchResult {
    fn from(hit: SearchHit) -> Self {
        Self {
            url: hit.url,
            title: hit.title,
            content: hit.content,
        }
    }
}

/// The record threaded through every stage of one run.
///
/// Stages take a state by value and hand back the next one; the orchestrator
/// holds the only binding. `search_result` and `synthesized_content` are
/// written once, `final_content` stays empty until the retry loop ends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub topic: String,
    pub brand_voice: String,
    pub search_result: Vec<SearchResult>,
    pub synthesized_content: String,
    pub draft_content: String,
    pub validation_passed: bool,
    pub validation_feedback: String,
    pub retry_count: u32,
    pub final_content: String,
}

impl PipelineState {
    /// Fresh state: everything zeroed except the two caller inputs.
    pub fn new(topic: impl Into<String>, brand_voice: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            brand_voice: brand_voice.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_zeroed_except_inputs() {
        let s = PipelineState::new("AI", "playful");
        assert_eq!(s.topic, "AI");
        assert_eq!(s.brand_voice, "playful");
        assert!(s.search_result.is_empty());
        assert!(s.synthesized_content.is_empty());
        assert!(s.draft_content.is_empty());
        assert!(!s.validation_passed);
        assert!(s.validation_feedback.is_empty());
        assert_eq!(s.retry_count, 0);
        assert!(s.final_content.is_empty());
    }

    #[test]
    fn search_hits_map_field_for_field() {
        let hit = SearchHit {
            url: "https://a.example".into(),
            title: "A".into(),
            content: "alpha".into(),
        };
        let r = SearchResult::from(hit);
        assert_eq!(r.url, "https://a.example");
        assert_eq!(r.title, "A");
        assert_eq!(r.content, "alpha");
    }
}
