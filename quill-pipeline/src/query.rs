use quill_common::{QuillError, Result};

pub const TOPIC_PLACEHOLDER: &str = "{topic}";

/// Turns a topic into the search query, via a template containing `{topic}`.
///
/// ```
/// use quill_pipeline::query::QueryPolicy;
///
/// let plain = QueryPolicy::default();
/// assert_eq!(plain.build("AI"), "AI");
///
/// let english = QueryPolicy::new("{topic} Language: English").unwrap();
/// assert_eq!(english.build("AI"), "AI Language: English");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPolicy {
    template: String,
}

impl Default for QueryPolicy {
    fn default() -> Self {
        Self {
            template: TOPIC_PLACEHOLDER.to_string(),
        }
    }
}

impl QueryPolicy {
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains(TOPIC_PLACEHOLDER) {
            return Err(QuillError::Config(format!(
                "query template {template:?} has no {TOPIC_PLACEHOLDER} placeholder"
            )));
        }
        Ok(Self { template })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn build(&self, topic: &str) -> String {
        self.template
            .replace(TOPIC_PLACEHOLDER, topic.trim())
            .trim()
            .to_string()
    }
}
