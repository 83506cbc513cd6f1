//! Default prompt templates and the tiny renderer that fills them.
//!
//! Templates use `{name}` placeholders. Unknown placeholders are left as-is,
//! so overrides may drop any of them.
use crate::state::SearchResult;

pub const SYNTHESIZE_SYSTEM_PROMPT: &str =
    "You clean up raw web search results. You answer with plain text bullet points only.";

pub const DEFAULT_SYNTHESIZE_TEMPLATE: &str = r#"Below are {count} web search results.
Remove navigation text, markup, ads and any other noise, and summarise each result
as exactly one bullet point starting with "- ". Produce exactly {count} bullet
points, one per result, in the same order. Reply with the bullet points only.

{records}"#;

pub const DRAFT_SYSTEM_PROMPT: &str =
    "You are a brand and marketing manager who writes copy that people want to share.";

pub const DEFAULT_DRAFT_TEMPLATE: &str = r#"Write marketing copy about the points below in this brand voice: {brand_voice}.
Stay faithful to the facts in the points and do not invent new ones.
{feedback_section}
Points:
{bullet_points}"#;

pub const VALIDATE_SYSTEM_PROMPT: &str =
    "You review marketing copy before publication. You reply with JSON only.";

pub const DEFAULT_VALIDATE_TEMPLATE: &str = r#"Review the draft below.
It passes when it matches the brand voice "{brand_voice}", is supported by the
source points, and is ready to publish without edits.

Reply with exactly one JSON object: {"passed": true|false, "feedback": "..."}.
When it fails, the feedback must say concretely what to change.

Source points:
{bullet_points}

Draft:
{draft}"#;

/// The three call-site templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    pub synthesize: String,
    pub draft: String,
    pub validate: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            synthesize: DEFAULT_SYNTHESIZE_TEMPLATE.to_string(),
            draft: DEFAULT_DRAFT_TEMPLATE.to_string(),
            validate: DEFAULT_VALIDATE_TEMPLATE.to_string(),
        }
    }
}

impl PromptSet {
    /// Replace the templates that are `Some`, keep the defaults elsewhere.
    pub fn with_overrides(
        mut self,
        synthesize: Option<String>,
        draft: Option<String>,
        validate: Option<String>,
    ) -> Self {
        if let Some(t) = synthesize {
            self.synthesize = t;
        }
        if let Some(t) = draft {
            self.draft = t;
        }
        if let Some(t) = validate {
            self.validate = t;
        }
        self
    }
}

/// Fill `{key}` placeholders in one pass, so values containing braces are
/// never re-expanded.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let key = &after[..close];
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v, close))
        });
        match value {
            Some((v, close)) => {
                out.push_str(v);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Numbered listing of the search records for the synthesize prompt.
pub fn render_records(records: &[SearchResult]) -> String {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "[{}] {}\nURL: {}\n{}",
                i + 1,
                r.title.trim(),
                r.url.trim(),
                r.content.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn feedback_section(feedback: &str) -> String {
    let feedback = feedback.trim();
    if feedback.is_empty() {
        String::new()
    } else {
        format!("\nA reviewer rejected the previous draft. Address this feedback:\n{feedback}\n")
    }
}

/// Lines that look like list items (`-`, `*`, `•` or `1.`).
pub fn count_bullets(text: &str) -> usize {
    text.lines()
        .map(str::trim_start)
        .filter(|l| {
            l.starts_with("- ")
                || l.starts_with("* ")
                || l.starts_with('•')
                || l
                    .split_once(". ")
                    .is_some_and(|(n, _)| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        })
        .count()
}
