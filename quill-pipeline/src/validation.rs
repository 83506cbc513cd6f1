//! Draft validation contract.
//!
//! A draft is checked in two steps: cheap local rules, then one critic call
//! whose reply is parsed into a [`ValidationVerdict`]. A reply that cannot be
//! understood is a failed verdict, never an error.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub const EMPTY_DRAFT_FEEDBACK: &str =
    "The draft is empty. Write the copy from the provided bullet points.";
pub const FALLBACK_FEEDBACK: &str =
    "The reviewer rejected the draft without details. Rewrite it to match the brand voice and stick to the provided bullet points.";
pub const DEFAULT_MAX_DRAFT_CHARS: usize = 4000;

/// Outcome of one validation pass. Failing verdicts always carry feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub passed: bool,
    pub feedback: String,
}

impl ValidationVerdict {
    pub fn pass() -> Self {
        Self {
            passed: true,
            feedback: String::new(),
        }
    }

    pub fn fail(feedback: impl Into<String>) -> Self {
        let feedback = feedback.into().trim().to_string();
        Self {
            passed: false,
            feedback: if feedback.is_empty() {
                FALLBACK_FEEDBACK.to_string()
            } else {
                feedback
            },
        }
    }
}

/// Local checks that run before the critic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationRules {
    pub max_draft_chars: Option<usize>,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            max_draft_chars: Some(DEFAULT_MAX_DRAFT_CHARS),
        }
    }
}

impl ValidationRules {
    /// `Some(verdict)` when a rule already decides the draft fails.
    pub fn check(&self, draft: &str) -> Option<ValidationVerdict> {
        if draft.trim().is_empty() {
            return Some(ValidationVerdict::fail(EMPTY_DRAFT_FEEDBACK));
        }
        if let Some(max) = self.max_draft_chars {
            let len = draft.trim().chars().count();
            if len > max {
                return Some(ValidationVerdict::fail(format!(
                    "The draft is {len} characters long; keep it under {max} characters."
                )));
            }
        }
        None
    }
}

#[derive(Debug, Deserialize)]
struct VerdictWire {
    #[serde(alias = "pass", alias = "valid", alias = "validation_passed")]
    passed: bool,
    #[serde(default, alias = "reason", alias = "validation_feedback")]
    feedback: Option<String>,
}

/// Turn critic output into a verdict.
///
/// ```
/// use quill_pipeline::validation::parse_verdict;
///
/// let v = parse_verdict("```json\n{\"passed\": false, \"feedback\": \"Too formal.\"}\n```");
/// assert!(!v.passed);
/// assert_eq!(v.feedback, "Too formal.");
///
/// assert!(parse_verdict("PASS").passed);
/// assert_eq!(parse_verdict("FAIL: missing call to action").feedback, "missing call to action");
/// ```
pub fn parse_verdict(text: &str) -> ValidationVerdict {
    let text = text.trim();

    if let Some(json) = extract_json_block(text) {
        if let Ok(wire) = serde_json::from_str::<VerdictWire>(json) {
            return if wire.passed {
                ValidationVerdict::pass()
            } else {
                ValidationVerdict::fail(wire.feedback.unwrap_or_default())
            };
        }
    }

    if let Some(verdict) = parse_keyword_line(text) {
        return verdict;
    }

    ValidationVerdict::fail(text)
}

fn extract_json_block(text: &str) -> Option<&str> {
    static FENCED: OnceLock<Option<Regex>> = OnceLock::new();
    static BARE: OnceLock<Option<Regex>> = OnceLock::new();

    let fenced = FENCED
        .get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").ok())
        .as_ref()?;
    if let Some(m) = fenced.captures(text).and_then(|c| c.get(1)) {
        return Some(m.as_str());
    }
    BARE.get_or_init(|| Regex::new(r"(?s)(\{.*\})").ok())
        .as_ref()?
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn parse_keyword_line(text: &str) -> Option<ValidationVerdict> {
    let mut lines = text.lines().map(str::trim).skip_while(|l| l.is_empty());
    let first = lines.next()?.trim_start_matches(['*', '#', '`', ' ']);

    let word_end = first
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(first.len());
    let word = first[..word_end].to_ascii_uppercase();
    let rest_of_line = first[word_end..].trim_start_matches(['*', '`', ':', '-', '.', ' ']);

    match word.as_str() {
        "PASS" | "PASSED" => Some(ValidationVerdict::pass()),
        "FAIL" | "FAILED" => {
            let mut feedback = rest_of_line.trim().to_string();
            let remaining: Vec<&str> = lines.collect();
            let remaining = remaining.join("\n");
            if !remaining.trim().is_empty() {
                if !feedback.is_empty() {
                    feedback.push('\n');
                }
                feedback.push_str(remaining.trim());
            }
            Some(ValidationVerdict::fail(feedback))
        }
        _ => None,
    }
}
