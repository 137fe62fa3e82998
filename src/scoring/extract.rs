//! Model Reply Extraction
//!
//! Recovers the JSON judgment from a raw model reply. Models wrap their
//! answer in prose, markdown fences, or emit slightly invalid JSON, so
//! extraction narrows the text to the most likely JSON span and then runs an
//! ordered list of parse strategies. The last resort is the canonical
//! default judgment, so extraction always yields a value.

use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;

use crate::types::{Dimension, DEFAULT_DIMENSION_SCORE, PARSE_FAILURE_SENTINEL};

/// Longest prefix of the raw reply included in degradation warnings
const LOG_PREVIEW_CHARS: usize = 500;

/// A parse strategy: returns a JSON object or `None`
type Strategy = fn(&str) -> Option<Value>;

/// Parse strategies, tried in order on the selected candidate text
const STRATEGIES: &[(&str, Strategy)] = &[
    ("direct", parse_direct),
    ("trailing_commas", parse_without_trailing_commas),
];

fn fenced_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("fenced block pattern is valid")
    })
}

fn brace_span_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("brace span pattern is valid"))
}

fn trailing_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",(\s*[}\]])").expect("trailing comma pattern is valid"))
}

// ============================================================================
// Candidate Selection
// ============================================================================

/// Contents of a ```json (or untagged) fenced block holding an object
fn fenced_block(text: &str) -> Option<&str> {
    fenced_block_re()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Widest brace-delimited span: first `{` to last `}`
fn widest_brace_span(text: &str) -> Option<&str> {
    brace_span_re().find(text).map(|m| m.as_str())
}

/// Narrow the reply to the text most likely to hold the JSON object
fn select_candidate(text: &str) -> &str {
    fenced_block(text)
        .or_else(|| widest_brace_span(text))
        .unwrap_or(text)
        .trim()
}

// ============================================================================
// Parse Strategies
// ============================================================================

fn parse_object(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

fn parse_direct(text: &str) -> Option<Value> {
    parse_object(text)
}

/// Strip commas directly before a closing brace or bracket, then parse
fn parse_without_trailing_commas(text: &str) -> Option<Value> {
    let cleaned = trailing_comma_re().replace_all(text, "$1");
    parse_object(&cleaned)
}

// ============================================================================
// Public API
// ============================================================================

/// Judgment substituted when no parse strategy succeeds
pub fn canonical_default() -> Value {
    let scores: serde_json::Map<String, Value> = Dimension::ALL
        .iter()
        .map(|d| (d.key().to_string(), json!(DEFAULT_DIMENSION_SCORE)))
        .collect();
    let feedback: serde_json::Map<String, Value> = Dimension::ALL
        .iter()
        .map(|d| (d.key().to_string(), json!(PARSE_FAILURE_SENTINEL)))
        .collect();

    json!({
        "scores": scores,
        "feedback": feedback,
        "strengths": ["Parse error occurred"],
        "improvements": ["Please try again"],
        "suggested_revision": null,
    })
}

/// Recover the structured judgment from a raw model reply.
///
/// Never fails: when no strategy yields a JSON object the canonical default
/// is returned and a warning is logged.
pub fn extract_structured(raw_text: &str) -> Value {
    let candidate = select_candidate(raw_text);

    for (name, strategy) in STRATEGIES {
        if let Some(value) = strategy(candidate) {
            tracing::debug!(strategy = name, "Extracted JSON from model reply");
            return value;
        }
    }

    let preview: String = raw_text.chars().take(LOG_PREVIEW_CHARS).collect();
    tracing::warn!(
        raw_length = raw_text.len(),
        raw_preview = %preview,
        "Failed to parse model reply, using default judgment"
    );
    canonical_default()
}
