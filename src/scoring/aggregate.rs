//! Score aggregation
//!
//! Turns an extracted JSON judgment into a [`SmartResult`]: reads the five
//! dimension scores, computes the weighted overall, and assembles feedback.

use serde_json::{Map, Value};

use super::extract::canonical_default;
use super::ScoringError;
use crate::types::{Dimension, FeedbackSet, ScoreSet, SmartResult};

/// Required top-level keys of a judgment
const SCORES_KEY: &str = "scores";
const FEEDBACK_KEY: &str = "feedback";

/// Coerce a JSON score to f64. Numeric strings count.
fn coerce_score(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Read all five scores, or `None` if any is missing or non-numeric
fn read_scores(scores: &Map<String, Value>) -> Option<ScoreSet> {
    let get = |d: Dimension| scores.get(d.key()).and_then(coerce_score);
    Some(ScoreSet {
        specific: get(Dimension::Specific)?,
        measurable: get(Dimension::Measurable)?,
        achievable: get(Dimension::Achievable)?,
        relevant: get(Dimension::Relevant)?,
        time_bound: get(Dimension::TimeBound)?,
    })
}

fn feedback_text(feedback: &Map<String, Value>, dimension: Dimension) -> String {
    feedback
        .get(dimension.key())
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// String entries of an array field; missing or non-array yields empty
fn string_list(judgment: &Value, key: &str) -> Vec<String> {
    judgment
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Suggested revision; null, empty, and the literal "null" mean none
fn suggested_revision(judgment: &Value) -> Option<String> {
    judgment
        .get("suggested_revision")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"))
        .map(str::to_string)
}

/// Validate an extracted judgment and build the final result.
///
/// # Errors
///
/// Returns [`ScoringError::MalformedScore`] when the `scores` or `feedback`
/// object is absent.
pub fn aggregate(extracted: &Value) -> Result<SmartResult, ScoringError> {
    let scores_obj = extracted
        .get(SCORES_KEY)
        .and_then(Value::as_object)
        .ok_or(ScoringError::MalformedScore { missing: SCORES_KEY })?;
    let feedback_obj = extracted
        .get(FEEDBACK_KEY)
        .and_then(Value::as_object)
        .ok_or(ScoringError::MalformedScore { missing: FEEDBACK_KEY })?;

    // Incomplete scores count as a failed extraction
    let Some(scores) = read_scores(scores_obj) else {
        let shown = Value::Object(scores_obj.clone()).to_string();
        tracing::warn!(
            scores = %shown,
            "Incomplete or non-numeric scores in model reply, using default judgment"
        );
        return aggregate(&canonical_default());
    };

    // Passed through unclamped
    for dimension in scores.out_of_range() {
        tracing::debug!(
            dimension = %dimension,
            score = scores.get(dimension),
            "Dimension score outside [0, 10]"
        );
    }

    let feedback = FeedbackSet {
        specific: feedback_text(feedback_obj, Dimension::Specific),
        measurable: feedback_text(feedback_obj, Dimension::Measurable),
        achievable: feedback_text(feedback_obj, Dimension::Achievable),
        relevant: feedback_text(feedback_obj, Dimension::Relevant),
        time_bound: feedback_text(feedback_obj, Dimension::TimeBound),
        strengths: string_list(extracted, "strengths"),
        improvements: string_list(extracted, "improvements"),
        suggested_revision: suggested_revision(extracted),
    };

    Ok(SmartResult::new(scores, feedback))
}
