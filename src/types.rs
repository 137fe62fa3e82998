//! Shared data structures for SMART objective evaluation
//!
//! This module defines the values that flow through the scoring pipeline:
//! - Input: `ObjectiveInput` (objective text, optional `Context`, optional id)
//! - Scoring: `Dimension`, `ScoreSet`, `FeedbackSet`
//! - Output: `SmartResult` (single objective) and `BatchItem` (batch mode)

use serde::{Deserialize, Serialize};

/// Placeholder rendered in prompts for context fields the caller left out
pub const NOT_SPECIFIED: &str = "Not specified";

/// Feedback text substituted when the model reply could not be parsed
pub const PARSE_FAILURE_SENTINEL: &str = "Unable to parse model output";

/// Score assigned to every dimension when no usable score set was recovered
pub const DEFAULT_DIMENSION_SCORE: f64 = 5.0;

// ============================================================================
// Input
// ============================================================================

/// Optional metadata supplied alongside an objective
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
}

impl Context {
    pub fn new(
        role: Option<String>,
        department: Option<String>,
        period: Option<String>,
    ) -> Self {
        Self {
            role,
            department,
            period,
        }
    }

    /// Employee role, or the placeholder when unset
    pub fn role_or_default(&self) -> &str {
        self.role.as_deref().unwrap_or(NOT_SPECIFIED)
    }

    pub fn department_or_default(&self) -> &str {
        self.department.as_deref().unwrap_or(NOT_SPECIFIED)
    }

    pub fn period_or_default(&self) -> &str {
        self.period.as_deref().unwrap_or(NOT_SPECIFIED)
    }

    /// True when none of the three fields is set
    pub fn is_empty(&self) -> bool {
        self.role.is_none() && self.department.is_none() && self.period.is_none()
    }
}

/// Caller-supplied identifier for a batch entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectiveId {
    Number(i64),
    Text(String),
}

impl From<usize> for ObjectiveId {
    fn from(index: usize) -> Self {
        ObjectiveId::Number(i64::try_from(index).unwrap_or(i64::MAX))
    }
}

impl std::fmt::Display for ObjectiveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectiveId::Number(n) => write!(f, "{}", n),
            ObjectiveId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One objective to evaluate in a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveInput {
    pub objective: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectiveId>,
}

impl ObjectiveInput {
    pub fn new(objective: impl Into<String>) -> Self {
        Self {
            objective: objective.into(),
            context: None,
            id: None,
        }
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_id(mut self, id: ObjectiveId) -> Self {
        self.id = Some(id);
        self
    }
}

// ============================================================================
// Scoring Dimensions
// ============================================================================

/// The five SMART rubric dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Specific,
    Measurable,
    Achievable,
    Relevant,
    TimeBound,
}

impl Dimension {
    /// All dimensions in rubric order
    pub const ALL: [Dimension; 5] = [
        Dimension::Specific,
        Dimension::Measurable,
        Dimension::Achievable,
        Dimension::Relevant,
        Dimension::TimeBound,
    ];

    /// Key used in the model's JSON reply
    pub fn key(self) -> &'static str {
        match self {
            Dimension::Specific => "specific",
            Dimension::Measurable => "measurable",
            Dimension::Achievable => "achievable",
            Dimension::Relevant => "relevant",
            Dimension::TimeBound => "time_bound",
        }
    }

    /// Contribution to the overall score. Weights sum to 1.0, with
    /// measurability weighted highest.
    pub fn weight(self) -> f64 {
        match self {
            Dimension::Specific => 0.20,
            Dimension::Measurable => 0.25,
            Dimension::Achievable => 0.20,
            Dimension::Relevant => 0.15,
            Dimension::TimeBound => 0.20,
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dimension::Specific => write!(f, "Specific"),
            Dimension::Measurable => write!(f, "Measurable"),
            Dimension::Achievable => write!(f, "Achievable"),
            Dimension::Relevant => write!(f, "Relevant"),
            Dimension::TimeBound => write!(f, "Time-bound"),
        }
    }
}

/// Per-dimension scores, nominally in [0, 10]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSet {
    pub specific: f64,
    pub measurable: f64,
    pub achievable: f64,
    pub relevant: f64,
    pub time_bound: f64,
}

impl ScoreSet {
    /// Score set used when the model reply carried no usable scores
    pub fn fallback() -> Self {
        Self {
            specific: DEFAULT_DIMENSION_SCORE,
            measurable: DEFAULT_DIMENSION_SCORE,
            achievable: DEFAULT_DIMENSION_SCORE,
            relevant: DEFAULT_DIMENSION_SCORE,
            time_bound: DEFAULT_DIMENSION_SCORE,
        }
    }

    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Specific => self.specific,
            Dimension::Measurable => self.measurable,
            Dimension::Achievable => self.achievable,
            Dimension::Relevant => self.relevant,
            Dimension::TimeBound => self.time_bound,
        }
    }

    /// Weighted overall score, rounded to 2 decimal places
    pub fn weighted_overall(&self) -> f64 {
        let raw: f64 = Dimension::ALL
            .iter()
            .map(|&d| self.get(d) * d.weight())
            .sum();
        round_to_hundredths(raw)
    }

    /// Dimensions whose score falls outside [0, 10]
    pub fn out_of_range(&self) -> Vec<Dimension> {
        Dimension::ALL
            .iter()
            .copied()
            .filter(|&d| !(0.0..=10.0).contains(&self.get(d)))
            .collect()
    }
}

/// Two-decimal rounding with ties to even
fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Natural-language feedback accompanying a score set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSet {
    pub specific: String,
    pub measurable: String,
    pub achievable: String,
    pub relevant: String,
    pub time_bound: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub suggested_revision: Option<String>,
}

impl FeedbackSet {
    pub fn get(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::Specific => &self.specific,
            Dimension::Measurable => &self.measurable,
            Dimension::Achievable => &self.achievable,
            Dimension::Relevant => &self.relevant,
            Dimension::TimeBound => &self.time_bound,
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// Final evaluation of one objective
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartResult {
    pub specific: f64,
    pub measurable: f64,
    pub achievable: f64,
    pub relevant: f64,
    pub time_bound: f64,
    pub overall: f64,
    pub feedback: FeedbackSet,
}

impl SmartResult {
    /// Assemble a result; `overall` is derived from the scores
    pub fn new(scores: ScoreSet, feedback: FeedbackSet) -> Self {
        Self {
            specific: scores.specific,
            measurable: scores.measurable,
            achievable: scores.achievable,
            relevant: scores.relevant,
            time_bound: scores.time_bound,
            overall: scores.weighted_overall(),
            feedback,
        }
    }

    pub fn scores(&self) -> ScoreSet {
        ScoreSet {
            specific: self.specific,
            measurable: self.measurable,
            achievable: self.achievable,
            relevant: self.relevant,
            time_bound: self.time_bound,
        }
    }

    pub fn score(&self, dimension: Dimension) -> f64 {
        self.scores().get(dimension)
    }

    /// True when the model reply could not be parsed and the default
    /// judgment was substituted
    pub fn is_degraded(&self) -> bool {
        Dimension::ALL
            .iter()
            .any(|&d| self.feedback.get(d) == PARSE_FAILURE_SENTINEL)
    }
}

/// Outcome of one batch entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BatchOutcome {
    Success { scores: SmartResult },
    Error { error: String },
}

/// A processed batch entry, correlating input to outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub id: ObjectiveId,
    pub objective: String,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

impl BatchItem {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Success { .. })
    }

    pub fn result(&self) -> Option<&SmartResult> {
        match &self.outcome {
            BatchOutcome::Success { scores } => Some(scores),
            BatchOutcome::Error { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            BatchOutcome::Success { .. } => None,
            BatchOutcome::Error { error } => Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = Dimension::ALL.iter().map(|d| d.weight()).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_overall() {
        let scores = ScoreSet {
            specific: 8.0,
            measurable: 9.0,
            achievable: 7.0,
            relevant: 6.0,
            time_bound: 8.0,
        };
        // 1.6 + 2.25 + 1.4 + 0.9 + 1.6
        assert_eq!(scores.weighted_overall(), 7.75);
    }

    #[test]
    fn test_fallback_overall_is_five() {
        assert_eq!(ScoreSet::fallback().weighted_overall(), 5.0);
    }

    #[test]
    fn test_overall_ties_round_to_even() {
        // 0.15 * 7.5 = 1.125
        let scores = ScoreSet {
            specific: 0.0,
            measurable: 0.0,
            achievable: 0.0,
            relevant: 7.5,
            time_bound: 0.0,
        };
        assert_eq!(scores.weighted_overall(), 1.12);
    }

    #[test]
    fn test_dimension_labels() {
        let labels: Vec<String> = Dimension::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(
            labels,
            vec!["Specific", "Measurable", "Achievable", "Relevant", "Time-bound"]
        );
    }

    #[test]
    fn test_out_of_range_detection() {
        let scores = ScoreSet {
            specific: 12.0,
            measurable: -1.0,
            achievable: 10.0,
            relevant: 0.0,
            time_bound: 5.0,
        };
        assert_eq!(
            scores.out_of_range(),
            vec![Dimension::Specific, Dimension::Measurable]
        );
    }

    #[test]
    fn test_context_placeholders() {
        let ctx = Context::new(Some("Sales Manager".to_string()), None, None);
        assert_eq!(ctx.role_or_default(), "Sales Manager");
        assert_eq!(ctx.department_or_default(), NOT_SPECIFIED);
        assert_eq!(ctx.period_or_default(), NOT_SPECIFIED);
        assert!(!ctx.is_empty());
        assert!(Context::default().is_empty());
    }

    #[test]
    fn test_objective_input_from_json() {
        let json = r#"[
            {"id": 1, "objective": "Increase sales", "context": {"role": "Sales Manager"}},
            {"id": "q3-ops", "objective": "Cut onboarding time"},
            {"objective": "Ship v2"}
        ]"#;
        let inputs: Vec<ObjectiveInput> = serde_json::from_str(json).unwrap();
        assert_eq!(inputs.len(), 3);
        assert_eq!(inputs[0].id, Some(ObjectiveId::Number(1)));
        assert_eq!(
            inputs[0].context.as_ref().and_then(|c| c.role.as_deref()),
            Some("Sales Manager")
        );
        assert_eq!(inputs[1].id, Some(ObjectiveId::Text("q3-ops".to_string())));
        assert!(inputs[2].id.is_none());
        assert!(inputs[2].context.is_none());
    }

    #[test]
    fn test_batch_item_serialization_shape() {
        let item = BatchItem {
            id: ObjectiveId::Number(2),
            objective: "Ship v2".to_string(),
            outcome: BatchOutcome::Error {
                error: "model timed out".to_string(),
            },
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["id"], 2);
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"], "model timed out");
        assert!(!item.is_success());
        assert_eq!(item.error(), Some("model timed out"));
    }

    #[test]
    fn test_smart_result_degraded_flag() {
        let mut feedback = FeedbackSet::default();
        assert!(!SmartResult::new(ScoreSet::fallback(), feedback.clone()).is_degraded());

        feedback.measurable = PARSE_FAILURE_SENTINEL.to_string();
        assert!(SmartResult::new(ScoreSet::fallback(), feedback).is_degraded());
    }
}
