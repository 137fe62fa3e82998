//! SMART Scoring Pipeline
//!
//! Objective + context → prompt → model reply → extracted JSON → scored result.
//!
//! ## Stages
//!
//! - **prompt**: rubric and reply contract, wrapped per model family
//! - **extract**: layered JSON recovery that never fails
//! - **aggregate**: score validation, weighting, feedback assembly
//! - **batch**: sequential per-item pipeline with failure isolation
//!
//! [`SmartScorer`] ties the stages to one loaded backend.

pub mod aggregate;
pub mod batch;
pub mod extract;
pub mod prompt;

pub use aggregate::aggregate;
pub use batch::run_batch;
pub use extract::{canonical_default, extract_structured};
pub use prompt::build_prompt;

use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::llm::{GenerationParams, LlmBackend};
use crate::types::{BatchItem, Context, ObjectiveInput, SmartResult};

// ============================================================================
// Error Types
// ============================================================================

/// Errors surfaced by the scoring pipeline
#[derive(Error, Debug)]
pub enum ScoringError {
    /// The backend failed or timed out
    #[error("Generation failed: {0:#}")]
    Generation(#[source] anyhow::Error),

    /// A required top-level key was absent from an otherwise parseable reply
    #[error("Malformed model reply: missing '{missing}' object")]
    MalformedScore { missing: &'static str },
}

// ============================================================================
// Single-Objective Pipeline
// ============================================================================

/// Run the full pipeline for one objective against `backend`
pub async fn score_objective(
    backend: &dyn LlmBackend,
    params: &GenerationParams,
    model_family_hint: &str,
    objective: &str,
    context: Option<&Context>,
) -> Result<SmartResult, ScoringError> {
    let start = Instant::now();
    let prompt = build_prompt(objective, context, model_family_hint);

    let response = backend
        .generate(&prompt, params)
        .await
        .map_err(ScoringError::Generation)?;

    let extracted = extract_structured(&response);
    let result = aggregate(&extracted).map_err(|e| {
        let preview: String = response.chars().take(500).collect();
        tracing::error!(error = %e, raw_preview = %preview, "Error parsing model reply");
        e
    })?;

    tracing::debug!(
        overall = result.overall,
        degraded = result.is_degraded(),
        latency_ms = start.elapsed().as_millis() as u64,
        "Objective scored"
    );

    Ok(result)
}

// ============================================================================
// Scorer Facade
// ============================================================================

/// Scores objectives against one loaded model
pub struct SmartScorer {
    backend: Arc<dyn LlmBackend>,
    params: GenerationParams,
    model_family_hint: String,
}

impl SmartScorer {
    /// `model_family_hint` selects the chat template (usually the model
    /// path or id)
    pub fn new(
        backend: Arc<dyn LlmBackend>,
        params: GenerationParams,
        model_family_hint: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            params,
            model_family_hint: model_family_hint.into(),
        }
    }

    /// Score a single objective.
    ///
    /// # Errors
    ///
    /// Propagates [`ScoringError::Generation`] and
    /// [`ScoringError::MalformedScore`]. Unparseable replies are not errors;
    /// they produce a degraded result.
    pub async fn score(
        &self,
        objective: &str,
        context: Option<&Context>,
    ) -> Result<SmartResult, ScoringError> {
        score_objective(
            self.backend.as_ref(),
            &self.params,
            &self.model_family_hint,
            objective,
            context,
        )
        .await
    }

    /// Score objectives one at a time, in order. Never fails as a whole.
    pub async fn score_batch(&self, items: &[ObjectiveInput]) -> Vec<BatchItem> {
        run_batch(
            self.backend.as_ref(),
            &self.params,
            &self.model_family_hint,
            items,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records the prompt it receives and replies with a fixed string
    struct FixedReply {
        reply: String,
        last_prompt: Mutex<Option<String>>,
    }

    impl FixedReply {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                last_prompt: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl LlmBackend for FixedReply {
        async fn generate(&self, prompt: &str, _params: &GenerationParams) -> anyhow::Result<String> {
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            Ok(self.reply.clone())
        }

        fn backend_name(&self) -> &'static str {
            "fixed"
        }
    }

    struct Failing;

    #[async_trait]
    impl LlmBackend for Failing {
        async fn generate(&self, _prompt: &str, _params: &GenerationParams) -> anyhow::Result<String> {
            anyhow::bail!("Response timeout after 300 seconds")
        }

        fn backend_name(&self) -> &'static str {
            "failing"
        }
    }

    const REPLY: &str = r#"Here is the evaluation:
```json
{"scores":{"specific":8,"measurable":9,"achievable":7,"relevant":6,"time_bound":8},
 "feedback":{"specific":"a","measurable":"b","achievable":"c","relevant":"d","time_bound":"e"},
 "strengths":["Clear metric"],"improvements":["Add owner"],"suggested_revision":null}
```"#;

    #[tokio::test]
    async fn test_score_end_to_end() {
        let backend = Arc::new(FixedReply::new(REPLY));
        let scorer = SmartScorer::new(backend.clone(), GenerationParams::default(), "qwen2.5-7b");
        let ctx = Context::new(Some("Product Manager".to_string()), None, None);

        let result = scorer.score("Launch 3 features by Q2", Some(&ctx)).await.unwrap();
        assert_eq!(result.overall, 7.75);
        assert_eq!(result.feedback.strengths, vec!["Clear metric"]);

        let prompt = backend.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.starts_with("<|im_start|>system\n"));
        assert!(prompt.contains("Launch 3 features by Q2"));
        assert!(prompt.contains("- Employee Role: Product Manager"));
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_degraded_not_error() {
        let scorer = SmartScorer::new(
            Arc::new(FixedReply::new("I'd rate this objective fairly well overall.")),
            GenerationParams::default(),
            "mistral",
        );
        let result = scorer.score("Increase sales", None).await.unwrap();
        assert!(result.is_degraded());
        assert_eq!(result.overall, 5.0);
    }

    #[tokio::test]
    async fn test_structurally_different_reply_is_malformed() {
        let scorer = SmartScorer::new(
            Arc::new(FixedReply::new(r#"{"rating": 7, "comment": "fine"}"#)),
            GenerationParams::default(),
            "mistral",
        );
        let err = scorer.score("Increase sales", None).await.unwrap_err();
        assert!(matches!(err, ScoringError::MalformedScore { missing: "scores" }));
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let scorer = SmartScorer::new(Arc::new(Failing), GenerationParams::default(), "mistral");
        let err = scorer.score("Increase sales", None).await.unwrap_err();
        assert!(matches!(err, ScoringError::Generation(_)));
        assert!(err.to_string().contains("timeout"));
    }
}
