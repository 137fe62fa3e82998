//! Batch scoring
//!
//! Runs the pipeline over a list of objectives strictly one at a time. A
//! failure on one item is recorded against that item and never aborts the
//! batch.

use tracing::{info, warn};

use super::score_objective;
use crate::llm::{GenerationParams, LlmBackend};
use crate::types::{BatchItem, BatchOutcome, ObjectiveId, ObjectiveInput};

/// Score every item in order. Items without a caller id get their
/// zero-based position.
pub async fn run_batch(
    backend: &dyn LlmBackend,
    params: &GenerationParams,
    model_family_hint: &str,
    items: &[ObjectiveInput],
) -> Vec<BatchItem> {
    let total = items.len();
    let mut results = Vec::with_capacity(total);

    for (idx, item) in items.iter().enumerate() {
        let id = item.id.clone().unwrap_or_else(|| ObjectiveId::from(idx));
        info!(item = idx + 1, total, id = %id, "Processing {}/{}", idx + 1, total);

        let outcome = match score_objective(
            backend,
            params,
            model_family_hint,
            &item.objective,
            item.context.as_ref(),
        )
        .await
        {
            Ok(result) => BatchOutcome::Success { scores: result },
            Err(e) => {
                warn!(id = %id, error = %e, "Objective failed, continuing batch");
                BatchOutcome::Error {
                    error: e.to_string(),
                }
            }
        };

        results.push(BatchItem {
            id,
            objective: item.objective.clone(),
            outcome,
        });
    }

    let succeeded = results.iter().filter(|r| r.is_success()).count();
    info!(
        total,
        succeeded,
        failed = total - succeeded,
        "Completed {} objectives",
        total
    );

    results
}
