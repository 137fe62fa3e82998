//! Batch Scoring Integration Tests
//!
//! Drives `SmartScorer` end to end with a scripted backend that replays a
//! fixed sequence of model replies (or failures), one per generation call.

use anyhow::Result;
use async_trait::async_trait;
use smart_scorer::types::{BatchOutcome, Context, ObjectiveId, ObjectiveInput, PARSE_FAILURE_SENTINEL};
use smart_scorer::{GenerationParams, LlmBackend, SmartScorer};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Replays scripted replies in call order and records every prompt
struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new(replies: Vec<Result<&str, &str>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn generate(&self, prompt: &str, _params: &GenerationParams) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => anyhow::bail!("{message}"),
            None => anyhow::bail!("script exhausted"),
        }
    }

    fn backend_name(&self) -> &'static str {
        "scripted"
    }
}

fn reply(s: u8, m: u8, a: u8, r: u8, t: u8) -> String {
    format!(
        r#"```json
{{
  "scores": {{"specific": {s}, "measurable": {m}, "achievable": {a}, "relevant": {r}, "time_bound": {t}}},
  "feedback": {{
    "specific": "States what and who",
    "measurable": "Uses a numeric target",
    "achievable": "Plausible in the period",
    "relevant": "Matches the role",
    "time_bound": "Has a deadline"
  }},
  "strengths": ["Numeric target"],
  "improvements": ["Name the baseline"],
  "suggested_revision": null
}}
```"#
    )
}

fn scorer(backend: Arc<ScriptedBackend>) -> SmartScorer {
    SmartScorer::new(backend, GenerationParams::default(), "mistral-7b-instruct-v0.3")
}

fn three_objectives() -> Vec<ObjectiveInput> {
    vec![
        ObjectiveInput::new("Increase sales").with_context(Context::new(
            Some("Sales Manager".to_string()),
            Some("Sales".to_string()),
            Some("Q1 2025".to_string()),
        )),
        ObjectiveInput::new(
            "Increase customer satisfaction score from 7.2 to 8.5 by June 30, 2025",
        ),
        ObjectiveInput::new(
            "Launch 3 new analytics features by Q2 end, validated with 1000+ users",
        ),
    ]
}

#[tokio::test]
async fn failed_generation_is_isolated_to_its_item() {
    let first = reply(3, 2, 6, 7, 1);
    let third = reply(9, 9, 8, 9, 9);
    let backend = ScriptedBackend::new(vec![
        Ok(first.as_str()),
        Err("Response timeout after 300 seconds"),
        Ok(third.as_str()),
    ]);

    let results = scorer(backend.clone()).score_batch(&three_objectives()).await;

    assert_eq!(results.len(), 3);
    assert!(results[0].is_success());
    assert!(results[2].is_success());

    let error = results[1].error().expect("second item should fail");
    assert!(!error.is_empty());
    assert!(error.contains("timeout"));

    // All three items reached the backend
    assert_eq!(backend.prompts().len(), 3);
}

#[tokio::test]
async fn batch_preserves_order_and_assigns_positional_ids() {
    let replies: Vec<String> = vec![reply(1, 1, 1, 1, 1), reply(5, 5, 5, 5, 5), reply(9, 9, 9, 9, 9)];
    let backend = ScriptedBackend::new(replies.iter().map(|r| Ok(r.as_str())).collect());

    let items = three_objectives();
    let results = scorer(backend).score_batch(&items).await;

    let ids: Vec<ObjectiveId> = results.iter().map(|r| r.id.clone()).collect();
    assert_eq!(
        ids,
        vec![ObjectiveId::Number(0), ObjectiveId::Number(1), ObjectiveId::Number(2)]
    );
    for (item, result) in items.iter().zip(&results) {
        assert_eq!(item.objective, result.objective);
    }

    let overall: Vec<f64> = results
        .iter()
        .map(|r| r.result().map(|s| s.overall).unwrap_or(f64::NAN))
        .collect();
    assert_eq!(overall, vec![1.0, 5.0, 9.0]);
}

#[tokio::test]
async fn malformed_reply_is_recorded_as_item_error() {
    let good = reply(7, 7, 7, 7, 7);
    let backend = ScriptedBackend::new(vec![
        Ok(r#"{"verdict": "looks fine"}"#),
        Ok(good.as_str()),
    ]);

    let items = vec![ObjectiveInput::new("Be better"), ObjectiveInput::new("Ship v2 by March 1")];
    let results = scorer(backend).score_batch(&items).await;

    match &results[0].outcome {
        BatchOutcome::Error { error } => assert!(error.contains("scores")),
        other => panic!("expected error outcome, got {other:?}"),
    }
    assert_eq!(results[1].result().map(|r| r.overall), Some(7.0));
}

#[tokio::test]
async fn unparseable_reply_degrades_without_failing_the_item() {
    let backend = ScriptedBackend::new(vec![Ok("The objective is decent but vague.")]);

    let results = scorer(backend).score_batch(&[ObjectiveInput::new("Increase sales")]).await;

    let result = results[0].result().expect("degraded result is still a success");
    assert!(result.is_degraded());
    assert_eq!(result.overall, 5.0);
    assert_eq!(result.feedback.specific, PARSE_FAILURE_SENTINEL);
    assert_eq!(result.feedback.strengths, vec!["Parse error occurred"]);
}

#[tokio::test]
async fn trailing_comma_reply_scores_without_fallback() {
    let raw = r#"{"scores":{"specific":8,"measurable":9,"achievable":7,"relevant":6,"time_bound":8},"feedback":{"specific":"ok","measurable":"ok","achievable":"ok","relevant":"ok","time_bound":"ok",}}"#;
    let backend = ScriptedBackend::new(vec![Ok(raw)]);

    let result = scorer(backend).score("Increase sales by 10% in Q3", None).await.unwrap();

    assert!(!result.is_degraded());
    assert_eq!(result.overall, 7.75);
    assert!(result.feedback.strengths.is_empty());
    assert!(result.feedback.suggested_revision.is_none());
}

#[tokio::test]
async fn prompts_carry_context_and_family_template() {
    let replies: Vec<String> = (0..3).map(|_| reply(5, 5, 5, 5, 5)).collect();
    let backend = ScriptedBackend::new(replies.iter().map(|r| Ok(r.as_str())).collect());

    scorer(backend.clone()).score_batch(&three_objectives()).await;

    let prompts = backend.prompts();
    assert!(prompts.iter().all(|p| p.starts_with("[INST] ") && p.ends_with(" [/INST]")));
    assert!(prompts[0].contains("- Employee Role: Sales Manager"));
    assert!(prompts[1].contains("- Employee Role: Not specified"));
    assert!(prompts[2].contains("1000+ users"));
}

#[tokio::test]
async fn batch_results_serialize_with_status() {
    let ok = reply(6, 6, 6, 6, 6);
    let backend = ScriptedBackend::new(vec![Ok(ok.as_str()), Err("model crashed")]);
    let items = vec![
        ObjectiveInput::new("A").with_id(ObjectiveId::Text("obj-a".to_string())),
        ObjectiveInput::new("B"),
    ];

    let results = scorer(backend).score_batch(&items).await;
    let json = serde_json::to_value(&results).unwrap();

    assert_eq!(json[0]["id"], "obj-a");
    assert_eq!(json[0]["status"], "success");
    assert_eq!(json[0]["scores"]["overall"], 6.0);
    assert_eq!(json[1]["id"], 1);
    assert_eq!(json[1]["status"], "error");
    assert!(json[1]["error"].as_str().unwrap().contains("model crashed"));
}
