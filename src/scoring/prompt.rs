//! SMART evaluation prompt
//!
//! Builds the instruction prompt sent to the model: a fixed evaluator role,
//! a 0-10 rubric for each dimension, and a strict JSON reply contract. The
//! result is wrapped in the chat template of the target model family.

use crate::llm::template_for;
use crate::types::Context;

/// System instruction for the evaluator role
const SYSTEM_PROMPT: &str = "You are an expert HR analyst specializing in evaluating employee objectives using the SMART framework.";

/// User turn template. `{context}` and `{objective}` are substituted.
const EVALUATION_PROMPT: &str = r#"{context}

Evaluate this objective using SMART criteria:
"{objective}"

SCORING GUIDE (0-10 scale):

1. SPECIFIC (0-10):
   - 10: Crystal clear with all details (what, why, who, where)
   - 5: Somewhat clear but missing details
   - 0: Vague and ambiguous

2. MEASURABLE (0-10):
   - 10: Concrete metrics with numbers/percentages
   - 5: Some indicators but not fully quantifiable
   - 0: No way to measure success

3. ACHIEVABLE (0-10):
   - 10: Challenging but realistic with available resources
   - 5: Uncertain feasibility
   - 0: Impossible or too easy

4. RELEVANT (0-10):
   - 10: Directly aligned with business goals
   - 5: Tangentially related
   - 0: Irrelevant to role/company

5. TIME-BOUND (0-10):
   - 10: Specific deadline with clear timeline
   - 5: Vague timeframe (e.g., "soon", "eventually")
   - 0: No time reference

Respond ONLY with valid JSON in this exact format (no additional text):
{
  "scores": {
    "specific": 0-10,
    "measurable": 0-10,
    "achievable": 0-10,
    "relevant": 0-10,
    "time_bound": 0-10
  },
  "feedback": {
    "specific": "brief explanation",
    "measurable": "brief explanation",
    "achievable": "brief explanation",
    "relevant": "brief explanation",
    "time_bound": "brief explanation"
  },
  "strengths": ["strength1", "strength2"],
  "improvements": ["improvement1", "improvement2"],
  "suggested_revision": "improved objective or null"
}"#;

/// Render the context block. Every field is always present; unset ones show
/// the "Not specified" placeholder.
fn render_context(context: Option<&Context>) -> String {
    let empty = Context::default();
    let ctx = context.unwrap_or(&empty);
    format!(
        "Context Information:\n- Employee Role: {}\n- Department: {}\n- Time Period: {}",
        ctx.role_or_default(),
        ctx.department_or_default(),
        ctx.period_or_default(),
    )
}

/// Build the user turn (context, objective, rubric, reply contract)
pub fn build_user_prompt(objective: &str, context: Option<&Context>) -> String {
    // Objective last so braces or placeholders inside it are never re-substituted
    EVALUATION_PROMPT
        .replace("{context}", &render_context(context))
        .replace("{objective}", objective)
}

/// Build the full prompt for `objective`, wrapped for the model family named
/// by `model_family_hint`
pub fn build_prompt(objective: &str, context: Option<&Context>, model_family_hint: &str) -> String {
    let template = template_for(model_family_hint);
    template.render(SYSTEM_PROMPT, &build_user_prompt(objective, context))
}
