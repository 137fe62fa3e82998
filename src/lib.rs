//! SMART Scorer: SMART objective evaluation on local LLMs
//!
//! Scores free-text work objectives against the SMART rubric (Specific,
//! Measurable, Achievable, Relevant, Time-bound) by prompting a locally
//! hosted model and turning its reply into validated numeric scores.
//!
//! ## Architecture
//!
//! - **Scoring**: prompt building, reply extraction, score aggregation, batch runs
//! - **LLM Module**: backend trait, chat templates, mistral.rs GGUF backend
//! - **Config**: TOML configuration for model and sampling parameters

pub mod config;
pub mod llm;
pub mod scoring;
pub mod types;

pub use config::{ConfigError, ScorerConfig};

pub use llm::{GenerationParams, LlmBackend};
#[cfg(feature = "llm")]
pub use llm::{LlmFactory, MistralRsBackend};

pub use scoring::{
    aggregate, build_prompt, extract_structured, run_batch, ScoringError, SmartScorer,
};

pub use types::{
    BatchItem, BatchOutcome, Context, Dimension, FeedbackSet, ObjectiveId, ObjectiveInput,
    ScoreSet, SmartResult,
};
