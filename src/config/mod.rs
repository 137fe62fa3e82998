//! Scorer Configuration Module
//!
//! Model location and sampling parameters loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `SMART_SCORER_CONFIG` environment variable (path to TOML file)
//! 2. `smart_scorer.toml` in the current working directory
//! 3. Built-in defaults
//!
//! `SMART_MODEL_PATH` overrides `model.path` after loading.
//!
//! ```ignore
//! let config = ScorerConfig::load();
//! let backend = LlmFactory::create(&config.model.path, config.model.family_hint(), config.model.max_seq_len).await?;
//! ```

mod scorer_config;
pub mod validation;

pub use scorer_config::*;
