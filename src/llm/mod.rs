//! LLM Backend Module
//!
//! Provides the text-generation boundary the scorer talks to, plus the
//! mistral.rs implementation that runs GGUF models locally.
//!
//! ## Hardware Detection
//!
//! On load the backend checks for CUDA availability:
//! - **GPU mode** (requires `cuda` feature + CUDA runtime)
//! - **CPU mode** (default `llm` feature)
//!
//! The scorer only depends on [`LlmBackend`]; tests substitute scripted
//! backends for the real model.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod template;
pub use template::{template_for, ChatTemplate, CHAT_TEMPLATES, GENERIC_TEMPLATE};

#[cfg(feature = "llm")]
mod mistral_rs;
#[cfg(feature = "llm")]
pub use mistral_rs::{is_cuda_available, MistralRsBackend};

/// Sampling parameters for one generation call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    /// Maximum tokens to generate
    pub max_new_tokens: usize,
    /// Sampling temperature (0.0-1.0). 0.0 selects greedy decoding.
    pub temperature: f64,
    /// Nucleus sampling cutoff
    pub top_p: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 1024,
            temperature: 0.3,
            top_p: 0.9,
        }
    }
}

impl GenerationParams {
    /// Sampling is enabled only for a positive temperature
    pub fn do_sample(&self) -> bool {
        self.temperature > 0.0
    }
}

/// Unified trait for LLM backends
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Generate a completion for an already-templated prompt
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String>;

    /// Get the backend name for logging
    fn backend_name(&self) -> &'static str;

    /// Check if this backend uses GPU
    fn uses_gpu(&self) -> bool {
        false
    }
}

/// Factory for creating LLM backends
#[cfg(feature = "llm")]
pub struct LlmFactory;

#[cfg(feature = "llm")]
impl LlmFactory {
    /// Load a GGUF model as the scoring backend
    ///
    /// # Arguments
    ///
    /// * `model_path` - Path to GGUF model file
    /// * `family_hint` - Model family used to pick stop sequences
    /// * `max_seq_len` - Context window to allocate
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded
    pub async fn create(
        model_path: &str,
        family_hint: &str,
        max_seq_len: usize,
    ) -> Result<std::sync::Arc<MistralRsBackend>> {
        tracing::info!(
            model_path = %model_path,
            "Attempting to load Mistral.rs backend"
        );

        let backend = MistralRsBackend::load(model_path, family_hint, max_seq_len).await?;

        tracing::info!(
            backend = backend.backend_name(),
            uses_gpu = backend.uses_gpu(),
            "Mistral.rs backend loaded successfully"
        );

        Ok(std::sync::Arc::new(backend))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = GenerationParams::default();
        assert_eq!(params.max_new_tokens, 1024);
        assert_eq!(params.temperature, 0.3);
        assert_eq!(params.top_p, 0.9);
        assert!(params.do_sample());
    }

    #[test]
    fn test_zero_temperature_is_greedy() {
        let params = GenerationParams {
            temperature: 0.0,
            ..GenerationParams::default()
        };
        assert!(!params.do_sample());
    }
}
