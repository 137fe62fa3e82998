//! Scorer Configuration - model location and sampling parameters as TOML
//!
//! Every struct implements `Default`, so a missing file or a partial file
//! still yields a complete configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::llm::GenerationParams;

/// Environment variable pointing at a config file
pub const CONFIG_ENV_VAR: &str = "SMART_SCORER_CONFIG";

/// Environment variable overriding `model.path`
pub const MODEL_PATH_ENV_VAR: &str = "SMART_MODEL_PATH";

/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "smart_scorer.toml";

/// Default GGUF model location
const DEFAULT_MODEL_PATH: &str = "models/mistral-7b-instruct-v0.3.Q4_K_M.gguf";

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for the scorer.
///
/// Load with `ScorerConfig::load()` which searches:
/// 1. `$SMART_SCORER_CONFIG` env var
/// 2. `./smart_scorer.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScorerConfig {
    /// Model location and context window
    #[serde(default)]
    pub model: ModelConfig,

    /// Sampling parameters for every generation call
    #[serde(default)]
    pub generation: GenerationParams,
}

/// Which model to load and how to talk to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Path to a GGUF model file
    #[serde(default = "default_model_path")]
    pub path: String,

    /// Model family for the chat template; falls back to `path`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    /// Context window allocated at load time
    #[serde(default = "default_max_seq_len")]
    pub max_seq_len: usize,
}

fn default_model_path() -> String {
    DEFAULT_MODEL_PATH.to_string()
}

fn default_max_seq_len() -> usize {
    4096
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            family: None,
            max_seq_len: default_max_seq_len(),
        }
    }
}

impl ModelConfig {
    /// Hint used to select the chat template
    pub fn family_hint(&self) -> &str {
        self.family.as_deref().unwrap_or(&self.path)
    }
}

impl ScorerConfig {
    /// Load configuration using the standard search order:
    /// 1. `$SMART_SCORER_CONFIG` environment variable
    /// 2. `./smart_scorer.toml` in the current working directory
    /// 3. Built-in defaults
    ///
    /// `$SMART_MODEL_PATH` then overrides `model.path`.
    pub fn load() -> Self {
        let mut config = Self::load_from_search_path();
        config.apply_env_overrides();
        config
    }

    fn load_from_search_path() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded scorer config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        // 2. Check ./smart_scorer.toml
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded scorer config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        // 3. Defaults
        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys are logged as warnings.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `$SMART_MODEL_PATH` if set and non-empty
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var(MODEL_PATH_ENV_VAR) {
            if !path.trim().is_empty() {
                info!(model_path = %path, "Model path overridden by {}", MODEL_PATH_ENV_VAR);
                self.model.path = path;
            }
        }
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate sampling and model parameters, reporting every problem at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.generation;
        let mut errors: Vec<String> = Vec::new();

        if !(0.0..=1.0).contains(&g.temperature) {
            errors.push(format!(
                "generation.temperature = {} must be within [0, 1]",
                g.temperature
            ));
        }
        if !(g.top_p > 0.0 && g.top_p <= 1.0) {
            errors.push(format!(
                "generation.top_p = {} must be within (0, 1]",
                g.top_p
            ));
        }
        if g.max_new_tokens == 0 {
            errors.push("generation.max_new_tokens must be > 0".to_string());
        }
        if self.model.max_seq_len == 0 {
            errors.push("model.max_seq_len must be > 0".to_string());
        }
        if self.model.path.trim().is_empty() {
            errors.push("model.path must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}
