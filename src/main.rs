//! SMART Scorer CLI
//!
//! Scores work objectives against the SMART rubric with a local GGUF model.
//!
//! # Usage
//!
//! ```bash
//! # Show the prompt that would be sent to the model
//! smart-scorer prompt --objective "Increase sales" --role "Sales Manager"
//!
//! # Score one objective (CPU, auto-detects hardware)
//! cargo run --release -- score --objective "Raise CSAT from 7.2 to 8.5 by June 30"
//!
//! # Score a JSON array of objectives
//! smart-scorer batch --input objectives.json
//!
//! # Re-run extraction on a saved model reply
//! smart-scorer extract reply.txt
//! ```
//!
//! # Environment Variables
//!
//! - `SMART_SCORER_CONFIG`: Path to the TOML config file
//! - `SMART_MODEL_PATH`: Path to the GGUF model (overrides `model.path`)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

use smart_scorer::config::ScorerConfig;
use smart_scorer::types::{Context, ObjectiveInput};
use smart_scorer::{aggregate, build_prompt, extract_structured};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "smart-scorer")]
#[command(about = "SMART objective evaluation on locally-hosted LLMs")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML config file (overrides SMART_SCORER_CONFIG)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Path to the GGUF model file
    #[arg(long, global = true, env = "SMART_MODEL_PATH")]
    model_path: Option<String>,

    /// Model family for the chat template (llama3, mistral, phi, gemma, qwen)
    #[arg(long, global = true)]
    family: Option<String>,

    #[command(subcommand)]
    command: SubCommand,
}

#[derive(Subcommand, Debug)]
enum SubCommand {
    /// Print the prompt built for an objective
    Prompt {
        #[arg(long)]
        objective: String,
        #[command(flatten)]
        context: ContextArgs,
    },

    /// Parse a saved model reply (file or stdin) into a scored result
    Extract {
        /// File holding the raw reply; reads stdin when omitted
        file: Option<PathBuf>,
    },

    /// Score a single objective
    Score {
        #[arg(long)]
        objective: String,
        #[command(flatten)]
        context: ContextArgs,
    },

    /// Score a JSON array of objectives
    Batch {
        /// JSON file: [{"objective": ..., "context": {...}, "id": ...}, ...]
        #[arg(long)]
        input: PathBuf,
    },
}

#[derive(Args, Debug)]
struct ContextArgs {
    /// Employee role
    #[arg(long)]
    role: Option<String>,
    /// Department
    #[arg(long)]
    department: Option<String>,
    /// Evaluation period (e.g. "Q1 2025")
    #[arg(long)]
    period: Option<String>,
}

impl ContextArgs {
    fn into_context(self) -> Option<Context> {
        let ctx = Context::new(self.role, self.department, self.period);
        (!ctx.is_empty()).then_some(ctx)
    }
}

// ============================================================================
// Configuration
// ============================================================================

fn load_config(args: &CliArgs) -> Result<ScorerConfig> {
    let mut config = match &args.config {
        Some(path) => ScorerConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ScorerConfig::load(),
    };

    if let Some(path) = &args.model_path {
        config.model.path = path.clone();
    }
    if let Some(family) = &args.family {
        config.model.family = Some(family.clone());
    }

    Ok(config)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// Scoring
// ============================================================================

#[cfg(feature = "llm")]
async fn build_scorer(config: &ScorerConfig) -> Result<smart_scorer::SmartScorer> {
    let backend = smart_scorer::LlmFactory::create(
        &config.model.path,
        config.model.family_hint(),
        config.model.max_seq_len,
    )
    .await
    .context("Failed to load scoring model")?;

    Ok(smart_scorer::SmartScorer::new(
        backend,
        config.generation,
        config.model.family_hint(),
    ))
}

#[cfg(not(feature = "llm"))]
async fn build_scorer(_config: &ScorerConfig) -> Result<smart_scorer::SmartScorer> {
    anyhow::bail!("smart-scorer was built without the `llm` feature; rebuild with --features llm")
}

fn read_batch_input(path: &Path) -> Result<Vec<ObjectiveInput>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Invalid objective list in {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    config.validate()?;

    match args.command {
        SubCommand::Prompt { objective, context } => {
            let context = context.into_context();
            println!(
                "{}",
                build_prompt(&objective, context.as_ref(), config.model.family_hint())
            );
        }
        SubCommand::Extract { file } => {
            let raw = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read stdin")?;
                    buf
                }
            };
            let result = aggregate(&extract_structured(&raw))?;
            print_json(&result)?;
        }
        SubCommand::Score { objective, context } => {
            let context = context.into_context();
            let scorer = build_scorer(&config).await?;
            let result = scorer.score(&objective, context.as_ref()).await?;
            info!(overall = result.overall, degraded = result.is_degraded(), "Objective scored");
            print_json(&result)?;
        }
        SubCommand::Batch { input } => {
            let items = read_batch_input(&input)?;
            info!(count = items.len(), input = %input.display(), "Loaded objectives");
            let scorer = build_scorer(&config).await?;
            let results = scorer.score_batch(&items).await;
            print_json(&results)?;
        }
    }

    Ok(())
}
