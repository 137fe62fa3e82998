//! Mistral.rs LLM Backend
//!
//! Provides LLM inference using mistral.rs with GGUF models.
//! Automatically detects CUDA availability at runtime:
//! - **CUDA available** (requires `cuda` feature): GPU inference
//! - **CPU fallback**: CPU inference
//!
//! Prompts arrive already wrapped in the family chat template; this backend
//! only adds the family's stop sequences.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use super::template::{template_for, ChatTemplate};
use super::{GenerationParams, LlmBackend};

/// Mistral.rs backend using GGUF models with optional CUDA GPU support
pub struct MistralRsBackend {
    /// The loaded mistralrs instance
    mistralrs: Arc<mistralrs::MistralRs>,
    /// Model path for logging
    model_path: String,
    /// Whether GPU is being used
    uses_gpu: bool,
    /// Chat template matching the loaded model
    template: &'static ChatTemplate,
}

/// Check if CUDA is available at runtime.
///
/// Returns `true` only if the binary was compiled with the `cuda` feature
/// AND CUDA libraries/drivers are detected on the system.
pub fn is_cuda_available() -> bool {
    #[cfg(feature = "cuda")]
    {
        std::env::var("CUDA_VISIBLE_DEVICES").is_ok()
            || std::path::Path::new("/usr/local/cuda").exists()
            || std::path::Path::new("/opt/cuda").exists()
            || std::path::Path::new("/usr/lib/x86_64-linux-gnu/libcuda.so").exists()
    }
    #[cfg(not(feature = "cuda"))]
    {
        false
    }
}

impl MistralRsBackend {
    /// Load a GGUF model from the specified path
    pub async fn load(model_path: &str, family_hint: &str, max_seq_len: usize) -> Result<Self> {
        use candle_core::Device;
        use mistralrs::{
            AutoDeviceMapParams, DefaultSchedulerMethod, DeviceMapSetting, LoaderBuilder,
            MistralRsBuilder, ModelDType, ModelSelected, SchedulerConfig, TokenSource,
        };

        let uses_gpu = is_cuda_available();

        tracing::info!(
            model_path = %model_path,
            uses_gpu = uses_gpu,
            "Loading GGUF model with mistral.rs backend"
        );

        let path = std::path::Path::new(model_path);
        if !path.exists() {
            anyhow::bail!("Model file not found: {}", model_path);
        }

        let start = std::time::Instant::now();

        let device = if uses_gpu {
            tracing::info!("CUDA detected, using GPU inference");
            #[cfg(feature = "cuda")]
            {
                Device::cuda_if_available(0).context("Failed to initialize CUDA device")?
            }
            #[cfg(not(feature = "cuda"))]
            {
                tracing::warn!("CUDA feature not compiled in, falling back to CPU");
                Device::Cpu
            }
        } else {
            tracing::info!("CUDA not available, using CPU inference");
            Device::Cpu
        };

        let model_dir = path
            .parent()
            .and_then(|p| p.to_str())
            .unwrap_or(".")
            .to_string();
        let model_filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .context("Invalid model filename")?
            .to_string();

        // Scoring is strictly sequential, one request in flight
        let model = ModelSelected::GGUF {
            tok_model_id: None,
            quantized_model_id: model_dir,
            quantized_filename: model_filename,
            dtype: ModelDType::Auto,
            topology: None,
            max_seq_len,
            max_batch_size: 1,
        };

        let loader = LoaderBuilder::new(model)
            .build()
            .context("Failed to build loader")?;

        // Load the pipeline (blocking operation)
        let pipeline = tokio::task::spawn_blocking(move || {
            loader.load_model_from_hf(
                None,                                                        // revision
                TokenSource::CacheToken,                                     // token_source
                &ModelDType::Auto,                                           // dtype
                &device,                                                     // device
                false,                                                       // silent
                DeviceMapSetting::Auto(AutoDeviceMapParams::default_text()), // mapper
                None,                                                        // in_situ_quant
                None,                                                        // paged_attn_config
            )
        })
        .await
        .context("Task join error")?
        .context("Failed to load model")?;

        let single_request = std::num::NonZeroUsize::new(1).context("Invalid scheduler size")?;
        let mistralrs = MistralRsBuilder::new(
            pipeline,
            SchedulerConfig::DefaultScheduler {
                method: DefaultSchedulerMethod::Fixed(single_request),
            },
            false, // throughput_logging
            None,  // search_embedding_model
        )
        .build()
        .await;

        let template = template_for(family_hint);

        tracing::info!(
            load_time_secs = start.elapsed().as_secs_f32(),
            uses_gpu = uses_gpu,
            model_family = template.family,
            "Model loaded successfully ({})",
            if uses_gpu { "GPU" } else { "CPU" }
        );

        Ok(Self {
            mistralrs,
            model_path: model_path.to_string(),
            uses_gpu,
            template,
        })
    }

    fn sampling_params(&self, params: &GenerationParams) -> mistralrs::SamplingParams {
        use mistralrs::{SamplingParams, StopTokens};

        let stop_toks = if self.template.stop_sequences.is_empty() {
            None
        } else {
            Some(StopTokens::Seqs(self.template.stop_tokens()))
        };

        // No temperature/top-k/top-p means argmax decoding
        let (temperature, top_p, top_k) = if params.do_sample() {
            (Some(params.temperature), Some(params.top_p), Some(50))
        } else {
            (None, None, None)
        };

        SamplingParams {
            temperature,
            top_k,
            top_p,
            max_len: Some(params.max_new_tokens),
            stop_toks,
            logits_bias: None,
            n_choices: 1,
            top_n_logprobs: 0,
            frequency_penalty: None,
            presence_penalty: None,
            dry_params: None,
            min_p: None,
            repetition_penalty: None,
        }
    }
}

#[async_trait]
impl LlmBackend for MistralRsBackend {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        use mistralrs::{NormalRequest, Request, RequestMessage, Response};

        tracing::debug!(
            model_path = %self.model_path,
            model_family = self.template.family,
            prompt_length = prompt.len(),
            max_new_tokens = params.max_new_tokens,
            temperature = params.temperature,
            do_sample = params.do_sample(),
            "Sending request to mistral.rs"
        );

        let (tx, mut rx) = tokio::sync::mpsc::channel(100);

        let request = Request::Normal(Box::new(NormalRequest {
            messages: RequestMessage::Completion {
                text: prompt.to_string(),
                echo_prompt: false,
                best_of: Some(1),
            },
            sampling_params: self.sampling_params(params),
            response: tx,
            return_raw_logits: false,
            return_logprobs: false,
            is_streaming: false,
            id: 0,
            constraint: mistralrs::Constraint::None,
            suffix: None,
            tool_choice: None,
            tools: None,
            logits_processors: None,
            web_search_options: None,
            model_id: None,
            truncate_sequence: false,
        }));

        // Send request in a blocking context to avoid blocking the tokio runtime
        let mistralrs_clone = self.mistralrs.clone();
        tokio::task::spawn_blocking(move || {
            mistralrs_clone
                .send_request(request)
                .map_err(|e| anyhow::anyhow!("Failed to send request: {:?}", e))
        })
        .await
        .context("Task join error")??;

        // CPU inference is much slower
        let timeout_secs = if self.uses_gpu { 120 } else { 300 };
        let text: String = loop {
            let response = tokio::time::timeout(
                std::time::Duration::from_secs(timeout_secs),
                rx.recv(),
            )
            .await
            .context(format!("Response timeout after {} seconds", timeout_secs))?
            .context("No response received from mistral.rs (channel closed)")?;

            match response {
                Response::Chunk(_) | Response::CompletionChunk(_) => continue,
                Response::Done(result) => {
                    break result
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|choice| choice.message.content)
                        .context("No text in Done response")?;
                }
                Response::CompletionDone(result) => {
                    break result
                        .choices
                        .into_iter()
                        .next()
                        .map(|choice| choice.text)
                        .context("No text in CompletionDone response")?;
                }
                Response::InternalError(e) => {
                    anyhow::bail!("Internal error from mistral.rs: {}", e)
                }
                Response::ValidationError(e) => {
                    anyhow::bail!("Validation error: {}", e)
                }
                Response::ModelError(e, resp) => {
                    anyhow::bail!("Model error: {} (response: {:?})", e, resp)
                }
                Response::CompletionModelError(e, resp) => {
                    anyhow::bail!("Completion model error: {} (response: {:?})", e, resp)
                }
                Response::ImageGeneration(_)
                | Response::Speech { .. }
                | Response::Raw { .. }
                | Response::Embeddings { .. } => {
                    anyhow::bail!("Unexpected response type (image/speech/raw/embeddings)")
                }
            }
        };

        tracing::debug!(
            response_length = text.len(),
            "Received response from mistral.rs"
        );

        // Drop channel receiver to free KV cache resources
        drop(rx);

        Ok(text)
    }

    fn backend_name(&self) -> &'static str {
        if self.uses_gpu {
            "Mistral.rs (CUDA)"
        } else {
            "Mistral.rs (CPU)"
        }
    }

    fn uses_gpu(&self) -> bool {
        self.uses_gpu
    }
}
