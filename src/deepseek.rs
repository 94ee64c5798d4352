//! DeepSeek-OCR backend.
//!
//! The model weights are served by a vision-capable inference endpoint
//! (vLLM, Ollama, or any OpenAI-compatible server) reached through
//! `edgequake-llm`. The local model directory supplies the tokenizer, used to
//! count output tokens for the compression statistics, and the default model
//! id, which is the directory name.
//!
//! One [`DeepSeekOcr::infer`] call:
//!
//! 1. reads the page image and builds the mode's views
//!    ([`crate::pipeline::preprocess`]),
//! 2. sends the instruction and all views in a single chat request,
//! 3. strips grounding annotations and crops linked figures
//!    ([`crate::pipeline::grounding`]),
//! 4. writes `result.mmd` (and `images/*.jpg`) into the output directory.

use crate::config::{OcrConfig, MODEL_RESULT_FILE_NAME};
use crate::error::{InferenceError, SwanOcrError};
use crate::model::{InferRequest, ModelLoader, OcrModel};
use crate::pipeline::grounding::{self, CleanedOutput, FIGURE_DIR_NAME};
use crate::pipeline::{encode, preprocess};
use crate::prompts::chat_instruction;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use image::RgbImage;
use std::path::Path;
use std::sync::Arc;
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

/// Tokenizer file expected inside the model directory.
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Loads [`DeepSeekOcr`] from a model directory.
#[derive(Clone)]
pub struct DeepSeekOcrLoader {
    provider: Option<Arc<dyn LLMProvider>>,
    provider_name: Option<String>,
    model: Option<String>,
    temperature: f32,
    max_tokens: usize,
}

impl DeepSeekOcrLoader {
    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            provider: config.provider.clone(),
            provider_name: config.provider_name.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// Resolve the inference provider, from most-specific to least-specific:
    ///
    /// 1. pre-built provider,
    /// 2. named provider serving `model_id`,
    /// 3. `EDGEQUAKE_LLM_PROVIDER` (+ optional `EDGEQUAKE_MODEL`),
    /// 4. full auto-detection from API-key variables.
    fn resolve_provider(&self, model_id: &str) -> Result<Arc<dyn LLMProvider>, SwanOcrError> {
        if let Some(ref provider) = self.provider {
            return Ok(Arc::clone(provider));
        }

        if let Some(ref name) = self.provider_name {
            return create_vision_provider(name, model_id);
        }

        if let Ok(prov) = std::env::var("EDGEQUAKE_LLM_PROVIDER") {
            if !prov.is_empty() {
                let model = std::env::var("EDGEQUAKE_MODEL")
                    .ok()
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| model_id.to_string());
                return create_vision_provider(&prov, &model);
            }
        }

        let (llm_provider, _embedding) =
            ProviderFactory::from_env().map_err(|e| SwanOcrError::ProviderNotConfigured {
                provider: "auto".to_string(),
                hint: format!(
                    "No inference provider could be auto-detected from environment.\n\
                    Pass --provider (e.g. ollama) or set EDGEQUAKE_LLM_PROVIDER.\n\
                    Error: {e}"
                ),
            })?;

        Ok(llm_provider)
    }
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, SwanOcrError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        SwanOcrError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

impl ModelLoader for DeepSeekOcrLoader {
    type Model = DeepSeekOcr;

    fn load(&self, model_dir: &Path) -> Result<DeepSeekOcr, SwanOcrError> {
        let tokenizer_path = model_dir.join(TOKENIZER_FILE);
        let tokenizer =
            Tokenizer::from_file(&tokenizer_path).map_err(|e| SwanOcrError::ModelLoadFailed {
                path: model_dir.to_path_buf(),
                detail: format!("failed to load {TOKENIZER_FILE}: {e}"),
            })?;

        let model_id = match self.model {
            Some(ref m) => m.clone(),
            None => model_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| SwanOcrError::ModelLoadFailed {
                    path: model_dir.to_path_buf(),
                    detail: "model directory has no name".into(),
                })?,
        };

        let provider = self.resolve_provider(&model_id)?;
        info!("DeepSeek-OCR ready: model '{}'", model_id);

        Ok(DeepSeekOcr {
            provider: Some(provider),
            tokenizer: Some(tokenizer),
            model_id,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        })
    }
}

/// A loaded DeepSeek-OCR model.
pub struct DeepSeekOcr {
    provider: Option<Arc<dyn LLMProvider>>,
    tokenizer: Option<Tokenizer>,
    model_id: String,
    temperature: f32,
    max_tokens: usize,
}

impl DeepSeekOcr {
    fn log_compression(&self, vision_tokens: u32, text: &str) -> Result<(), InferenceError> {
        let Some(ref tokenizer) = self.tokenizer else {
            return Ok(());
        };
        let text_tokens = tokenizer
            .encode(text, false)
            .map_err(|e| InferenceError::Tokenizer(e.to_string()))?
            .get_ids()
            .len();

        let ratio = if vision_tokens == 0 {
            0.0
        } else {
            text_tokens as f64 / vision_tokens as f64
        };
        info!(
            "image: {} valid tokens, output text: {} tokens, compression ratio: {:.2}",
            vision_tokens, text_tokens, ratio
        );
        Ok(())
    }
}

impl OcrModel for DeepSeekOcr {
    async fn infer(&self, request: &InferRequest<'_>) -> Result<(), InferenceError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| InferenceError::Provider("model has been released".into()))?;

        let page = image::open(request.image_file)?.to_rgb8();
        let prepared = preprocess::prepare(&page, request.params);
        debug!(
            "{}: {} view(s), grid {:?}",
            request.image_file.display(),
            1 + prepared.tiles.len(),
            prepared.grid
        );

        let images = prepared
            .views()
            .map(encode::encode_view)
            .collect::<Result<Vec<_>, _>>()?;

        let instruction = chat_instruction(request.prompt);
        let messages = vec![ChatMessage::user_with_images(instruction.as_str(), images)];
        let options = CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let response = provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| InferenceError::Provider(e.to_string()))?;
        debug!(
            "{} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );

        let figure_prefix = request
            .image_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "page".to_string());
        let cleaned = grounding::clean_grounded_output(&response.content, &figure_prefix);

        if request.save_results {
            save_results(&page, &cleaned, request.output_path).await?;
        }

        if request.test_compress {
            if let Err(e) = self.log_compression(prepared.vision_tokens(), &cleaned.markdown) {
                warn!("Compression statistics unavailable: {}", e);
            }
        }

        Ok(())
    }

    fn release(&mut self) {
        self.provider = None;
        self.tokenizer = None;
        debug!("Released DeepSeek-OCR '{}'", self.model_id);
    }
}

/// Write `result.mmd` and the figure crops it links to.
async fn save_results(
    page: &RgbImage,
    cleaned: &CleanedOutput,
    output_path: &Path,
) -> Result<(), InferenceError> {
    if !cleaned.figures.is_empty() {
        let figure_dir = output_path.join(FIGURE_DIR_NAME);
        tokio::fs::create_dir_all(&figure_dir).await?;
        for figure in &cleaned.figures {
            match grounding::crop_figure(page, figure.bbox) {
                Some(crop) => crop.save(figure_dir.join(&figure.file_name))?,
                None => warn!("Skipping degenerate figure box {:?}", figure.bbox),
            }
        }
    }

    tokio::fs::write(output_path.join(MODEL_RESULT_FILE_NAME), &cleaned.markdown).await?;
    Ok(())
}
