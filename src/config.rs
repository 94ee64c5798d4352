//! Configuration types for the OCR runner.
//!
//! Per-call choices made in the node graph (mode preset, task type, custom
//! prompt) live in [`OcrRequest`]. Environment-level settings that stay the
//! same across calls (where models and outputs live, which inference backend
//! serves the model) live in [`OcrConfig`], built via [`OcrConfigBuilder`].

use crate::error::SwanOcrError;
use crate::progress::ProgressCallback;
use crate::prompts::resolve_prompt;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Directory name of the model under the host's model-storage root.
pub const DEFAULT_MODEL_DIR_NAME: &str = "DeepSeek-OCR-Latest-BF16.I64";

/// Subdirectory of the output directory holding per-page files.
pub const RESULT_DIR_NAME: &str = "deepseek_ocr_results";

/// Aggregate markdown file written directly under the output directory.
pub const AGGREGATE_FILE_NAME: &str = "deepseek_ocr_output.md";

/// File the model writes its transcription to inside the result directory.
pub const MODEL_RESULT_FILE_NAME: &str = "result.mmd";

// ── Mode presets ─────────────────────────────────────────────────────────

/// Image preprocessing parameters for one inference call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeParams {
    /// Side of the global (whole page) view, in pixels.
    pub base_size: u32,
    /// Side of each local tile, or of the resized image without cropping.
    pub image_size: u32,
    /// Split large images into local tiles in addition to the global view.
    pub crop_mode: bool,
}

impl ModeParams {
    pub const fn new(base_size: u32, image_size: u32, crop_mode: bool) -> Self {
        Self {
            base_size,
            image_size,
            crop_mode,
        }
    }
}

/// Quality/resolution preset for the model's image preprocessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OcrMode {
    Tiny,
    Small,
    Base,
    Large,
    /// Global 1024 view plus 640 tiles. (default)
    #[default]
    Gundam,
}

impl OcrMode {
    /// All presets in the order the host lists them.
    pub const ALL: [OcrMode; 5] = [
        OcrMode::Tiny,
        OcrMode::Small,
        OcrMode::Base,
        OcrMode::Large,
        OcrMode::Gundam,
    ];

    /// Host-facing label.
    pub fn name(self) -> &'static str {
        match self {
            OcrMode::Tiny => "Tiny",
            OcrMode::Small => "Small",
            OcrMode::Base => "Base",
            OcrMode::Large => "Large",
            OcrMode::Gundam => "Gundam",
        }
    }

    /// Exact, case-sensitive lookup of a host label.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }

    /// Lookup that falls back to [`OcrMode::Gundam`] for unknown labels.
    pub fn from_name_or_default(name: &str) -> Self {
        Self::from_name(name).unwrap_or_default()
    }

    /// `(base_size, image_size, crop_mode)` for this preset.
    pub fn params(self) -> ModeParams {
        match self {
            OcrMode::Tiny => ModeParams::new(512, 512, false),
            OcrMode::Small => ModeParams::new(640, 640, false),
            OcrMode::Base => ModeParams::new(1024, 1024, false),
            OcrMode::Large => ModeParams::new(1280, 1280, false),
            OcrMode::Gundam => ModeParams::new(1024, 640, true),
        }
    }
}

// ── Task types ───────────────────────────────────────────────────────────

/// Which instruction prompt is sent to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TaskType {
    /// Grounded document → markdown conversion. (default)
    #[default]
    Document,
    WithoutLayouts,
    OtherImage,
    FiguresInDocument,
    General,
}

impl TaskType {
    pub const ALL: [TaskType; 5] = [
        TaskType::Document,
        TaskType::WithoutLayouts,
        TaskType::OtherImage,
        TaskType::FiguresInDocument,
        TaskType::General,
    ];

    /// Host-facing label.
    pub fn name(self) -> &'static str {
        match self {
            TaskType::Document => "document",
            TaskType::WithoutLayouts => "without layouts",
            TaskType::OtherImage => "other image",
            TaskType::FiguresInDocument => "figures in document",
            TaskType::General => "general",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Lookup that falls back to [`TaskType::Document`] for unknown labels.
    pub fn from_name_or_default(name: &str) -> Self {
        Self::from_name(name).unwrap_or_default()
    }
}

// ── Request ──────────────────────────────────────────────────────────────

/// Per-call OCR choices made in the node graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrRequest {
    pub mode: OcrMode,
    pub task_type: TaskType,
    /// Overrides the task template when non-empty.
    pub custom_prompt: String,
}

impl OcrRequest {
    pub fn new(mode: OcrMode, task_type: TaskType) -> Self {
        Self {
            mode,
            task_type,
            custom_prompt: String::new(),
        }
    }

    /// Build a request from the host's raw values, applying label fallbacks.
    pub fn from_host(mode: &str, task_type: &str, custom_prompt: &str) -> Self {
        Self {
            mode: OcrMode::from_name_or_default(mode),
            task_type: TaskType::from_name_or_default(task_type),
            custom_prompt: custom_prompt.to_string(),
        }
    }

    pub fn with_custom_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.custom_prompt = prompt.into();
        self
    }

    /// The prompt actually sent to the model.
    pub fn prompt(&self) -> String {
        resolve_prompt(self.task_type, &self.custom_prompt)
    }
}

// ── Runner configuration ─────────────────────────────────────────────────

/// Environment-level configuration of the OCR runner.
///
/// # Example
/// ```rust
/// use swan_ocr::OcrConfig;
///
/// let config = OcrConfig::builder()
///     .models_dir("/srv/comfy/models")
///     .output_dir("/srv/comfy/output")
///     .build()
///     .unwrap();
/// assert!(config.model_dir().ends_with("DeepSeek-OCR-Latest-BF16.I64"));
/// ```
#[derive(Clone)]
pub struct OcrConfig {
    /// Host model-storage root. Default: `models`.
    pub models_dir: PathBuf,

    /// Model subdirectory under `models_dir`. Default: [`DEFAULT_MODEL_DIR_NAME`].
    pub model_dir_name: String,

    /// Host output directory. Default: `output`.
    pub output_dir: PathBuf,

    /// Pre-constructed inference provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Inference provider name (e.g. "ollama", "openai" for a vLLM endpoint).
    pub provider_name: Option<String>,

    /// Model id served by the provider. If None, uses `model_dir_name`.
    pub model: Option<String>,

    /// Sampling temperature. Default: 0.0 (greedy decoding).
    pub temperature: f32,

    /// Maximum tokens generated per page. Default: 8192.
    pub max_tokens: usize,

    /// Optional progress callback; one event per page.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            model_dir_name: DEFAULT_MODEL_DIR_NAME.to_string(),
            output_dir: PathBuf::from("output"),
            provider: None,
            provider_name: None,
            model: None,
            temperature: 0.0,
            max_tokens: 8192,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for OcrConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrConfig")
            .field("models_dir", &self.models_dir)
            .field("model_dir_name", &self.model_dir_name)
            .field("output_dir", &self.output_dir)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl OcrConfig {
    /// Create a new builder for `OcrConfig`.
    pub fn builder() -> OcrConfigBuilder {
        OcrConfigBuilder {
            config: Self::default(),
        }
    }

    /// Full path of the model directory.
    pub fn model_dir(&self) -> PathBuf {
        self.models_dir.join(&self.model_dir_name)
    }

    /// Directory receiving temp page images and per-page markdown.
    pub fn result_dir(&self) -> PathBuf {
        self.output_dir.join(RESULT_DIR_NAME)
    }

    /// Aggregate markdown path, overwritten on every run.
    pub fn aggregate_path(&self) -> PathBuf {
        self.output_dir.join(AGGREGATE_FILE_NAME)
    }

    /// Model id requested from the provider.
    pub fn served_model(&self) -> &str {
        self.model.as_deref().unwrap_or(&self.model_dir_name)
    }
}

/// Per-page file names inside the result directory.
pub fn temp_image_path(result_dir: &Path, page: usize) -> PathBuf {
    result_dir.join(format!("temp_page_{page}.png"))
}

pub fn page_markdown_path(result_dir: &Path, page: usize) -> PathBuf {
    result_dir.join(format!("page_{page}.mmd"))
}

/// Builder for [`OcrConfig`].
pub struct OcrConfigBuilder {
    config: OcrConfig,
}

impl fmt::Debug for OcrConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl OcrConfigBuilder {
    pub fn models_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.models_dir = dir.into();
        self
    }

    pub fn model_dir_name(mut self, name: impl Into<String>) -> Self {
        self.config.model_dir_name = name.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t;
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<OcrConfig, SwanOcrError> {
        let c = &self.config;
        if c.model_dir_name.trim().is_empty() {
            return Err(SwanOcrError::InvalidConfig(
                "model directory name must not be empty".into(),
            ));
        }
        if !(0.0..=2.0).contains(&c.temperature) {
            return Err(SwanOcrError::InvalidConfig(format!(
                "temperature must be 0.0–2.0, got {}",
                c.temperature
            )));
        }
        if c.max_tokens == 0 {
            return Err(SwanOcrError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}
