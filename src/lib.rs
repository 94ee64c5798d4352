//! # swan-ocr
//!
//! Two node-graph units that turn PDF pages into markdown with DeepSeek-OCR.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF path + page range
//!  │
//!  ├─ LoadPDFtoImage   validate path and range, rasterise via pdfium,
//!  │                   one [1, H, W, 3] float tensor per page
//!  │
//!  └─ DeepSeekOCRNode  per image: temp PNG → model inference → result.mmd
//!                      → page_<i>.mmd, then the aggregate markdown file
//! ```
//!
//! The host wires the loader's list output into the runner's image input.
//! Each unit is a single call that runs to completion; pages are processed
//! one at a time.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use swan_ocr::{load_pdf, run_deepseek_ocr, OcrConfig, OcrMode, OcrRequest, TaskType};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pages = load_pdf("/data/paper.pdf", 1, 3).await?;
//!
//!     let config = OcrConfig::builder()
//!         .models_dir("models")
//!         .output_dir("output")
//!         .provider_name("ollama")
//!         .build()?;
//!     let request = OcrRequest::new(OcrMode::Gundam, TaskType::Document);
//!
//!     let output = run_deepseek_ocr(&pages, &request, &config).await?;
//!     println!("{}", output.markdown);
//!     eprintln!("{} of {} pages transcribed", output.success_count(), output.pages.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `swanocr` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! ## Modes
//!
//! | Mode | base_size | image_size | crop |
//! |------|-----------|------------|------|
//! | Tiny   | 512  | 512  | no  |
//! | Small  | 640  | 640  | no  |
//! | Base   | 1024 | 1024 | no  |
//! | Large  | 1280 | 1280 | no  |
//! | Gundam | 1024 | 640  | yes |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod deepseek;
pub mod error;
pub mod loader;
pub mod model;
pub mod node;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod runner;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ModeParams, OcrConfig, OcrConfigBuilder, OcrMode, OcrRequest, TaskType};
pub use deepseek::{DeepSeekOcr, DeepSeekOcrLoader};
pub use error::{ErrorKind, InferenceError, PageError, SwanOcrError};
pub use loader::{load_pdf, load_pdf_blocking};
pub use model::{InferRequest, ModelLoader, ModelSession, OcrModel};
pub use node::{registry, NodeSchema};
pub use output::{OcrOutput, PageOutcome, PageResult};
pub use pipeline::tensor::ImageTensor;
pub use progress::{NoopProgressCallback, OcrProgressCallback, ProgressCallback};
pub use runner::{run_deepseek_ocr, run_ocr, run_ocr_blocking};
