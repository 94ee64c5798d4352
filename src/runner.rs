//! OCR Runner unit: host images → per-page markdown → files on disk.
//!
//! One call walks through:
//!
//! ```text
//! model dir check ─▶ load model ─▶ for each image:
//!                                    save temp PNG ─▶ infer ─▶ collect result
//!                 ─▶ write aggregate ─▶ release model
//! ```
//!
//! A missing model directory or a failed model load aborts before any page is
//! touched. Everything that goes wrong inside one page's inference is kept
//! local to that page: it becomes a [`PageOutcome::Failed`] entry and the run
//! moves on, so the output always has one block per input image.

use crate::config::{
    page_markdown_path, temp_image_path, OcrConfig, OcrRequest, MODEL_RESULT_FILE_NAME,
    RESULT_DIR_NAME,
};
use crate::deepseek::DeepSeekOcrLoader;
use crate::error::{PageError, SwanOcrError};
use crate::model::{InferRequest, ModelLoader, ModelSession, OcrModel};
use crate::output::{assemble_document, OcrOutput, PageOutcome, PageResult};
use crate::pipeline::grounding::rebase_figure_links;
use crate::pipeline::tensor::{tensor_to_image, ImageTensor};
use std::path::Path;
use tracing::{debug, info, warn};

/// Transcribe `images` with the model produced by `loader`.
///
/// Writes `<output>/deepseek_ocr_results/page_<i>.mmd` for every page that
/// produced a result and overwrites `<output>/deepseek_ocr_output.md` with
/// the aggregate document. Figure links in the aggregate are rewritten to
/// `deepseek_ocr_results/images/…` so they resolve from `<output>`.
///
/// # Errors
/// - [`SwanOcrError::ModelNotFound`] if the model directory is absent
/// - any error from [`ModelLoader::load`]
/// - [`SwanOcrError::InvalidImage`] / [`SwanOcrError::OutputWriteFailed`]
///   when a page image cannot be staged or the aggregate cannot be written
pub async fn run_ocr<L: ModelLoader>(
    images: &[ImageTensor],
    request: &OcrRequest,
    loader: &L,
    config: &OcrConfig,
) -> Result<OcrOutput, SwanOcrError> {
    let model_dir = config.model_dir();
    if !model_dir.exists() {
        return Err(SwanOcrError::ModelNotFound { path: model_dir });
    }

    info!("Loading OCR model from {}...", model_dir.display());
    let session = ModelSession::open(loader, &model_dir)?;

    let result_dir = config.result_dir();
    tokio::fs::create_dir_all(&result_dir)
        .await
        .map_err(|e| SwanOcrError::OutputWriteFailed {
            path: result_dir.clone(),
            source: e,
        })?;

    let prompt = request.prompt();
    let params = request.mode.params();
    info!("Using prompt: {}", prompt);
    debug!("Mode {:?} → {:?}", request.mode, params);

    let total = images.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(total);
    }

    let mut pages = Vec::with_capacity(total);
    for (idx, tensor) in images.iter().enumerate() {
        let page_num = idx + 1;

        let temp_path = temp_image_path(&result_dir, page_num);
        stage_image(tensor, &temp_path)?;

        let infer_request = InferRequest {
            prompt: &prompt,
            image_file: &temp_path,
            output_path: &result_dir,
            params,
            save_results: true,
            test_compress: true,
        };
        let outcome = transcribe_page(session.model(), &infer_request, page_num).await;

        if let Some(ref cb) = config.progress_callback {
            match &outcome {
                PageOutcome::Transcribed(md) => cb.on_page_complete(page_num, total, md.len()),
                PageOutcome::Failed(e) => cb.on_page_error(page_num, total, &e.to_string()),
            }
        }

        pages.push(PageResult { page_num, outcome });
    }

    // Page files sit next to their figures; the aggregate sits one level up.
    let markdown = rebase_figure_links(&assemble_document(&pages), RESULT_DIR_NAME);
    let output_path = config.aggregate_path();
    write_aggregate(&output_path, &markdown).await?;
    info!("Final Markdown saved to: {}", output_path.display());

    drop(session);

    let output = OcrOutput {
        markdown,
        pages,
        output_path,
    };
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(total, output.success_count());
    }
    Ok(output)
}

/// [`run_ocr`] with the DeepSeek-OCR backend configured from `config`.
pub async fn run_deepseek_ocr(
    images: &[ImageTensor],
    request: &OcrRequest,
    config: &OcrConfig,
) -> Result<OcrOutput, SwanOcrError> {
    let loader = DeepSeekOcrLoader::from_config(config);
    run_ocr(images, request, &loader, config).await
}

/// Synchronous wrapper around [`run_deepseek_ocr`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_ocr_blocking(
    images: &[ImageTensor],
    request: &OcrRequest,
    config: &OcrConfig,
) -> Result<OcrOutput, SwanOcrError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SwanOcrError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(run_deepseek_ocr(images, request, config))
}

/// Write one host image to its per-page temp file.
fn stage_image(tensor: &ImageTensor, temp_path: &Path) -> Result<(), SwanOcrError> {
    let bitmap = tensor_to_image(tensor)?;
    bitmap
        .save(temp_path)
        .map_err(|e| SwanOcrError::OutputWriteFailed {
            path: temp_path.to_path_buf(),
            source: std::io::Error::other(e.to_string()),
        })
}

/// Run inference for one page and turn every failure into a page outcome.
async fn transcribe_page<M: OcrModel>(
    model: &M,
    request: &InferRequest<'_>,
    page_num: usize,
) -> PageOutcome {
    let result_file = request.output_path.join(MODEL_RESULT_FILE_NAME);
    // A leftover result from an interrupted run must not be attributed to this page.
    if let Err(e) = tokio::fs::remove_file(&result_file).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not clear {}: {}", result_file.display(), e);
        }
    }

    if let Err(e) = model.infer(request).await {
        warn!("Error on page {}: {}", page_num, e);
        return PageOutcome::Failed(PageError::InferenceFailed {
            page: page_num,
            detail: e.to_string(),
        });
    }

    if !tokio::fs::try_exists(&result_file).await.unwrap_or(false) {
        warn!("Page {}: model produced no {}", page_num, MODEL_RESULT_FILE_NAME);
        return PageOutcome::Failed(PageError::NoOutput { page: page_num });
    }

    let page_file = page_markdown_path(request.output_path, page_num);
    match collect_result(&result_file, &page_file).await {
        Ok(markdown) => PageOutcome::Transcribed(markdown),
        Err(e) => {
            warn!("Error on page {}: {}", page_num, e);
            PageOutcome::Failed(PageError::InferenceFailed {
                page: page_num,
                detail: e.to_string(),
            })
        }
    }
}

/// Read the model's result file and move it to its page-indexed name.
async fn collect_result(result_file: &Path, page_file: &Path) -> std::io::Result<String> {
    let markdown = tokio::fs::read_to_string(result_file).await?;
    tokio::fs::rename(result_file, page_file).await?;
    Ok(markdown)
}

async fn write_aggregate(path: &Path, markdown: &str) -> Result<(), SwanOcrError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| SwanOcrError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    tokio::fs::write(path, markdown)
        .await
        .map_err(|e| SwanOcrError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}
