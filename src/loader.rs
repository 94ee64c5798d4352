//! PDF Loader unit: path + page range → one host image per page.
//!
//! Validation runs in a fixed order so the first problem reported is the
//! most basic one: empty path, missing file, wrong extension, unparseable
//! document, page range outside the document.

use crate::error::SwanOcrError;
use crate::pipeline::tensor::{image_to_tensor, ImageTensor};
use crate::pipeline::{input, render};
use tracing::info;

/// Load pages `start_page..=end_page` (1-indexed) of a PDF as host images.
///
/// # Returns
/// Exactly `end_page - start_page + 1` tensors of shape `[1, H, W, 3]`, in
/// page order.
///
/// # Errors
/// - [`SwanOcrError::EmptyPath`], [`SwanOcrError::NotAPdf`],
///   [`SwanOcrError::UnreadablePdf`], [`SwanOcrError::InvalidPageRange`]
///   (invalid input)
/// - [`SwanOcrError::FileNotFound`] carrying the resolved absolute path
pub async fn load_pdf(
    raw_path: &str,
    start_page: usize,
    end_page: usize,
) -> Result<Vec<ImageTensor>, SwanOcrError> {
    let path = input::resolve_pdf_path(raw_path)?;
    info!(
        "Loading pages {}-{} of {}",
        start_page,
        end_page,
        path.display()
    );

    let images = render::render_range(&path, start_page, end_page).await?;
    Ok(images.iter().map(image_to_tensor).collect())
}

/// Blocking variant of [`load_pdf`] for hosts without an async runtime.
pub fn load_pdf_blocking(
    raw_path: &str,
    start_page: usize,
    end_page: usize,
) -> Result<Vec<ImageTensor>, SwanOcrError> {
    let path = input::resolve_pdf_path(raw_path)?;
    info!(
        "Loading pages {}-{} of {}",
        start_page,
        end_page,
        path.display()
    );

    let images = render::render_range_blocking(&path, start_page, end_page)?;
    Ok(images.iter().map(image_to_tensor).collect())
}
