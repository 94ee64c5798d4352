//! PDF rasterisation: render a page range to `DynamicImage` via pdfium.
//!
//! Opening the document doubles as validation: a file that pdfium cannot
//! parse is reported as [`SwanOcrError::UnreadablePdf`], and the page count it
//! reports bounds the requested [`PageRange`].
//!
//! Pages are rendered one after another on a single thread. The async
//! wrapper moves that work onto the blocking pool because pdfium keeps
//! thread-local state and must not run on a Tokio worker.

use crate::error::SwanOcrError;
use crate::pipeline::input::PageRange;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Raster resolution for every page.
pub const RENDER_DPI: f32 = 200.0;

/// Environment variable naming a directory that contains the pdfium library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind to pdfium: `PDFIUM_LIB_PATH` first, then the system library.
pub fn bind_pdfium() -> Result<Pdfium, SwanOcrError> {
    let bindings = match std::env::var_os(PDFIUM_LIB_PATH_ENV) {
        Some(dir) => {
            let dir = PathBuf::from(dir);
            let lib = if dir.is_file() {
                dir
            } else {
                Pdfium::pdfium_platform_library_name_at_path(&dir)
            };
            debug!("Binding pdfium from {}", lib.display());
            Pdfium::bind_to_library(&lib)
        }
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| SwanOcrError::PdfiumBindingFailed(format!("{e:?}")))?;

    Ok(Pdfium::new(bindings))
}

/// Rasterise `start..=end` (1-indexed) of the PDF at `pdf_path`.
///
/// The range is validated against the document's page count before any page
/// is rendered.
pub async fn render_range(
    pdf_path: &Path,
    start: usize,
    end: usize,
) -> Result<Vec<DynamicImage>, SwanOcrError> {
    let path = pdf_path.to_path_buf();

    tokio::task::spawn_blocking(move || render_range_blocking(&path, start, end))
        .await
        .map_err(|e| SwanOcrError::Internal(format!("Render task panicked: {e}")))?
}

/// Blocking implementation of [`render_range`].
pub fn render_range_blocking(
    pdf_path: &Path,
    start: usize,
    end: usize,
) -> Result<Vec<DynamicImage>, SwanOcrError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| SwanOcrError::UnreadablePdf {
            path: pdf_path.to_path_buf(),
            detail: format!("{e:?}"),
        })?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let range = PageRange::new(start, end, total_pages)?;
    debug!(
        "Rasterising pages {}..={} at {} DPI",
        range.start(),
        range.end(),
        RENDER_DPI
    );

    let render_config = PdfRenderConfig::new().scale_page_by_factor(RENDER_DPI / 72.0);

    let mut images = Vec::with_capacity(range.page_count());
    for idx in range.indices() {
        let page = pages
            .get(idx as PdfPageIndex)
            .map_err(|e| SwanOcrError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{e:?}"),
            })?;

        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            SwanOcrError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{e:?}"),
            }
        })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        images.push(image);
    }

    Ok(images)
}
