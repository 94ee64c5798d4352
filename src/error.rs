//! Error types for the swan-ocr library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`SwanOcrError`]: **Fatal**: the unit call cannot proceed at all
//!   (bad path, unreadable PDF, missing model directory). Returned as
//!   `Err(SwanOcrError)` from the top-level entry points and surfaced to the
//!   host as a failed node execution.
//!
//! * [`PageError`]: **Non-fatal**: a single page failed during OCR but
//!   every other page is fine. Stored inside [`crate::output::PageResult`]
//!   and rendered inline as a marker so the page numbering stays aligned.
//!
//! * [`InferenceError`]: what an [`crate::model::OcrModel`] backend reports
//!   from one inference call. The runner converts it into a [`PageError`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a fatal error, as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad path, wrong extension, unparseable PDF, page range out of bounds.
    InvalidInput,
    /// Missing file or missing model directory.
    NotFound,
    /// Anything else; propagated to the host as a call failure.
    Unhandled,
}

/// All fatal errors returned by the swan-ocr library.
#[derive(Debug, Error)]
pub enum SwanOcrError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The path was empty after trimming whitespace and quotes.
    #[error("PDF path is empty.")]
    EmptyPath,

    /// No regular file exists at the resolved path.
    #[error("PDF file not found at: '{resolved}' (input was: '{input}')")]
    FileNotFound { input: String, resolved: PathBuf },

    /// The resolved path does not carry a `.pdf` extension.
    #[error("File must be a PDF (.pdf): '{path}'")]
    NotAPdf { path: PathBuf },

    /// The file could not be opened as a PDF document.
    #[error("Failed to read PDF file '{path}': {detail}")]
    UnreadablePdf { path: PathBuf, detail: String },

    /// Requested page range violates `1 <= start <= end <= total`.
    #[error("Invalid page range: {start}-{end} for {total} pages")]
    InvalidPageRange {
        start: usize,
        end: usize,
        total: usize,
    },

    /// An image handed in by the host does not have the `[1, H, W, 3]` shape.
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    // ── Model errors ──────────────────────────────────────────────────────
    /// The expected model directory does not exist under the model root.
    #[error("DeepSeek OCR model not found at: {path}")]
    ModelNotFound { path: PathBuf },

    /// The model directory exists but the model could not be loaded.
    #[error("Failed to load OCR model from '{path}': {detail}")]
    ModelLoadFailed { path: PathBuf, detail: String },

    /// The inference provider is not initialised (missing API key etc.).
    #[error("Inference provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Rendering errors ──────────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH to the directory containing libpdfium, or install it system-wide."
    )]
    PdfiumBindingFailed(String),

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SwanOcrError {
    /// Classify this error for the host.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SwanOcrError::EmptyPath
            | SwanOcrError::NotAPdf { .. }
            | SwanOcrError::UnreadablePdf { .. }
            | SwanOcrError::InvalidPageRange { .. }
            | SwanOcrError::InvalidImage(_) => ErrorKind::InvalidInput,
            SwanOcrError::FileNotFound { .. } | SwanOcrError::ModelNotFound { .. } => {
                ErrorKind::NotFound
            }
            _ => ErrorKind::Unhandled,
        }
    }
}

/// A non-fatal error for a single page.
///
/// The overall OCR run continues; the page is kept in the output as a marker.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageError {
    /// The model raised an error for this page.
    #[error("Page {page}: inference failed: {detail}")]
    InferenceFailed { page: usize, detail: String },

    /// The model returned normally but produced no result file.
    #[error("Page {page}: no OCR output produced")]
    NoOutput { page: usize },
}

impl PageError {
    /// 1-indexed page number the error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::InferenceFailed { page, .. } | PageError::NoOutput { page } => *page,
        }
    }

    /// Inline placeholder written into the page block in place of markdown.
    pub fn marker(&self) -> String {
        match self {
            PageError::InferenceFailed { detail, .. } => format!("[Error: {detail}]"),
            PageError::NoOutput { .. } => "[OCR failed]".to_string(),
        }
    }
}

/// Error raised by an OCR model backend for one inference call.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// The provider call failed.
    #[error("{0}")]
    Provider(String),
}
