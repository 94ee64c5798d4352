//! End-to-end tests: real PDF → pdfium → DeepSeek-OCR served by a live
//! inference endpoint.
//!
//! Gated behind `E2E_ENABLED` so they never run in CI by accident. They also
//! need `SWANOCR_MODELS_DIR` pointing at a directory that contains
//! `DeepSeek-OCR-Latest-BF16.I64/tokenizer.json`, and a provider configured
//! through `SWANOCR_PROVIDER` (e.g. `ollama`) or `EDGEQUAKE_LLM_PROVIDER`.
//!
//! Run with:
//!   E2E_ENABLED=1 SWANOCR_MODELS_DIR=~/models SWANOCR_PROVIDER=ollama \
//!     cargo test --test e2e -- --nocapture

use std::path::PathBuf;
use swan_ocr::{load_pdf, run_deepseek_ocr, OcrConfig, OcrMode, OcrRequest, TaskType};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

/// Skip unless E2E_ENABLED is set, a model root is configured and the PDF
/// at `path` exists.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let Ok(models_dir) = std::env::var("SWANOCR_MODELS_DIR") else {
            println!("SKIP: set SWANOCR_MODELS_DIR to the model-storage root");
            return;
        };
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP: test file not found: {}", p.display());
            return;
        }
        (p, PathBuf::from(models_dir))
    }};
}

fn e2e_config(models_dir: PathBuf, output_dir: &std::path::Path) -> OcrConfig {
    let mut builder = OcrConfig::builder()
        .models_dir(models_dir)
        .output_dir(output_dir);
    if let Ok(provider) = std::env::var("SWANOCR_PROVIDER") {
        builder = builder.provider_name(provider);
    }
    if let Ok(model) = std::env::var("SWANOCR_MODEL") {
        builder = builder.model(model);
    }
    builder.build().expect("valid config")
}

/// The transcription must be real text, without leftover grounding tags.
fn assert_clean_markdown(md: &str, context: &str) {
    assert!(md.trim().len() >= 50, "[{context}] output suspiciously short");
    for tag in ["<|ref|>", "<|det|>", "<｜end▁of▁sentence｜>"] {
        assert!(!md.contains(tag), "[{context}] leftover tag {tag}");
    }
    println!("[{context}] ✓  {} bytes", md.len());
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn document_page_to_markdown() {
    let (pdf, models_dir) =
        e2e_skip_unless_ready!(test_cases_dir().join("attention_is_all_you_need.pdf"));
    let out = tempfile::tempdir().unwrap();
    let config = e2e_config(models_dir, out.path());

    let pages = load_pdf(pdf.to_str().unwrap(), 1, 1)
        .await
        .expect("page 1 should render");
    let request = OcrRequest::new(OcrMode::Gundam, TaskType::Document);

    let output = run_deepseek_ocr(&pages, &request, &config)
        .await
        .expect("OCR should run");

    assert_eq!(output.pages.len(), 1);
    assert_eq!(output.success_count(), 1, "{:?}", output.pages[0].error());
    assert!(output.markdown.starts_with("--- Page 1 ---\n"));
    assert_clean_markdown(&output.markdown, "attention p1");
    assert!(config.result_dir().join("page_1.mmd").is_file());
}

#[tokio::test]
async fn small_mode_free_ocr_over_two_pages() {
    let (pdf, models_dir) = e2e_skip_unless_ready!(test_cases_dir().join("irs_form_1040.pdf"));
    let out = tempfile::tempdir().unwrap();
    let config = e2e_config(models_dir, out.path());

    let pages = load_pdf(pdf.to_str().unwrap(), 1, 2)
        .await
        .expect("pages should render");
    let request = OcrRequest::from_host("Small", "without layouts", "");

    let output = run_deepseek_ocr(&pages, &request, &config)
        .await
        .expect("OCR should run");

    assert_eq!(output.pages.len(), 2);
    assert!(output.markdown.contains("--- Page 2 ---"));
    let on_disk = std::fs::read_to_string(config.aggregate_path()).unwrap();
    assert_eq!(on_disk, output.markdown);
}
