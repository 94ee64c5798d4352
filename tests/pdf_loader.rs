//! Integration tests for the PDF loader.
//!
//! Path validation runs everywhere. Rendering tests need a pdfium library
//! (system-wide or via `PDFIUM_LIB_PATH`) and skip themselves without one.

use std::path::{Path, PathBuf};
use swan_ocr::pipeline::render::bind_pdfium;
use swan_ocr::{load_pdf, load_pdf_blocking, ErrorKind, SwanOcrError};
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test if pdfium cannot be bound on this machine.
macro_rules! skip_without_pdfium {
    () => {{
        if let Err(e) = bind_pdfium() {
            println!("SKIP: pdfium unavailable: {e}");
            return;
        }
    }};
}

/// A valid PDF with one blank page per entry of `widths` (points, 72 pt tall).
fn blank_pdf(widths: &[u32]) -> Vec<u8> {
    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            (0..widths.len())
                .map(|i| format!("{} 0 R", i + 3))
                .collect::<Vec<_>>()
                .join(" "),
            widths.len()
        ),
    ];
    for w in widths {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {w} 72] >>"
        ));
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for off in offsets {
        out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref
        )
        .as_bytes(),
    );
    out
}

fn write_file(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

fn as_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ── Validation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_and_quoted_empty_paths_are_invalid() {
    for raw in ["", "   ", "\"\"", " '' "] {
        let err = load_pdf(raw, 1, 1).await.unwrap_err();
        assert!(matches!(err, SwanOcrError::EmptyPath), "{raw:?} → {err}");
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}

#[tokio::test]
async fn missing_file_reports_resolved_path() {
    let err = load_pdf("no/such/dir/report.pdf", 1, 1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let resolved = std::env::current_dir()
        .unwrap()
        .join("no/such/dir/report.pdf");
    let msg = err.to_string();
    assert!(msg.contains(&resolved.display().to_string()), "got: {msg}");
    assert!(msg.contains("no/such/dir/report.pdf"));
}

#[tokio::test]
async fn directory_is_not_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let sub = dir.path().join("looks.pdf");
    std::fs::create_dir(&sub).unwrap();

    let err = load_pdf(as_str(&sub), 1, 1).await.unwrap_err();
    assert!(matches!(err, SwanOcrError::FileNotFound { .. }));
}

#[tokio::test]
async fn wrong_extension_is_invalid_input() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["scan.png", "notes.pdf.txt", "README"] {
        let path = write_file(&dir, name, &blank_pdf(&[72]));
        let err = load_pdf(as_str(&path), 1, 1).await.unwrap_err();
        assert!(matches!(err, SwanOcrError::NotAPdf { .. }), "{name} → {err}");
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}

#[tokio::test]
async fn quoted_path_with_whitespace_is_accepted() {
    skip_without_pdfium!();
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "quoted.pdf", &blank_pdf(&[72]));

    let raw = format!("  \"{}\"\n", path.display());
    let pages = load_pdf(&raw, 1, 1).await.unwrap();
    assert_eq!(pages.len(), 1);
}

// ── Rendering ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn extension_check_ignores_case() {
    skip_without_pdfium!();
    let dir = tempfile::tempdir().unwrap();
    for name in ["upper.PDF", "mixed.Pdf"] {
        let path = write_file(&dir, name, &blank_pdf(&[72]));
        let pages = load_pdf(as_str(&path), 1, 1).await.unwrap();
        assert_eq!(pages.len(), 1, "{name}");
    }
}

#[tokio::test]
async fn garbage_pdf_is_invalid_input() {
    skip_without_pdfium!();
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "broken.pdf", b"this is not a pdf at all");

    let err = load_pdf(as_str(&path), 1, 1).await.unwrap_err();
    assert!(matches!(err, SwanOcrError::UnreadablePdf { .. }), "got {err}");
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn out_of_range_pages_are_invalid_input() {
    skip_without_pdfium!();
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "three.pdf", &blank_pdf(&[72, 72, 72]));

    for (start, end) in [(0, 1), (3, 2), (1, 4), (4, 4)] {
        let err = load_pdf(as_str(&path), start, end).await.unwrap_err();
        match err {
            SwanOcrError::InvalidPageRange { total, .. } => assert_eq!(total, 3),
            other => panic!("({start}, {end}) → {other}"),
        }
    }
}

#[tokio::test]
async fn returns_one_image_per_page_in_order() {
    skip_without_pdfium!();
    let dir = tempfile::tempdir().unwrap();
    // 36 pt at 200 DPI is 100 px, so widths identify the pages.
    let path = write_file(&dir, "widths.pdf", &blank_pdf(&[36, 72, 108, 144]));

    let pages = load_pdf(as_str(&path), 2, 4).await.unwrap();
    assert_eq!(pages.len(), 3);

    let widths: Vec<usize> = pages.iter().map(|t| t.shape()[2]).collect();
    for (got, want) in widths.iter().zip([200usize, 300, 400]) {
        assert!(got.abs_diff(want) <= 1, "widths {widths:?}");
    }
    for t in &pages {
        assert_eq!(t.shape()[0], 1);
        assert_eq!(t.shape()[3], 3);
        assert!(t.shape()[1].abs_diff(200) <= 1);
    }
}

#[tokio::test]
async fn single_page_values_are_normalised() {
    skip_without_pdfium!();
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "one.pdf", &blank_pdf(&[72]));

    let pages = load_pdf(as_str(&path), 1, 1).await.unwrap();
    let tensor = &pages[0];
    assert_eq!(tensor.shape()[3], 3);
    assert!(tensor.iter().all(|v| (0.0..=1.0).contains(v)));
    // A blank page renders white.
    assert!(tensor.iter().all(|v| *v > 0.9));
}

#[test]
fn blocking_loader_matches_async_contract() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("gone.pdf");
    let err = load_pdf_blocking(as_str(&missing), 1, 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    if bind_pdfium().is_err() {
        println!("SKIP: pdfium unavailable");
        return;
    }
    let path = write_file(&dir, "two.pdf", &blank_pdf(&[72, 72]));
    assert_eq!(load_pdf_blocking(as_str(&path), 1, 2).unwrap().len(), 2);
}
