//! Input resolution: normalise a user-typed PDF path and validate page ranges.
//!
//! Paths arrive from a single-line text widget, so they often carry stray
//! whitespace or the quotes a file manager adds when copying a path. Both are
//! stripped before the path is made absolute against the working directory.

use crate::error::SwanOcrError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Strip surrounding whitespace, then double quotes, then single quotes.
pub fn clean_path_input(raw: &str) -> &str {
    raw.trim().trim_matches('"').trim_matches('\'')
}

/// Resolve a raw path string to an absolute path of an existing `.pdf` file.
///
/// Checks, in order: non-empty after cleaning, a regular file exists at the
/// absolute path, the extension is `pdf` (any case).
pub fn resolve_pdf_path(raw: &str) -> Result<PathBuf, SwanOcrError> {
    let cleaned = clean_path_input(raw);
    if cleaned.is_empty() {
        return Err(SwanOcrError::EmptyPath);
    }

    let resolved = absolutize(Path::new(cleaned))?;

    if !resolved.is_file() {
        return Err(SwanOcrError::FileNotFound {
            input: cleaned.to_string(),
            resolved,
        });
    }

    if !has_pdf_extension(&resolved) {
        return Err(SwanOcrError::NotAPdf { path: resolved });
    }

    debug!("Resolved local PDF: {}", resolved.display());
    Ok(resolved)
}

fn absolutize(path: &Path) -> Result<PathBuf, SwanOcrError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::path::absolute(path)
        .map_err(|e| SwanOcrError::Internal(format!("cannot resolve '{}': {e}", path.display())))
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// An inclusive, 1-indexed page range known to fit the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    start: usize,
    end: usize,
}

impl PageRange {
    /// Validate `1 <= start <= end <= total_pages`.
    pub fn new(start: usize, end: usize, total_pages: usize) -> Result<Self, SwanOcrError> {
        if !(1 <= start && start <= end && end <= total_pages) {
            return Err(SwanOcrError::InvalidPageRange {
                start,
                end,
                total: total_pages,
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of pages covered; always at least one.
    pub fn page_count(&self) -> usize {
        self.end - self.start + 1
    }

    /// 0-indexed page indices in page order.
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        (self.start - 1)..self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn cleans_whitespace_and_quotes() {
        assert_eq!(clean_path_input("  \"/tmp/a.pdf\"  "), "/tmp/a.pdf");
        assert_eq!(clean_path_input("'/tmp/a.pdf'"), "/tmp/a.pdf");
        assert_eq!(clean_path_input("\"'/tmp/a.pdf'\""), "/tmp/a.pdf");
        assert_eq!(clean_path_input(" \"\" "), "");
    }

    #[test]
    fn empty_path_is_invalid_input() {
        let err = resolve_pdf_path("  '' ").unwrap_err();
        assert!(matches!(err, SwanOcrError::EmptyPath));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn missing_relative_path_reports_absolute_path() {
        let err = resolve_pdf_path("surely-missing-dir/doc.pdf").unwrap_err();
        match &err {
            SwanOcrError::FileNotFound { input, resolved } => {
                assert_eq!(input, "surely-missing-dir/doc.pdf");
                assert!(resolved.is_absolute());
                assert!(err.to_string().contains(&resolved.display().to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(has_pdf_extension(Path::new("/a/b.pdf")));
        assert!(has_pdf_extension(Path::new("/a/b.PDF")));
        assert!(has_pdf_extension(Path::new("/a/b.Pdf")));
        assert!(!has_pdf_extension(Path::new("/a/b.png")));
        assert!(!has_pdf_extension(Path::new("/a/pdf")));
    }

    #[test]
    fn page_range_bounds() {
        let r = PageRange::new(2, 4, 5).unwrap();
        assert_eq!((r.start(), r.end()), (2, 4));
        assert_eq!(r.page_count(), 3);
        assert_eq!(r.indices().collect::<Vec<_>>(), vec![1, 2, 3]);

        assert!(PageRange::new(1, 1, 1).is_ok());
        assert!(PageRange::new(0, 1, 5).is_err());
        assert!(PageRange::new(3, 2, 5).is_err());
        assert!(PageRange::new(1, 6, 5).is_err());
        assert!(PageRange::new(1, 1, 0).is_err());
    }
}
