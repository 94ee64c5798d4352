//! Result types of an OCR run.

use crate::error::PageError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What happened to one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageOutcome {
    /// Markdown read from the model's result file.
    Transcribed(String),
    /// The page is kept as a failure marker.
    Failed(PageError),
}

/// One page of an OCR run, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed position of the image in the run.
    pub page_num: usize,
    pub outcome: PageOutcome,
}

impl PageResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, PageOutcome::Transcribed(_))
    }

    pub fn error(&self) -> Option<&PageError> {
        match &self.outcome {
            PageOutcome::Failed(e) => Some(e),
            PageOutcome::Transcribed(_) => None,
        }
    }

    /// Page header line.
    pub fn header(&self) -> String {
        format!("--- Page {} ---", self.page_num)
    }

    /// Header plus the page markdown or its failure marker.
    pub fn block(&self) -> String {
        match &self.outcome {
            PageOutcome::Transcribed(md) => format!("{}\n{}", self.header(), md),
            PageOutcome::Failed(e) => format!("{}\n{}\n", self.header(), e.marker()),
        }
    }
}

/// Join page blocks into the aggregate document.
pub fn assemble_document(pages: &[PageResult]) -> String {
    pages
        .iter()
        .map(PageResult::block)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Full output of an OCR run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrOutput {
    /// Aggregate markdown, identical to the aggregate file's content.
    pub markdown: String,
    /// One entry per input image, in order.
    pub pages: Vec<PageResult>,
    /// Where the aggregate markdown was written.
    pub output_path: PathBuf,
}

impl OcrOutput {
    pub fn success_count(&self) -> usize {
        self.pages.iter().filter(|p| p.is_success()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.pages.len() - self.success_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_carry_headers_and_markers() {
        let pages = vec![
            PageResult {
                page_num: 1,
                outcome: PageOutcome::Transcribed("# Title".into()),
            },
            PageResult {
                page_num: 2,
                outcome: PageOutcome::Failed(PageError::NoOutput { page: 2 }),
            },
            PageResult {
                page_num: 3,
                outcome: PageOutcome::Failed(PageError::InferenceFailed {
                    page: 3,
                    detail: "timeout".into(),
                }),
            },
        ];

        assert_eq!(pages[0].block(), "--- Page 1 ---\n# Title");
        assert_eq!(pages[1].block(), "--- Page 2 ---\n[OCR failed]\n");
        assert_eq!(pages[2].block(), "--- Page 3 ---\n[Error: timeout]\n");
        assert_eq!(
            assemble_document(&pages),
            "--- Page 1 ---\n# Title\n--- Page 2 ---\n[OCR failed]\n\n--- Page 3 ---\n[Error: timeout]\n"
        );
    }

    #[test]
    fn empty_run_assembles_to_empty_document() {
        assert_eq!(assemble_document(&[]), "");
    }
}
