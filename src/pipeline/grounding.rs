//! Post-processing of grounded DeepSeek-OCR output.
//!
//! With `<|grounding|>` in the prompt the model interleaves its markdown with
//! layout annotations:
//!
//! ```text
//! <|ref|>title<|/ref|><|det|>[[84, 40, 910, 92]]<|/det|>
//! # Quarterly Report
//! <|ref|>image<|/ref|><|det|>[[120, 300, 880, 610]]<|/det|>
//! ```
//!
//! Coordinates live on a 0..=999 grid relative to the page. Annotations are
//! removed from the transcription; those labelled `image` become markdown
//! image links to crops of the page saved next to the result file.

use image::{imageops, RgbImage};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Sub-directory of the result directory receiving figure crops.
pub const FIGURE_DIR_NAME: &str = "images";

/// Stop token some serving stacks leave at the end of the completion.
const END_OF_SENTENCE: &str = "<｜end▁of▁sentence｜>";

/// Side of the coordinate grid used in `<|det|>` boxes.
const GRID_MAX: f64 = 999.0;

static RE_GROUNDING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<\|ref\|>(.*?)<\|/ref\|><\|det\|>(.*?)<\|/det\|>").unwrap()
});

static RE_BOX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)\s*\]").unwrap()
});

static RE_FIGURE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(!\[[^\]]*\]\(){FIGURE_DIR_NAME}/")).unwrap());

/// A figure region to crop out of the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FigureRef {
    /// File name inside [`FIGURE_DIR_NAME`].
    pub file_name: String,
    /// `[x1, y1, x2, y2]` on the 0..=999 grid.
    pub bbox: [u32; 4],
}

/// Cleaned transcription plus the figures it links to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanedOutput {
    pub markdown: String,
    pub figures: Vec<FigureRef>,
}

/// Strip grounding annotations from `raw`.
///
/// Figure crops are named `<figure_prefix>_<n>.jpg`, numbered from 0 in
/// order of appearance.
pub fn clean_grounded_output(raw: &str, figure_prefix: &str) -> CleanedOutput {
    let raw = raw.trim_end().trim_end_matches(END_OF_SENTENCE);
    let mut figures = Vec::new();

    let markdown = RE_GROUNDING.replace_all(raw, |caps: &Captures| {
        if caps[1].trim() != "image" {
            return String::new();
        }
        let mut links = String::new();
        for bbox in parse_boxes(&caps[2]) {
            let file_name = format!("{figure_prefix}_{}.jpg", figures.len());
            links.push_str(&format!("![]({FIGURE_DIR_NAME}/{file_name})\n"));
            figures.push(FigureRef { file_name, bbox });
        }
        links
    });

    let markdown = markdown
        .replace("\\coloneqq", ":=")
        .replace("\\eqqcolon", "=:");

    CleanedOutput {
        markdown: markdown.trim().to_string(),
        figures,
    }
}

fn parse_boxes(det: &str) -> Vec<[u32; 4]> {
    RE_BOX
        .captures_iter(det)
        .filter_map(|c| {
            Some([
                c[1].parse().ok()?,
                c[2].parse().ok()?,
                c[3].parse().ok()?,
                c[4].parse().ok()?,
            ])
        })
        .collect()
}

/// Prefix figure links with `base`, for documents stored one level above
/// the directory holding [`FIGURE_DIR_NAME`].
pub fn rebase_figure_links(markdown: &str, base: &str) -> String {
    RE_FIGURE_LINK
        .replace_all(markdown, format!("${{1}}{base}/{FIGURE_DIR_NAME}/"))
        .into_owned()
}

/// Crop a grid-relative box out of the page; `None` for degenerate boxes.
pub fn crop_figure(page: &RgbImage, bbox: [u32; 4]) -> Option<RgbImage> {
    let (width, height) = page.dimensions();
    let scale = |v: u32, side: u32| -> u32 {
        (v.min(GRID_MAX as u32) as f64 * side as f64 / GRID_MAX) as u32
    };

    let x1 = scale(bbox[0], width);
    let y1 = scale(bbox[1], height);
    let x2 = scale(bbox[2], width);
    let y2 = scale(bbox[3], height);
    if x2 <= x1 || y2 <= y1 {
        return None;
    }

    Some(imageops::crop_imm(page, x1, y1, x2 - x1, y2 - y1).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn strips_non_figure_annotations() {
        let raw = "<|ref|>title<|/ref|><|det|>[[84, 40, 910, 92]]<|/det|>\n# Report\n\
                   <|ref|>text<|/ref|><|det|>[[84, 120, 910, 300]]<|/det|>\nBody text.";
        let out = clean_grounded_output(raw, "page");
        assert_eq!(out.markdown, "# Report\n\nBody text.");
        assert!(out.figures.is_empty());
    }

    #[test]
    fn figures_become_links() {
        let raw = "Intro\n<|ref|>image<|/ref|><|det|>[[100, 200, 500, 600]]<|/det|>\n\
                   <|ref|>image<|/ref|><|det|>[[0, 0, 999, 999]]<|/det|>\nOutro";
        let out = clean_grounded_output(raw, "temp_page_2");
        assert_eq!(out.figures.len(), 2);
        assert_eq!(out.figures[0].file_name, "temp_page_2_0.jpg");
        assert_eq!(out.figures[0].bbox, [100, 200, 500, 600]);
        assert!(out.markdown.contains("![](images/temp_page_2_0.jpg)"));
        assert!(out.markdown.contains("![](images/temp_page_2_1.jpg)"));
        assert!(out.markdown.starts_with("Intro"));
        assert!(out.markdown.ends_with("Outro"));
    }

    #[test]
    fn latex_operators_and_stop_token() {
        let raw = "$a \\coloneqq b$ and $c \\eqqcolon d$<｜end▁of▁sentence｜>";
        let out = clean_grounded_output(raw, "p");
        assert_eq!(out.markdown, "$a := b$ and $c =: d$");
    }

    #[test]
    fn plain_output_passes_through() {
        let out = clean_grounded_output("Free OCR text\n", "p");
        assert_eq!(out.markdown, "Free OCR text");
    }

    #[test]
    fn rebased_links_point_into_result_dir() {
        let md = "# A\n![](images/temp_page_1_0.jpg)\n![chart](images/x.jpg)\nsee images/raw.txt";
        assert_eq!(
            rebase_figure_links(md, "results"),
            "# A\n![](results/images/temp_page_1_0.jpg)\n![chart](results/images/x.jpg)\nsee images/raw.txt"
        );
    }

    #[test]
    fn crop_scales_grid_coordinates() {
        let page = RgbImage::from_pixel(1998, 999, Rgb([1, 2, 3]));
        let crop = crop_figure(&page, [0, 0, 999, 999]).unwrap();
        assert_eq!(crop.dimensions(), (1998, 999));

        let half = crop_figure(&page, [0, 0, 500, 500]).unwrap();
        assert_eq!(half.dimensions(), (1000, 500));

        assert!(crop_figure(&page, [500, 10, 400, 20]).is_none());
    }
}
