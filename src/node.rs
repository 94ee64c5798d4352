//! Host node contract.
//!
//! The node-graph host discovers units through their declared schemas and
//! calls one entry point per unit with raw field values. Enumerations arrive
//! as strings; unknown values fall back to the defaults.

use crate::config::{OcrConfig, OcrMode, OcrRequest, TaskType};
use crate::error::SwanOcrError;
use crate::loader::load_pdf_blocking;
use crate::pipeline::tensor::ImageTensor;
use crate::runner::run_ocr_blocking;
use serde::Serialize;
use std::collections::BTreeMap;

/// Category both units are listed under.
pub const CATEGORY: &str = "SwanOCR";

pub const PDF_LOADER_NODE: &str = "LoadPDFtoImage";
pub const OCR_RUNNER_NODE: &str = "DeepSeekOCRNode";

/// Upper bound the host enforces on page number widgets.
pub const MAX_PAGE_NUMBER: i64 = 9999;

/// Semantic type of an input field, with its widget settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    String {
        default: &'static str,
        multiline: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<&'static str>,
    },
    Int {
        default: i64,
        min: i64,
        max: i64,
    },
    Choice {
        options: Vec<&'static str>,
        default: &'static str,
    },
    Image,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputField {
    pub name: &'static str,
    #[serde(flatten)]
    pub field_type: FieldType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputField {
    pub name: &'static str,
    /// Host type label (`IMAGE`, `STRING`).
    pub type_label: &'static str,
    /// The host fans a list output out element by element downstream.
    pub is_list: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSchema {
    pub name: &'static str,
    pub display_name: &'static str,
    pub category: &'static str,
    pub inputs: Vec<InputField>,
    pub outputs: Vec<OutputField>,
    /// Terminal node whose result the host surfaces to the user.
    pub output_node: bool,
}

impl NodeSchema {
    pub fn input(&self, name: &str) -> Option<&InputField> {
        self.inputs.iter().find(|f| f.name == name)
    }
}

fn page_field(name: &'static str) -> InputField {
    InputField {
        name,
        field_type: FieldType::Int {
            default: 1,
            min: 1,
            max: MAX_PAGE_NUMBER,
        },
    }
}

pub fn pdf_loader_schema() -> NodeSchema {
    NodeSchema {
        name: PDF_LOADER_NODE,
        display_name: "📄 Load PDF from Path",
        category: CATEGORY,
        inputs: vec![
            InputField {
                name: "pdf_absolute_path",
                field_type: FieldType::String {
                    default: "",
                    multiline: false,
                    placeholder: Some(r"e.g., M:\docs\file.pdf or /home/user/file.pdf"),
                },
            },
            page_field("start_page"),
            page_field("end_page"),
        ],
        outputs: vec![OutputField {
            name: "IMAGE",
            type_label: "IMAGE",
            is_list: true,
        }],
        output_node: false,
    }
}

pub fn ocr_runner_schema() -> NodeSchema {
    NodeSchema {
        name: OCR_RUNNER_NODE,
        display_name: "🧠 DeepSeek OCR (Images → Markdown)",
        category: CATEGORY,
        inputs: vec![
            InputField {
                name: "images",
                field_type: FieldType::Image,
            },
            InputField {
                name: "mode",
                field_type: FieldType::Choice {
                    options: OcrMode::ALL.iter().map(|m| m.name()).collect(),
                    default: OcrMode::default().name(),
                },
            },
            InputField {
                name: "task_type",
                field_type: FieldType::Choice {
                    options: TaskType::ALL.iter().map(|t| t.name()).collect(),
                    default: TaskType::default().name(),
                },
            },
            InputField {
                name: "custom_prompt",
                field_type: FieldType::String {
                    default: "",
                    multiline: false,
                    placeholder: Some("Enter custom prompt (optional)"),
                },
            },
        ],
        outputs: vec![OutputField {
            name: "markdown_text",
            type_label: "STRING",
            is_list: false,
        }],
        output_node: true,
    }
}

/// Both schemas keyed by node name.
pub fn registry() -> BTreeMap<&'static str, NodeSchema> {
    [pdf_loader_schema(), ocr_runner_schema()]
        .into_iter()
        .map(|s| (s.name, s))
        .collect()
}

/// `LoadPDFtoImage` entry point.
///
/// Page numbers below 1 are reported as an invalid range rather than
/// wrapped.
pub fn load_pdf_to_image(
    pdf_absolute_path: &str,
    start_page: i64,
    end_page: i64,
) -> Result<Vec<ImageTensor>, SwanOcrError> {
    let start = usize::try_from(start_page).unwrap_or(0);
    let end = usize::try_from(end_page).unwrap_or(0);
    load_pdf_blocking(pdf_absolute_path, start, end)
}

/// `DeepSeekOCRNode` entry point. Returns the aggregate markdown.
pub fn deepseek_ocr(
    images: &[ImageTensor],
    mode: &str,
    task_type: &str,
    custom_prompt: &str,
    config: &OcrConfig,
) -> Result<String, SwanOcrError> {
    let request = OcrRequest::from_host(mode, task_type, custom_prompt);
    run_ocr_blocking(images, &request, config).map(|out| out.markdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn registry_lists_both_units() {
        let reg = registry();
        assert_eq!(reg.len(), 2);
        assert_eq!(reg[PDF_LOADER_NODE].display_name, "📄 Load PDF from Path");
        assert!(reg[OCR_RUNNER_NODE].output_node);
        assert!(reg.values().all(|s| s.category == CATEGORY));
    }

    #[test]
    fn loader_output_is_a_list() {
        let schema = pdf_loader_schema();
        assert!(schema.outputs[0].is_list);
        assert_eq!(
            schema.input("end_page").map(|f| &f.field_type),
            Some(&FieldType::Int {
                default: 1,
                min: 1,
                max: 9999
            })
        );
    }

    #[test]
    fn runner_choices_match_tables() {
        let schema = ocr_runner_schema();
        match &schema.input("mode").unwrap().field_type {
            FieldType::Choice { options, default } => {
                assert_eq!(options, &["Tiny", "Small", "Base", "Large", "Gundam"]);
                assert_eq!(*default, "Gundam");
            }
            other => panic!("unexpected field type {other:?}"),
        }
        match &schema.input("task_type").unwrap().field_type {
            FieldType::Choice { options, default } => {
                assert_eq!(options.len(), 5);
                assert!(options.contains(&"without layouts"));
                assert_eq!(*default, "document");
            }
            other => panic!("unexpected field type {other:?}"),
        }
    }

    #[test]
    fn schema_serialises_with_type_tags() {
        let json = serde_json::to_value(pdf_loader_schema()).unwrap();
        assert_eq!(json["inputs"][0]["type"], "STRING");
        assert_eq!(json["inputs"][1]["type"], "INT");
        assert_eq!(json["inputs"][1]["max"], 9999);
        assert_eq!(json["outputs"][0]["is_list"], true);
    }

    #[test]
    fn host_visible_labels() {
        let reg = registry();
        assert_eq!(
            reg[OCR_RUNNER_NODE].display_name,
            "🧠 DeepSeek OCR (Images → Markdown)"
        );
        let placeholder = |schema: &NodeSchema, name: &str| {
            match &schema.input(name).unwrap().field_type {
                FieldType::String { placeholder, .. } => *placeholder,
                other => panic!("unexpected field type {other:?}"),
            }
        };
        assert_eq!(
            placeholder(&reg[PDF_LOADER_NODE], "pdf_absolute_path"),
            Some(r"e.g., M:\docs\file.pdf or /home/user/file.pdf")
        );
        assert_eq!(
            placeholder(&reg[OCR_RUNNER_NODE], "custom_prompt"),
            Some("Enter custom prompt (optional)")
        );
    }

    #[test]
    fn empty_path_is_rejected_before_anything_else() {
        let err = load_pdf_to_image("  \"\"  ", -3, 0).unwrap_err();
        assert!(matches!(err, SwanOcrError::EmptyPath));
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn missing_model_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = OcrConfig::builder()
            .models_dir(dir.path())
            .output_dir(dir.path().join("out"))
            .build()
            .unwrap();
        let err = deepseek_ocr(&[], "Gundam", "document", "", &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("DeepSeek-OCR-Latest-BF16.I64"));
    }
}
