//! Task prompts sent to DeepSeek-OCR.
//!
//! Each [`TaskType`] selects one fixed instruction. The `<image>` placeholder
//! and the `<|grounding|>` switch are part of the model's prompt grammar:
//! grounding asks the model to emit layout boxes alongside the text, which
//! [`crate::pipeline::grounding`] later strips or turns into figure crops.
//!
//! A non-empty custom prompt always wins over the task template; see
//! [`resolve_prompt`].

use crate::config::TaskType;

/// Prompt for [`TaskType::Document`]; also the fallback for unknown task names.
pub const DOCUMENT_PROMPT: &str = "<image>\n<|grounding|>Convert the document to markdown.";

/// Prompt for [`TaskType::WithoutLayouts`].
pub const FREE_OCR_PROMPT: &str = "<image>\nFree OCR.";

/// Prompt for [`TaskType::OtherImage`].
pub const OTHER_IMAGE_PROMPT: &str = "<image>\n<|grounding|>OCR this image.";

/// Prompt for [`TaskType::FiguresInDocument`].
pub const FIGURE_PROMPT: &str = "<image>\nParse the figure.";

/// Prompt for [`TaskType::General`].
pub const GENERAL_PROMPT: &str = "<image>\nDescribe this image in detail.";

/// Image placeholder understood by the model's own prompt template.
pub const IMAGE_PLACEHOLDER: &str = "<image>";

impl TaskType {
    /// The fixed prompt template for this task.
    pub fn prompt(self) -> &'static str {
        match self {
            TaskType::Document => DOCUMENT_PROMPT,
            TaskType::WithoutLayouts => FREE_OCR_PROMPT,
            TaskType::OtherImage => OTHER_IMAGE_PROMPT,
            TaskType::FiguresInDocument => FIGURE_PROMPT,
            TaskType::General => GENERAL_PROMPT,
        }
    }
}

/// Pick the prompt for one OCR run.
///
/// `custom_prompt` is used verbatim when it is non-empty; otherwise the
/// template of `task_type` is returned.
pub fn resolve_prompt(task_type: TaskType, custom_prompt: &str) -> String {
    if custom_prompt.is_empty() {
        task_type.prompt().to_string()
    } else {
        custom_prompt.to_string()
    }
}

/// Strip the `<image>` placeholder for chat-style backends that attach the
/// image out of band.
pub fn chat_instruction(prompt: &str) -> String {
    prompt.replace(IMAGE_PLACEHOLDER, "").trim_start().to_string()
}
