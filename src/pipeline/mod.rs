//! Pipeline stages shared by the two node units.
//!
//! ## Data Flow
//!
//! ```text
//! PDF Loader:  input ──▶ render ──▶ tensor
//!              (path)    (pdfium)   ([1, H, W, 3] f32)
//!
//! OCR Runner:  tensor ──▶ preprocess ──▶ encode ──▶ model ──▶ grounding
//!              (PNG file)  (views)       (base64)   (VLM)     (cleanup)
//! ```
//!
//! 1. [`input`]: clean and resolve the user-typed path; page range checks
//! 2. [`render`]: rasterise the selected pages on a single blocking thread
//! 3. [`tensor`]: convert between bitmaps and the host image container
//! 4. [`preprocess`]: build the mode-dependent global view and crop tiles
//! 5. [`encode`]: PNG-encode and base64-wrap each view for the request
//! 6. [`grounding`]: strip layout annotations, collect figure crops

pub mod encode;
pub mod grounding;
pub mod input;
pub mod preprocess;
pub mod render;
pub mod tensor;
