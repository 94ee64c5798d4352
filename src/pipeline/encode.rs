//! Image encoding: `RgbImage` view → base64 PNG wrapped in `ImageData`.
//!
//! Chat-style inference endpoints accept images as base64 data embedded in
//! the request body. PNG keeps rendered glyph edges intact; JPEG artefacts
//! around small text measurably hurt OCR.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::RgbImage;
use std::io::Cursor;
use tracing::debug;

/// Encode one preprocessed view as a base64 PNG for the inference request.
pub fn encode_view(img: &RgbImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!(
        "Encoded {}x{} view → {} bytes base64",
        img.width(),
        img.height(),
        b64.len()
    );

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}
