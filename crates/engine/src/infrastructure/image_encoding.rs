//! PNG re-encoding shared by the image adapters.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

use crate::infrastructure::ports::ImageGenError;

/// Edge length images are reduced to before they are sent to the browser.
pub const THUMBNAIL_SIZE: u32 = 400;

/// Encode as PNG, then base64.
pub fn encode_png_base64(image: &DynamicImage) -> Result<String, ImageGenError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| ImageGenError::Encoding(e.to_string()))?;
    Ok(BASE64.encode(buffer.into_inner()))
}

/// Decode raw image bytes, shrink to fit [`THUMBNAIL_SIZE`] keeping aspect ratio,
/// and re-encode as base64 PNG.
pub fn thumbnail_png_base64(bytes: &[u8]) -> Result<String, ImageGenError> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| ImageGenError::Encoding(e.to_string()))?;
    let thumbnail = if decoded.width() > THUMBNAIL_SIZE || decoded.height() > THUMBNAIL_SIZE {
        decoded.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE)
    } else {
        decoded
    };
    encode_png_base64(&thumbnail)
}
