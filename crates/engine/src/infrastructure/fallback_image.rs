//! Deterministic placeholder art for when the image service is unavailable.

use image::{DynamicImage, Rgb, RgbImage};
use sha2::{Digest, Sha256};

use crate::infrastructure::image_encoding::{encode_png_base64, THUMBNAIL_SIZE};
use crate::infrastructure::ports::ImageGenError;

/// Channel values are squeezed into `[BASE_FLOOR, BASE_FLOOR + BASE_SPAN]`.
const BASE_FLOOR: u32 = 40;
const BASE_SPAN: u32 = 80;
/// Brightness multiplier added between the top and bottom rows.
const GRADIENT_GAIN: f32 = 0.6;

/// Render the placeholder for `theme` as base64 PNG.
///
/// Same theme, same bytes. The only failure is PNG encoding.
pub fn generate_fallback_image(theme: &str) -> Result<String, ImageGenError> {
    let image = render_fallback(theme);
    encode_png_base64(&DynamicImage::ImageRgb8(image))
}

fn render_fallback(theme: &str) -> RgbImage {
    let base = base_color(theme);
    let size = THUMBNAIL_SIZE;
    let last_row = size.saturating_sub(1).max(1) as f32;

    RgbImage::from_fn(size, size, |_, y| {
        let factor = 1.0 + GRADIENT_GAIN * (y as f32 / last_row);
        let shade = |channel: u8| (channel as f32 * factor).min(255.0) as u8;
        Rgb([shade(base[0]), shade(base[1]), shade(base[2])])
    })
}

/// Dark-toned base colour from the first six hex digits of the theme's SHA-256.
fn base_color(theme: &str) -> [u8; 3] {
    let digest = hex::encode(Sha256::digest(theme.as_bytes()));
    let mut color = [0u8; 3];
    for (i, channel) in color.iter_mut().enumerate() {
        let pair = digest.get(i * 2..i * 2 + 2).unwrap_or("00");
        let value = u32::from_str_radix(pair, 16).unwrap_or(0);
        *channel = (BASE_FLOOR + value * BASE_SPAN / 255) as u8;
    }
    color
}
