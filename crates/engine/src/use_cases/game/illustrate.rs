//! Theme illustration use case.
//!
//! Produces at most one image per selected theme. Remote generation failures
//! never reach the player: the deterministic placeholder is used instead.

use std::sync::Arc;

use escaperoom_domain::SessionState;

use crate::infrastructure::fallback_image::generate_fallback_image;
use crate::infrastructure::ports::{ImageGenPort, ImageRequest};

const NEGATIVE_PROMPT: &str = "blurry, low quality, bad composition";
const INFERENCE_STEPS: u32 = 30;
const GUIDANCE_SCALE: f32 = 7.5;

/// Build the text-to-image request for a theme.
pub fn theme_image_request(theme: &str) -> ImageRequest {
    ImageRequest {
        prompt: format!(
            "Illustration of '{theme}' in the theme of '{theme}'. \
             Stylized, atmospheric, cinematic lighting."
        ),
        negative_prompt: NEGATIVE_PROMPT.to_string(),
        num_inference_steps: INFERENCE_STEPS,
        guidance_scale: GUIDANCE_SCALE,
    }
}

pub struct IllustrateTheme {
    image_gen: Arc<dyn ImageGenPort>,
}

impl IllustrateTheme {
    pub fn new(image_gen: Arc<dyn ImageGenPort>) -> Self {
        Self { image_gen }
    }

    /// Base64 PNG for the session's current theme.
    ///
    /// Returns `None` when no theme is selected or the theme was already
    /// illustrated for this session.
    pub async fn execute(&self, state: &mut SessionState) -> Option<String> {
        let theme = state.current_theme()?.to_string();
        if state.last_image_theme() == Some(theme.as_str()) {
            tracing::debug!(theme = %theme, "Theme already illustrated, skipping");
            return None;
        }

        let image = match self.image_gen.generate(theme_image_request(&theme)).await {
            Ok(result) => Some(result.base64_data),
            Err(e) => {
                tracing::warn!(theme = %theme, error = %e, "Image generation failed, using fallback");
                match generate_fallback_image(&theme) {
                    Ok(fallback) => Some(fallback),
                    Err(e) => {
                        tracing::error!(theme = %theme, error = %e, "Fallback image failed");
                        None
                    }
                }
            }
        };

        state.set_last_image_theme(theme);
        image
    }
}
