//! Hugging Face inference client
//!
//! Implements the ImageGenPort trait against a text-to-image inference endpoint,
//! trying each configured key in turn.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tokio::time::sleep;

use crate::infrastructure::image_encoding::thumbnail_png_base64;
use crate::infrastructure::key_pool::KeyPool;
use crate::infrastructure::ports::{ImageGenError, ImageGenPort, ImageRequest, ImageResult};

/// Default inference endpoint (Stable Diffusion XL).
pub const DEFAULT_HF_API_URL: &str =
    "https://api-inference.huggingface.co/models/stabilityai/stable-diffusion-xl-base-1.0";

/// Client for the Hugging Face inference API
pub struct HuggingFaceClient {
    client: Client,
    api_url: String,
    keys: KeyPool,
    retry_delay: Duration,
}

impl HuggingFaceClient {
    pub fn new(api_url: &str, keys: KeyPool, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_url: api_url.to_string(),
            keys,
            retry_delay: Duration::from_secs(1),
        }
    }

    /// Override the pause between keys (for testing).
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    async fn request_with_key(
        &self,
        api_key: &str,
        request: &ImageRequest,
    ) -> Result<ImageResult, ImageGenError> {
        let body = InferenceRequest {
            inputs: &request.prompt,
            parameters: InferenceParameters {
                negative_prompt: &request.negative_prompt,
                num_inference_steps: request.num_inference_steps,
                guidance_scale: request.guidance_scale,
            },
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ImageGenError::GenerationFailed(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ImageGenError::GenerationFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                error_text
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("image/") {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| ImageGenError::GenerationFailed(e.to_string()))?;
            return Ok(ImageResult {
                base64_data: thumbnail_png_base64(&bytes)?,
            });
        }

        if content_type.starts_with("application/json") {
            let json: serde_json::Value = response
                .json()
                .await
                .map_err(|e| ImageGenError::GenerationFailed(e.to_string()))?;
            return image_from_json(&json)
                .map(|base64_data| ImageResult { base64_data })
                .ok_or_else(|| {
                    ImageGenError::GenerationFailed("JSON response carried no image".to_string())
                });
        }

        Err(ImageGenError::GenerationFailed(format!(
            "Unexpected content type: {content_type}"
        )))
    }
}

#[async_trait]
impl ImageGenPort for HuggingFaceClient {
    async fn generate(&self, request: ImageRequest) -> Result<ImageResult, ImageGenError> {
        let attempts = self.keys.len();
        if attempts == 0 {
            return Err(ImageGenError::Unavailable);
        }

        for attempt in 0..attempts {
            let Some(api_key) = self.keys.next_key() else {
                break;
            };
            match self.request_with_key(api_key, &request).await {
                Ok(result) => {
                    tracing::debug!(attempt = attempt + 1, "Image generated");
                    return Ok(result);
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = attempts,
                        error = %e,
                        "Image request failed"
                    );
                    if attempt + 1 < attempts {
                        sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(ImageGenError::Unavailable)
    }
}

/// Pull an already-encoded image out of a JSON reply.
fn image_from_json(json: &serde_json::Value) -> Option<String> {
    ["generated_image", "image"]
        .iter()
        .find_map(|field| json.get(field).and_then(|v| v.as_str()))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// =============================================================================
// Inference API types
// =============================================================================

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters<'a>,
}

#[derive(Debug, Serialize)]
struct InferenceParameters<'a> {
    negative_prompt: &'a str,
    num_inference_steps: u32,
    guidance_scale: f32,
}
