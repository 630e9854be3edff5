//! Poster generation with the Gemini image model ("Nano Banana").

use crate::config::{DEFAULT_API_BASE_URL, DEFAULT_IMAGE_MODEL};
use crate::credentials::{CredentialProvider, EnvCredentials, SharedCredentials};
use crate::error::{Result, StoryError};
use crate::gemini::{GeminiClient, GenerateContentRequest};
use crate::media::types::{GeneratedImage, GenerationMetadata, ImageFormat};
use async_trait::async_trait;
use base64::Engine;
use std::sync::Arc;
use std::time::Instant;

/// Trait for poster generators.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generates one image from a text prompt.
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage>;
}

/// Builder for [`GeminiImageProvider`].
#[derive(Clone)]
pub struct GeminiImageProviderBuilder {
    credentials: Arc<dyn CredentialProvider>,
    model: String,
    base_url: String,
}

impl Default for GeminiImageProviderBuilder {
    fn default() -> Self {
        Self {
            credentials: Arc::new(EnvCredentials),
            model: DEFAULT_IMAGE_MODEL.to_string(),
            base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

impl GeminiImageProviderBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a fixed API key instead of the environment.
    pub fn api_key(self, key: impl Into<String>) -> Self {
        self.credentials(Arc::new(SharedCredentials::with_key(key)))
    }

    /// Sets where the API key comes from on each call.
    pub fn credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Sets the image model.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the API root.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Builds the provider.
    pub fn build(self) -> GeminiImageProvider {
        GeminiImageProvider {
            client: GeminiClient::new(self.base_url, self.credentials),
            model: self.model,
        }
    }
}

/// Gemini image generation provider.
#[derive(Debug, Clone)]
pub struct GeminiImageProvider {
    client: GeminiClient,
    model: String,
}

impl GeminiImageProvider {
    /// Creates a new [`GeminiImageProviderBuilder`].
    pub fn builder() -> GeminiImageProviderBuilder {
        GeminiImageProviderBuilder::new()
    }

    async fn generate_impl(&self, prompt: &str) -> Result<GeneratedImage> {
        let start = Instant::now();
        let body = GenerateContentRequest::text(prompt).with_response_modalities(&["IMAGE"]);
        let response = self.client.generate_content(&self.model, &body).await?;

        if let Some(reason) = response.finish_reason() {
            match reason {
                "SAFETY"
                | "IMAGE_SAFETY"
                | "IMAGE_PROHIBITED_CONTENT"
                | "IMAGE_RECITATION"
                | "RECITATION"
                | "PROHIBITED_CONTENT"
                | "BLOCKLIST" => {
                    return Err(StoryError::ContentBlocked(format!(
                        "Content blocked by Gemini safety filter: {reason}"
                    )));
                }
                "IMAGE_OTHER" | "NO_IMAGE" => {
                    return Err(StoryError::UnexpectedResponse(format!(
                        "Generation failed: {reason}. Try a different prompt."
                    )));
                }
                _ => {} // STOP, MAX_TOKENS, etc. are normal
            }
        }

        let inline = response.first_inline_data().ok_or_else(|| {
            StoryError::UnexpectedResponse("No image data returned from the image model".into())
        })?;

        // Line-wrapped payloads are valid base64 once whitespace is dropped
        let encoded: String = inline
            .data
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let data = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| StoryError::Decode(e.to_string()))?;
        if data.is_empty() {
            return Err(StoryError::UnexpectedResponse("image model returned empty data".into()));
        }

        let format = inline
            .mime_type
            .as_deref()
            .map(ImageFormat::from_mime_type)
            .or_else(|| ImageFormat::from_magic_bytes(&data))
            .unwrap_or_default();

        Ok(GeneratedImage {
            data,
            format,
            metadata: GenerationMetadata {
                model: Some(self.model.clone()),
                duration_ms: Some(start.elapsed().as_millis() as u64),
            },
        })
    }
}

#[async_trait]
impl ImageProvider for GeminiImageProvider {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage> {
        self.generate_impl(prompt).await
    }
}
