//! Core types for poster and video generation.

use crate::error::{Result, StoryError};
use crate::plan::ANIMATION_FORMAT;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which kind of media a plan is rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// A square poster image.
    #[default]
    Image,
    /// A vertical short video.
    Video,
}

impl MediaType {
    /// Media produced for a content format: the animation format gets a
    /// video, everything else a poster.
    pub fn for_content_type(content_type: &str) -> Self {
        if content_type.trim() == ANIMATION_FORMAT {
            Self::Video
        } else {
            Self::Image
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// A renderable media reference.
///
/// `url` is a `data:` URI (poster), a `file://` URL (downloaded video) or a
/// remote placeholder URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    /// Image or video.
    pub kind: MediaType,
    /// Where the media can be loaded from.
    pub url: String,
}

impl MediaRef {
    /// Creates a reference.
    pub fn new(kind: MediaType, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
        }
    }

    /// Returns true for inline `data:` URIs.
    pub fn is_inline(&self) -> bool {
        self.url.starts_with("data:")
    }

    /// Decodes the payload of an inline `data:…;base64,` URI.
    pub fn inline_bytes(&self) -> Option<Vec<u8>> {
        use base64::Engine;
        let (_, b64) = self.url.strip_prefix("data:")?.split_once(";base64,")?;
        base64::engine::general_purpose::STANDARD.decode(b64).ok()
    }
}

/// Supported poster formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format.
    WebP,
}

impl ImageFormat {
    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Maps a MIME type reported by the API; unknown types are treated as PNG.
    pub fn from_mime_type(mime: &str) -> Self {
        match mime {
            "image/jpeg" | "image/jpg" => Self::Jpeg,
            "image/webp" => Self::WebP,
            _ => Self::Png,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }
        None
    }
}

/// Metadata about one generation call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationMetadata {
    /// Model used for generation.
    pub model: Option<String>,
    /// Wall-clock generation time in milliseconds.
    pub duration_ms: Option<u64>,
}

/// A generated poster.
#[derive(Debug, Clone)]
#[must_use = "generated image should be rendered or saved"]
pub struct GeneratedImage {
    /// Raw image bytes.
    pub data: Vec<u8>,
    /// Image format.
    pub format: ImageFormat,
    /// Generation metadata.
    pub metadata: GenerationMetadata,
}

impl GeneratedImage {
    /// Encodes the image data as base64.
    pub fn to_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// Returns the image as a data URL.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.format.mime_type(), self.to_base64())
    }
}

/// A request to generate a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoGenerationRequest {
    /// The text prompt describing the desired video.
    pub prompt: String,
    /// Aspect ratio (e.g., "9:16").
    pub aspect_ratio: Option<String>,
    /// Resolution (e.g., "720p").
    pub resolution: Option<String>,
    /// Number of videos to generate.
    pub number_of_videos: Option<u32>,
}

impl VideoGenerationRequest {
    /// Creates a new request with the given prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            aspect_ratio: None,
            resolution: None,
            number_of_videos: None,
        }
    }

    /// One 720p vertical video, sized for a social feed.
    pub fn social_vertical(prompt: impl Into<String>) -> Self {
        Self::new(prompt)
            .with_number_of_videos(1)
            .with_resolution("720p")
            .with_aspect_ratio("9:16")
    }

    /// Sets the aspect ratio.
    pub fn with_aspect_ratio(mut self, ratio: impl Into<String>) -> Self {
        self.aspect_ratio = Some(ratio.into());
        self
    }

    /// Sets the resolution.
    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = Some(resolution.into());
        self
    }

    /// Sets how many videos to generate.
    pub fn with_number_of_videos(mut self, count: u32) -> Self {
        self.number_of_videos = Some(count);
        self
    }
}

/// A generated video.
#[derive(Debug, Clone)]
pub struct GeneratedVideo {
    /// Raw video bytes.
    pub data: Vec<u8>,
    /// MIME type (e.g., "video/mp4").
    pub mime_type: String,
    /// Generation metadata.
    pub metadata: GenerationMetadata,
}

impl GeneratedVideo {
    /// Returns the size of the video data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Writes the video to `path`.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        if self.data.is_empty() {
            return Err(StoryError::VideoGeneration("downloaded video is empty".into()));
        }
        tokio::fs::write(path, &self.data).await?;
        Ok(())
    }
}
