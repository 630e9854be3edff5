//! Poster and video generation behind one seam.

use crate::config::{Settings, DEFAULT_PLACEHOLDER_IMAGE_URL};
use crate::credentials::CredentialProvider;
use crate::error::Result;
use crate::media::image::{GeminiImageProvider, ImageProvider};
use crate::media::types::{MediaRef, MediaType, VideoGenerationRequest};
use crate::media::video::{VeoProvider, VideoProvider};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// What the orchestrator needs from the media layer.
#[async_trait]
pub trait MediaGenerator: Send + Sync {
    /// Returns a poster URL. Never fails; falls back to a placeholder.
    async fn generate_image(&self, prompt: &str) -> String;

    /// Generates a video and returns a URL to the stored file.
    async fn generate_video(&self, prompt: &str) -> Result<String>;

    /// Releases local storage held by media that is no longer shown.
    async fn discard(&self, _media: &MediaRef) {}
}

/// Default [`MediaGenerator`] built on an image and a video provider.
#[derive(Clone)]
pub struct MediaService {
    image: Arc<dyn ImageProvider>,
    video: Arc<dyn VideoProvider>,
    placeholder_url: String,
    media_dir: PathBuf,
    counter: Arc<AtomicU64>,
}

impl std::fmt::Debug for MediaService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaService")
            .field("placeholder_url", &self.placeholder_url)
            .field("media_dir", &self.media_dir)
            .finish_non_exhaustive()
    }
}

impl MediaService {
    /// Creates a service writing videos to the system temp directory.
    pub fn new(image: Arc<dyn ImageProvider>, video: Arc<dyn VideoProvider>) -> Self {
        Self {
            image,
            video,
            placeholder_url: DEFAULT_PLACEHOLDER_IMAGE_URL.to_string(),
            media_dir: std::env::temp_dir().join("storyteller"),
            counter: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Wires Gemini and Veo providers from settings.
    pub fn from_settings(settings: &Settings, credentials: Arc<dyn CredentialProvider>) -> Self {
        let image = GeminiImageProvider::builder()
            .credentials(credentials.clone())
            .model(&settings.image_model)
            .base_url(&settings.api_base_url)
            .build();
        let video = VeoProvider::builder()
            .credentials(credentials)
            .model(&settings.video_model)
            .base_url(&settings.api_base_url)
            .poll_interval(settings.poll_interval)
            .timeout(settings.video_timeout)
            .max_polls(settings.max_polls)
            .build();

        Self::new(Arc::new(image), Arc::new(video))
            .with_placeholder_url(&settings.placeholder_image_url)
            .with_media_dir(&settings.media_dir)
    }

    /// Sets the poster used when image generation fails.
    pub fn with_placeholder_url(mut self, url: impl Into<String>) -> Self {
        self.placeholder_url = url.into();
        self
    }

    /// Sets where downloaded videos are written.
    pub fn with_media_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.media_dir = dir.into();
        self
    }

    /// Returns the placeholder poster URL.
    pub fn placeholder_url(&self) -> &str {
        &self.placeholder_url
    }

    fn next_video_path(&self) -> PathBuf {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        self.media_dir.join(format!("story-{millis}-{seq}.mp4"))
    }
}

#[async_trait]
impl MediaGenerator for MediaService {
    async fn generate_image(&self, prompt: &str) -> String {
        match self.image.generate(prompt).await {
            Ok(image) => image.to_data_url(),
            Err(e) => {
                tracing::warn!("image generation failed, using placeholder: {e}");
                self.placeholder_url.clone()
            }
        }
    }

    async fn generate_video(&self, prompt: &str) -> Result<String> {
        let video = self
            .video
            .generate(&VideoGenerationRequest::social_vertical(prompt))
            .await?;

        tokio::fs::create_dir_all(&self.media_dir).await?;
        let path = self.next_video_path();
        video.save(&path).await?;
        tracing::debug!(path = %path.display(), bytes = video.size(), "stored generated video");

        Ok(file_url(&path))
    }

    async fn discard(&self, media: &MediaRef) {
        if media.kind != MediaType::Video {
            return;
        }
        let Some(local) = media.url.strip_prefix("file://") else {
            return;
        };
        let path = Path::new(local);
        let dir = std::path::absolute(&self.media_dir).unwrap_or_else(|_| self.media_dir.clone());
        if !path.starts_with(&dir) {
            return;
        }
        match tokio::fs::remove_file(path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "removed stored video"),
            Err(e) => tracing::warn!(path = %path.display(), "failed to remove stored video: {e}"),
        }
    }
}

/// `file://` URL for a local path, made absolute first.
pub fn file_url(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", absolute.display())
}
