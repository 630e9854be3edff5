//! Poster images and short videos for a content plan.

mod image;
mod service;
mod types;
mod video;

pub use image::{GeminiImageProvider, GeminiImageProviderBuilder, ImageProvider};
pub use service::{file_url, MediaGenerator, MediaService};
pub use types::{
    GeneratedImage, GeneratedVideo, GenerationMetadata, ImageFormat, MediaRef, MediaType,
    VideoGenerationRequest,
};
pub use video::{PollPolicy, VeoProvider, VeoProviderBuilder, VideoProvider};
