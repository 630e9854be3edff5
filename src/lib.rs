#![warn(missing_docs)]
//! Storyteller - Busan history storytelling planner.
//!
//! Turns a place in Busan, an emotion and a content format into a
//! search-grounded content plan, then renders it as a poster image (Gemini)
//! or, for the animation format, a short vertical video (Veo).
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use storyteller::{EnvCredentials, Settings, StoryRequest, Storyteller};
//!
//! #[tokio::main]
//! async fn main() -> storyteller::Result<()> {
//!     let settings = Settings::load(None)?;
//!     let app = Storyteller::from_settings(&settings, Arc::new(EnvCredentials));
//!     let session = app
//!         .submit(StoryRequest::new("40계단", "그리움", "단편 영화"))
//!         .await?;
//!     println!("{}", storyteller::render::render_session(&session));
//!     Ok(())
//! }
//! ```
//!
//! # Pieces
//!
//! - [`plan`]: prompt, Gemini call with Google Search grounding, reply parsing
//! - [`media`]: poster images with placeholder fallback, Veo videos with
//!   bounded polling
//! - [`session`]: the input → planning → result/error wizard state
//! - [`Storyteller`]: runs the wizard against a shared session
//! - [`render`]: plain-text screens

mod error;
mod gemini;

pub mod app;
pub mod config;
pub mod credentials;
pub mod media;
pub mod plan;
pub mod render;
pub mod session;

pub use app::{Storyteller, GENERIC_ERROR_MESSAGE};
pub use config::Settings;
pub use credentials::{CredentialProvider, EnvCredentials, KeySelector, SharedCredentials};
pub use error::{parse_retry_after, sanitize_error_message, Result, StoryError};
pub use media::{
    GeminiImageProvider, ImageProvider, MediaGenerator, MediaRef, MediaService, MediaType,
    VeoProvider, VideoGenerationRequest, VideoProvider,
};
pub use plan::{
    ContentPlan, GeminiPlanner, GroundingUrl, PlanGenerator, StoryRequest, CONTENT_FORMATS,
};
pub use session::{Session, Step};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::app::Storyteller;
    pub use crate::credentials::{CredentialProvider, KeySelector};
    pub use crate::error::{Result, StoryError};
    pub use crate::media::{ImageProvider, MediaGenerator, MediaType, VideoProvider};
    pub use crate::plan::{ContentPlan, PlanGenerator, StoryRequest};
    pub use crate::session::{Session, Step};
}
