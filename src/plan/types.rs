//! Core types for content planning.

use crate::error::{Result, StoryError};
use crate::media::MediaType;
use serde::{Deserialize, Serialize};

/// The content format rendered as a Veo video instead of a poster.
pub const ANIMATION_FORMAT: &str = "애니메이션";

/// Content formats offered by the input form, in display order.
pub const CONTENT_FORMATS: &[&str] = &[
    "단편 영화",
    "웹툰(애니메 그림체)",
    "전시회",
    ANIMATION_FORMAT,
    "오디오 드라마",
];

/// A web source the model cited while researching the place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingUrl {
    /// Page title.
    pub title: String,
    /// Page URI.
    pub uri: String,
}

/// The structured plan produced for one request.
///
/// Every text field is always populated; missing model output is replaced
/// with a fixed default when the plan is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPlan {
    /// Place the user asked about.
    pub place: String,
    /// Emotion keyword the user gave.
    pub emotion: String,
    /// Historical facts about the place.
    pub history_facts: String,
    /// Story synopsis linking history and emotion.
    pub synopsis: String,
    /// Content format of the plan.
    pub content_type: String,
    /// Core message and emotional effect.
    pub key_message: String,
    /// Intended audience.
    pub target_audience: String,
    /// English prompt for the poster image or video.
    pub visual_prompt: String,
    /// Promotional social-media caption.
    pub social_caption: String,
    /// Citations returned with the search-grounded reply.
    #[serde(default)]
    pub grounding_urls: Vec<GroundingUrl>,
}

/// What the user submitted on the input form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryRequest {
    /// Place in Busan.
    pub place: String,
    /// Emotion keyword.
    pub emotion: String,
    /// Selected content format.
    pub content_type: String,
}

impl StoryRequest {
    /// Creates a request; see [`StoryRequest::validate`].
    pub fn new(
        place: impl Into<String>,
        emotion: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            place: place.into(),
            emotion: emotion.into(),
            content_type: content_type.into(),
        }
    }

    /// Rejects requests with a blank field.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("place", &self.place),
            ("emotion", &self.emotion),
            ("content type", &self.content_type),
        ] {
            if value.trim().is_empty() {
                return Err(StoryError::InvalidRequest(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }

    /// Media produced for this request's content format.
    pub fn media_type(&self) -> MediaType {
        MediaType::for_content_type(&self.content_type)
    }
}
