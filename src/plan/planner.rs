//! Search-grounded plan generation with Gemini.

use crate::config::{DEFAULT_API_BASE_URL, DEFAULT_TEXT_MODEL};
use crate::credentials::{CredentialProvider, EnvCredentials, SharedCredentials};
use crate::error::Result;
use crate::gemini::{GeminiClient, GenerateContentRequest, GenerateContentResponse};
use crate::plan::parse::{extract_json_object, normalize_plan};
use crate::plan::prompt::build_plan_prompt;
use crate::plan::types::{ContentPlan, GroundingUrl};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Trait for content plan generators.
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    /// Produces a complete plan, or [`crate::StoryError::Generation`] when the
    /// reply holds no parseable payload.
    async fn generate_plan(
        &self,
        place: &str,
        emotion: &str,
        content_type: &str,
    ) -> Result<ContentPlan>;
}

/// Builder for [`GeminiPlanner`].
#[derive(Clone)]
pub struct GeminiPlannerBuilder {
    credentials: Arc<dyn CredentialProvider>,
    model: String,
    base_url: String,
}

impl Default for GeminiPlannerBuilder {
    fn default() -> Self {
        Self {
            credentials: Arc::new(EnvCredentials),
            model: DEFAULT_TEXT_MODEL.to_string(),
            base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

impl GeminiPlannerBuilder {
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

    /// Sets the text model.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the API root.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Builds the planner.
    pub fn build(self) -> GeminiPlanner {
        GeminiPlanner {
            client: GeminiClient::new(self.base_url, self.credentials),
            model: self.model,
        }
    }
}

/// Plans content with a search-grounded Gemini text model.
#[derive(Debug, Clone)]
pub struct GeminiPlanner {
    client: GeminiClient,
    model: String,
}

impl GeminiPlanner {
    /// Creates a new [`GeminiPlannerBuilder`].
    pub fn builder() -> GeminiPlannerBuilder {
        GeminiPlannerBuilder::new()
    }

    /// Returns the text model in use.
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn generate_impl(
        &self,
        place: &str,
        emotion: &str,
        content_type: &str,
    ) -> Result<ContentPlan> {
        let start = Instant::now();
        let body =
            GenerateContentRequest::text(build_plan_prompt(place, emotion, content_type))
                .with_search_grounding();

        let response = self.client.generate_content(&self.model, &body).await?;
        let text = response.text();
        tracing::debug!(
            model = %self.model,
            reply_chars = text.chars().count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "plan reply received"
        );

        let payload = extract_json_object(&text)?;
        Ok(normalize_plan(
            place,
            emotion,
            content_type,
            &payload,
            grounding_urls(&response),
        ))
    }
}

#[async_trait]
impl PlanGenerator for GeminiPlanner {
    async fn generate_plan(
        &self,
        place: &str,
        emotion: &str,
        content_type: &str,
    ) -> Result<ContentPlan> {
        self.generate_impl(place, emotion, content_type)
            .await
            .inspect_err(|e| tracing::error!("error generating content plan: {e}"))
    }
}

/// Web citations with both a title and a URI, in reply order.
fn grounding_urls(response: &GenerateContentResponse) -> Vec<GroundingUrl> {
    response
        .grounding_chunks()
        .iter()
        .filter_map(|chunk| chunk.web.as_ref())
        .filter_map(|web| {
            let title = web.title.as_deref().filter(|t| !t.is_empty())?;
            let uri = web.uri.as_deref().filter(|u| !u.is_empty())?;
            Some(GroundingUrl {
                title: title.to_string(),
                uri: uri.to_string(),
            })
        })
        .collect()
}
