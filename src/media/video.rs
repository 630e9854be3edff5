//! Veo (Google) video generation provider.
//!
//! Generation is a long-running operation: submit, poll until `done`, then
//! download the produced file. Polling is bounded by both a poll count and an
//! overall timeout.

use crate::config::{DEFAULT_API_BASE_URL, DEFAULT_VIDEO_MODEL};
use crate::credentials::{CredentialProvider, EnvCredentials, SharedCredentials};
use crate::error::{Result, StoryError};
use crate::media::types::{GeneratedVideo, GenerationMetadata, VideoGenerationRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Trait for video generators.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Generates a video and returns its bytes.
    async fn generate(&self, request: &VideoGenerationRequest) -> Result<GeneratedVideo>;
}

/// Limits applied while waiting for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay before each status check.
    pub interval: Duration,
    /// Overall wait budget.
    pub timeout: Duration,
    /// Maximum number of status checks.
    pub max_polls: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(600),
            max_polls: 120,
        }
    }
}

/// Waits for `initial` to finish by re-fetching it with `check`.
///
/// Sleeps `interval` before every check. Returns the first operation reporting
/// `done`, or [`StoryError::Timeout`] once the timeout or the poll budget is
/// exhausted.
pub(crate) async fn poll_until_done<F, Fut>(
    initial: VeoOperation,
    policy: PollPolicy,
    mut check: F,
) -> Result<VeoOperation>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<VeoOperation>>,
{
    let start = Instant::now();
    let wait = async {
        let mut operation = initial;
        let mut polls = 0u32;
        while !operation.is_done() {
            if polls >= policy.max_polls {
                return Err(StoryError::Timeout(start.elapsed()));
            }
            tokio::time::sleep(policy.interval).await;
            operation = check().await?;
            polls += 1;
            tracing::debug!(
                operation = %operation.name,
                polls,
                elapsed_secs = start.elapsed().as_secs(),
                "polling Veo video generation"
            );
        }
        Ok(operation)
    };

    tokio::time::timeout(policy.timeout, wait)
        .await
        .map_err(|_| StoryError::Timeout(policy.timeout))?
}

/// Builder for [`VeoProvider`].
#[derive(Clone)]
pub struct VeoProviderBuilder {
    credentials: Arc<dyn CredentialProvider>,
    model: String,
    base_url: String,
    policy: PollPolicy,
}

impl Default for VeoProviderBuilder {
    fn default() -> Self {
        Self {
            credentials: Arc::new(EnvCredentials),
            model: DEFAULT_VIDEO_MODEL.to_string(),
            base_url: DEFAULT_API_BASE_URL.to_string(),
            policy: PollPolicy::default(),
        }
    }
}

impl VeoProviderBuilder {
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

    /// Sets the Veo model.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the API root.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the polling interval for async generation.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.policy.interval = interval;
        self
    }

    /// Sets the maximum time to wait for generation.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.policy.timeout = timeout;
        self
    }

    /// Sets the maximum number of status checks.
    pub fn max_polls(mut self, max_polls: u32) -> Self {
        self.policy.max_polls = max_polls;
        self
    }

    /// Builds the provider.
    pub fn build(self) -> VeoProvider {
        VeoProvider {
            client: reqwest::Client::new(),
            credentials: self.credentials,
            model: self.model,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            policy: self.policy,
        }
    }
}

/// Veo video generation provider (Gemini Developer API).
pub struct VeoProvider {
    client: reqwest::Client,
    credentials: Arc<dyn CredentialProvider>,
    model: String,
    base_url: String,
    policy: PollPolicy,
}

impl std::fmt::Debug for VeoProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VeoProvider")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl VeoProvider {
    /// Creates a new [`VeoProviderBuilder`].
    pub fn builder() -> VeoProviderBuilder {
        VeoProviderBuilder::new()
    }

    /// Returns the polling limits in use.
    pub fn poll_policy(&self) -> PollPolicy {
        self.policy
    }

    async fn submit(&self, request: &VideoGenerationRequest, api_key: &str) -> Result<VeoOperation> {
        let url = format!("{}/models/{}:predictLongRunning", self.base_url, self.model);
        let body = VeoRequest::from_request(request);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, &headers));
        }

        Ok(response.json().await?)
    }

    async fn fetch_operation(&self, operation_name: &str, api_key: &str) -> Result<VeoOperation> {
        let url = format!("{}/{}", self.base_url, operation_name);

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, &headers));
        }

        Ok(response.json().await?)
    }

    async fn download(&self, url: &str, api_key: &str) -> Result<Vec<u8>> {
        if url.starts_with("gs://") {
            return Err(StoryError::VideoGeneration(format!(
                "Veo returned a Cloud Storage URI ({url}) which cannot be downloaded directly"
            )));
        }

        // The file endpoint expects the key as a query parameter
        let url = if url.contains('?') {
            format!("{url}&key={api_key}")
        } else {
            format!("{url}?key={api_key}")
        };

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", api_key)
            .send()
            .await
            .map_err(|e| StoryError::Network(e.without_url()))?;

        if !response.status().is_success() {
            return Err(StoryError::Api {
                status: response.status().as_u16(),
                message: "Failed to download video".into(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StoryError::Network(e.without_url()))?;
        Ok(bytes.to_vec())
    }

    async fn generate_impl(&self, request: &VideoGenerationRequest) -> Result<GeneratedVideo> {
        let start = Instant::now();
        let api_key = self.credentials.require_api_key()?;

        let submitted = self.submit(request, &api_key).await?;
        let operation_name = submitted.name.clone();
        tracing::debug!(operation = %operation_name, "submitted video generation request");

        let finished = poll_until_done(submitted, self.policy, || {
            self.fetch_operation(&operation_name, &api_key)
        })
        .await?;

        let video_url = finished.into_video_uri()?;
        tracing::debug!("video generation complete, downloading");
        let data = self.download(&video_url, &api_key).await?;

        Ok(GeneratedVideo {
            data,
            mime_type: "video/mp4".to_string(),
            metadata: GenerationMetadata {
                model: Some(self.model.clone()),
                duration_ms: Some(start.elapsed().as_millis() as u64),
            },
        })
    }
}

#[async_trait]
impl VideoProvider for VeoProvider {
    async fn generate(&self, request: &VideoGenerationRequest) -> Result<GeneratedVideo> {
        self.generate_impl(request).await
    }
}

fn parse_error(status: u16, text: &str, headers: &reqwest::header::HeaderMap) -> StoryError {
    if status == 404 {
        return StoryError::InvalidRequest(
            "Veo API not available. Veo requires a paid-tier API key with billing enabled."
                .to_string(),
        );
    }
    StoryError::from_response(status, text, headers)
}

// Request types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoRequest {
    instances: Vec<VeoInstance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<VeoParameters>,
}

#[derive(Debug, Serialize)]
struct VeoInstance {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VeoParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    number_of_videos: Option<u32>,
}

impl VeoRequest {
    fn from_request(req: &VideoGenerationRequest) -> Self {
        let has_params = req.aspect_ratio.is_some()
            || req.resolution.is_some()
            || req.number_of_videos.is_some();

        Self {
            instances: vec![VeoInstance {
                prompt: req.prompt.clone(),
            }],
            parameters: has_params.then(|| VeoParameters {
                aspect_ratio: req.aspect_ratio.clone(),
                resolution: req.resolution.clone(),
                number_of_videos: req.number_of_videos,
            }),
        }
    }
}

// Response types

/// A long-running Veo operation as returned by submit and status calls.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct VeoOperation {
    pub(crate) name: String,
    #[serde(default)]
    done: Option<bool>,
    #[serde(default)]
    response: Option<VeoVideoResponse>,
    #[serde(default)]
    error: Option<VeoError>,
}

impl VeoOperation {
    fn is_done(&self) -> bool {
        self.done.unwrap_or(false)
    }

    /// Download URI of the first generated sample.
    fn into_video_uri(self) -> Result<String> {
        if let Some(err) = self.error {
            return Err(StoryError::VideoGeneration(
                err.message.unwrap_or_else(|| "Unknown error".into()),
            ));
        }

        let gen_resp = self.response.and_then(|r| r.generate_video_response);
        if let Some(gen_resp) = gen_resp {
            let samples = gen_resp.generated_samples.unwrap_or_default();
            if gen_resp.rai_media_filtered_count.unwrap_or(0) > 0 && samples.is_empty() {
                let reason = gen_resp
                    .rai_media_filtered_reasons
                    .and_then(|r| r.into_iter().next())
                    .unwrap_or_else(|| "Video was filtered by Veo safety filters".into());
                return Err(StoryError::ContentBlocked(reason));
            }
            if let Some(uri) = samples.into_iter().find_map(|s| s.video.and_then(|v| v.uri)) {
                return Ok(uri);
            }
        }

        Err(StoryError::VideoGeneration(
            "Video generation failed or no URI returned.".into(),
        ))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VeoVideoResponse {
    #[serde(default)]
    generate_video_response: Option<VeoGenerateVideoResponse>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VeoGenerateVideoResponse {
    #[serde(default)]
    generated_samples: Option<Vec<VeoGeneratedSample>>,
    #[serde(default)]
    rai_media_filtered_count: Option<u32>,
    #[serde(default)]
    rai_media_filtered_reasons: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
struct VeoGeneratedSample {
    #[serde(default)]
    video: Option<VeoVideo>,
}

#[derive(Debug, Clone, Deserialize)]
struct VeoVideo {
    #[serde(default)]
    uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct VeoError {
    #[serde(default)]
    message: Option<String>,
}
