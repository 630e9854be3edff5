//! Error types for plan and media generation.

use std::time::Duration;

/// Maximum length of an API error message kept in an error value.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Errors that can occur while planning content or generating media.
#[derive(Debug, thiserror::Error)]
pub enum StoryError {
    /// API key missing or invalid.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Server-provided delay, if any.
        retry_after: Option<Duration>,
    },

    /// Video operation polling exceeded its time or poll budget.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// I/O error (e.g., storing a video).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The API answered, but not in the shape we expected.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The model reply held no usable content plan.
    #[error("plan generation failed: {0}")]
    Generation(String),

    /// Video generation specific error.
    #[error("video generation failed: {0}")]
    VideoGeneration(String),
}

impl StoryError {
    /// Returns true if this error is likely transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Network(_)
        )
    }

    /// Returns the suggested retry delay, if available.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            Self::Timeout(_) => Some(Duration::from_secs(1)),
            Self::Network(_) => Some(Duration::from_secs(2)),
            _ => None,
        }
    }

    /// Maps a non-success HTTP response onto an error kind.
    pub(crate) fn from_response(
        status: u16,
        text: &str,
        headers: &reqwest::header::HeaderMap,
    ) -> Self {
        let text = sanitize_error_message(text);
        match status {
            401 | 403 => return Self::Auth(text),
            404 => {
                return Self::InvalidRequest(
                    "Model not found. Verify the model name and that the API key has access."
                        .into(),
                )
            }
            429 => {
                let retry_after = parse_retry_after(headers).map(Duration::from_secs);
                return Self::RateLimited { retry_after };
            }
            _ => {}
        }
        let lower = text.to_lowercase();
        if lower.contains("safety")
            || lower.contains("blocked")
            || lower.contains("content_policy")
            || lower.contains("prohibited")
        {
            return Self::ContentBlocked(text);
        }
        Self::Api {
            status,
            message: text,
        }
    }
}

/// Reads a `Retry-After` header given in whole seconds.
pub fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Redacts API keys carried as `key=` query values and caps the length.
pub fn sanitize_error_message(text: &str) -> String {
    let mut out = String::with_capacity(text.len().min(MAX_ERROR_MESSAGE_LEN));
    let mut rest = text;
    while let Some(pos) = rest.find("key=") {
        out.push_str(&rest[..pos + 4]);
        out.push_str("[REDACTED]");
        let tail = &rest[pos + 4..];
        let end = tail
            .find(|c: char| c == '&' || c == '"' || c.is_whitespace())
            .unwrap_or(tail.len());
        rest = &tail[end..];
    }
    out.push_str(rest);

    let trimmed = out.trim();
    if trimmed.chars().count() > MAX_ERROR_MESSAGE_LEN {
        let cut: String = trimmed.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
        format!("{cut}...")
    } else {
        trimmed.to_string()
    }
}

/// Result type alias for storyteller operations.
pub type Result<T> = std::result::Result<T, StoryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};

    #[test]
    fn test_is_retryable() {
        assert!(StoryError::RateLimited { retry_after: None }.is_retryable());
        assert!(StoryError::Timeout(Duration::from_secs(30)).is_retryable());

        assert!(!StoryError::Auth("bad key".into()).is_retryable());
        assert!(!StoryError::ContentBlocked("nsfw".into()).is_retryable());
        assert!(!StoryError::Generation("no json".into()).is_retryable());
        assert!(!StoryError::Decode("bad base64".into()).is_retryable());
    }

    #[test]
    fn test_retry_after() {
        let rate_limited = StoryError::RateLimited {
            retry_after: Some(Duration::from_secs(60)),
        };
        assert_eq!(rate_limited.retry_after(), Some(Duration::from_secs(60)));

        let timeout = StoryError::Timeout(Duration::from_secs(30));
        assert_eq!(timeout.retry_after(), Some(Duration::from_secs(1)));

        assert_eq!(StoryError::Auth("bad".into()).retry_after(), None);
    }

    #[test]
    fn test_error_display() {
        let err = StoryError::Api {
            status: 500,
            message: "Internal".into(),
        };
        assert_eq!(err.to_string(), "API error: 500 - Internal");

        let err = StoryError::Generation("no JSON object in reply".into());
        assert_eq!(
            err.to_string(),
            "plan generation failed: no JSON object in reply"
        );
    }

    #[test]
    fn test_from_response_classification() {
        let headers = HeaderMap::new();
        assert!(matches!(
            StoryError::from_response(401, "denied", &headers),
            StoryError::Auth(_)
        ));
        assert!(matches!(
            StoryError::from_response(400, "Request blocked by SAFETY", &headers),
            StoryError::ContentBlocked(_)
        ));
        assert!(matches!(
            StoryError::from_response(500, "boom", &headers),
            StoryError::Api { status: 500, .. }
        ));
    }

    #[test]
    fn test_rate_limit_reads_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        match StoryError::from_response(429, "slow down", &headers) {
            StoryError::RateLimited { retry_after } => {
                assert_eq!(retry_after, Some(Duration::from_secs(12)));
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn test_sanitize_redacts_key() {
        let msg = sanitize_error_message("GET https://x/files/abc?alt=media&key=SECRET123 failed");
        assert!(!msg.contains("SECRET123"));
        assert!(msg.contains("key=[REDACTED]"));
        assert!(msg.ends_with("failed"));
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = "x".repeat(2 * MAX_ERROR_MESSAGE_LEN);
        let msg = sanitize_error_message(&long);
        assert_eq!(msg.chars().count(), MAX_ERROR_MESSAGE_LEN + 3);
    }
}
