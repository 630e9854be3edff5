//! Runtime settings: defaults, an optional TOML file, then environment overrides.

use crate::error::{Result, StoryError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Gemini Developer API root.
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Text model used for planning (supports Google Search grounding).
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
/// Image model used for posters.
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
/// Video model used for the animation format.
pub const DEFAULT_VIDEO_MODEL: &str = "veo-3.1-fast-generate-preview";
/// Shown when poster generation fails.
pub const DEFAULT_PLACEHOLDER_IMAGE_URL: &str = "https://picsum.photos/800/800?blur=2";

const ENV_CONFIG_PATH: &str = "STORYTELLER_CONFIG";
const ENV_API_BASE_URL: &str = "STORYTELLER_API_BASE_URL";
const ENV_TEXT_MODEL: &str = "STORYTELLER_TEXT_MODEL";
const ENV_IMAGE_MODEL: &str = "STORYTELLER_IMAGE_MODEL";
const ENV_VIDEO_MODEL: &str = "STORYTELLER_VIDEO_MODEL";
const ENV_POLL_INTERVAL: &str = "STORYTELLER_POLL_INTERVAL_SECS";
const ENV_VIDEO_TIMEOUT: &str = "STORYTELLER_VIDEO_TIMEOUT_SECS";
const ENV_MAX_POLLS: &str = "STORYTELLER_MAX_POLLS";
const ENV_MEDIA_DIR: &str = "STORYTELLER_MEDIA_DIR";
const ENV_PLACEHOLDER_URL: &str = "STORYTELLER_PLACEHOLDER_IMAGE_URL";

/// Resolved settings for the services and the CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// API root, without a trailing slash.
    pub api_base_url: String,
    /// Planning model.
    pub text_model: String,
    /// Poster model.
    pub image_model: String,
    /// Video model.
    pub video_model: String,
    /// Delay between video operation status checks.
    pub poll_interval: Duration,
    /// Upper bound on the whole video wait.
    pub video_timeout: Duration,
    /// Upper bound on the number of status checks.
    pub max_polls: u32,
    /// Where downloaded videos are written.
    pub media_dir: PathBuf,
    /// Poster fallback.
    pub placeholder_image_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            video_model: DEFAULT_VIDEO_MODEL.to_string(),
            poll_interval: Duration::from_secs(5),
            video_timeout: Duration::from_secs(600),
            max_polls: 120,
            media_dir: std::env::temp_dir().join("storyteller"),
            placeholder_image_url: DEFAULT_PLACEHOLDER_IMAGE_URL.to_string(),
        }
    }
}

impl Settings {
    /// Loads defaults, then `path` (or `STORYTELLER_CONFIG`) if it exists,
    /// then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = Self::default();

        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(ENV_CONFIG_PATH).map(PathBuf::from))
            .filter(|p| !p.as_os_str().is_empty());

        if let Some(path) = path {
            if path.is_file() {
                settings.apply_partial(read_partial(&path)?);
                tracing::debug!(path = %path.display(), "loaded settings file");
            } else {
                tracing::warn!(path = %path.display(), "settings file not found, using defaults");
            }
        }

        settings.apply_env(|name| std::env::var(name).ok())?;
        Ok(settings)
    }

    /// Parses settings from TOML text on top of the defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let partial: PartialSettings = toml::from_str(text)
            .map_err(|e| StoryError::InvalidRequest(format!("invalid settings file: {e}")))?;
        let mut settings = Self::default();
        settings.apply_partial(partial);
        Ok(settings)
    }

    fn apply_partial(&mut self, partial: PartialSettings) {
        if let Some(url) = partial.api_base_url {
            self.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = partial.text_model {
            self.text_model = model;
        }
        if let Some(model) = partial.image_model {
            self.image_model = model;
        }
        if let Some(model) = partial.video_model {
            self.video_model = model;
        }
        if let Some(secs) = partial.poll_interval_secs {
            self.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = partial.video_timeout_secs {
            self.video_timeout = Duration::from_secs(secs);
        }
        if let Some(max) = partial.max_polls {
            self.max_polls = max;
        }
        if let Some(dir) = partial.media_dir {
            self.media_dir = dir;
        }
        if let Some(url) = partial.placeholder_image_url {
            self.placeholder_image_url = url;
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_API_BASE_URL) {
            self.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = get(ENV_TEXT_MODEL) {
            self.text_model = model;
        }
        if let Some(model) = get(ENV_IMAGE_MODEL) {
            self.image_model = model;
        }
        if let Some(model) = get(ENV_VIDEO_MODEL) {
            self.video_model = model;
        }
        if let Some(value) = get(ENV_POLL_INTERVAL) {
            self.poll_interval = Duration::from_secs(parse_number(ENV_POLL_INTERVAL, &value)?);
        }
        if let Some(value) = get(ENV_VIDEO_TIMEOUT) {
            self.video_timeout = Duration::from_secs(parse_number(ENV_VIDEO_TIMEOUT, &value)?);
        }
        if let Some(value) = get(ENV_MAX_POLLS) {
            self.max_polls = parse_number(ENV_MAX_POLLS, &value)?;
        }
        if let Some(dir) = get(ENV_MEDIA_DIR) {
            self.media_dir = PathBuf::from(dir);
        }
        if let Some(url) = get(ENV_PLACEHOLDER_URL) {
            self.placeholder_image_url = url;
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| StoryError::InvalidRequest(format!("{name} must be a non-negative integer")))
}

fn read_partial(path: &Path) -> Result<PartialSettings> {
    let contents = std::fs::read_to_string(path)?;
    toml::from_str(&contents).map_err(|e| {
        StoryError::InvalidRequest(format!("failed to parse {}: {e}", path.display()))
    })
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct PartialSettings {
    api_base_url: Option<String>,
    text_model: Option<String>,
    image_model: Option<String>,
    video_model: Option<String>,
    poll_interval_secs: Option<u64>,
    video_timeout_secs: Option<u64>,
    max_polls: Option<u32>,
    media_dir: Option<PathBuf>,
    placeholder_image_url: Option<String>,
}
