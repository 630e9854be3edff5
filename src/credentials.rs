//! API key resolution and the optional key-selection capability.
//!
//! Services never hold a key. They ask a [`CredentialProvider`] on every call,
//! so a key rotated between two runs takes effect on the next request.

use crate::error::{Result, StoryError};
use async_trait::async_trait;
use std::sync::{Arc, RwLock};

/// Environment variables consulted by [`EnvCredentials`], in order.
pub const API_KEY_ENV_VARS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY", "API_KEY"];

/// Supplies the current API key.
pub trait CredentialProvider: Send + Sync {
    /// Returns the key to use for the next request, if one is available.
    fn api_key(&self) -> Option<String>;

    /// Like [`CredentialProvider::api_key`], failing with [`StoryError::Auth`].
    fn require_api_key(&self) -> Result<String> {
        self.api_key().filter(|k| !k.trim().is_empty()).ok_or_else(|| {
            StoryError::Auth(format!(
                "no API key available (set one of {})",
                API_KEY_ENV_VARS.join(", ")
            ))
        })
    }
}

/// Reads the key from the process environment on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialProvider for EnvCredentials {
    fn api_key(&self) -> Option<String> {
        API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty())
    }
}

/// A key slot that can be filled or replaced at runtime.
///
/// Falls back to the environment until a key has been stored.
#[derive(Debug, Clone, Default)]
pub struct SharedCredentials {
    key: Arc<RwLock<Option<String>>>,
}

impl SharedCredentials {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a slot holding `key`.
    pub fn with_key(key: impl Into<String>) -> Self {
        let creds = Self::new();
        creds.set(key);
        creds
    }

    /// Stores a new key, replacing any previous one.
    pub fn set(&self, key: impl Into<String>) {
        if let Ok(mut guard) = self.key.write() {
            *guard = Some(key.into());
        }
    }

    /// Returns true if a key was stored explicitly.
    pub fn has_stored_key(&self) -> bool {
        self.key
            .read()
            .map(|guard| guard.as_deref().is_some_and(|k| !k.trim().is_empty()))
            .unwrap_or(false)
    }
}

impl CredentialProvider for SharedCredentials {
    fn api_key(&self) -> Option<String> {
        let stored = self.key.read().ok().and_then(|guard| guard.clone());
        stored
            .filter(|k| !k.trim().is_empty())
            .or_else(|| EnvCredentials.api_key())
    }
}

/// Host capability for choosing an API key interactively.
///
/// Consulted only before video generation.
#[async_trait]
pub trait KeySelector: Send + Sync {
    /// Returns true if a usable key has already been selected.
    async fn has_selected_key(&self) -> bool;

    /// Opens the key-selection flow. The outcome is checked afterwards with
    /// [`KeySelector::has_selected_key`].
    async fn open_select_key(&self) -> Result<()>;
}

impl<T: CredentialProvider + ?Sized> CredentialProvider for Arc<T> {
    fn api_key(&self) -> Option<String> {
        (**self).api_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Option<&'static str>);

    impl CredentialProvider for Fixed {
        fn api_key(&self) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    #[test]
    fn test_require_api_key_present() {
        assert_eq!(Fixed(Some("abc")).require_api_key().unwrap(), "abc");
    }

    #[test]
    fn test_require_api_key_missing_or_blank() {
        assert!(matches!(
            Fixed(None).require_api_key(),
            Err(StoryError::Auth(_))
        ));
        assert!(matches!(
            Fixed(Some("  ")).require_api_key(),
            Err(StoryError::Auth(_))
        ));
    }

    #[test]
    fn test_shared_credentials_rotation() {
        let creds = SharedCredentials::with_key("first");
        assert!(creds.has_stored_key());
        assert_eq!(creds.api_key().as_deref(), Some("first"));

        let clone = creds.clone();
        clone.set("second");
        assert_eq!(creds.api_key().as_deref(), Some("second"));
    }

    #[test]
    fn test_shared_credentials_empty_has_no_stored_key() {
        assert!(!SharedCredentials::new().has_stored_key());
    }

    #[test]
    fn test_arc_provider_delegates() {
        let creds: Arc<dyn CredentialProvider> = Arc::new(Fixed(Some("k")));
        assert_eq!(creds.api_key().as_deref(), Some("k"));
    }
}
