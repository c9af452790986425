//! Service configuration.

use std::time::Duration;

use crate::error::{ServiceError, ServiceResult};

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "GEMINI_API_KEY";
/// Environment variable overriding the base URL.
pub const ENV_BASE_URL: &str = "STUDIO_GENAI_BASE_URL";
/// Environment variable overriding the model name.
pub const ENV_MODEL: &str = "STUDIO_GENAI_MODEL";

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// Default image model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";
/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
/// Reference images larger than this on either side are downscaled before upload.
pub const DEFAULT_MAX_REFERENCE_SIDE: u32 = 1536;

/// Connection settings for [`crate::GeminiImageService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// API key sent as `x-goog-api-key`.
    pub api_key: String,
    /// API host, e.g. `https://generativelanguage.googleapis.com`.
    pub base_url: String,
    /// Model name used in the request path.
    pub model: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Longest side allowed for uploaded reference images.
    pub max_reference_side: u32,
}

impl ServiceConfig {
    /// Configuration with default host, model and timeout.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_reference_side: DEFAULT_MAX_REFERENCE_SIDE,
        }
    }

    /// Read the configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::MissingApiKey`] if `GEMINI_API_KEY` is unset or empty.
    pub fn from_env() -> ServiceResult<Self> {
        let api_key = std::env::var(ENV_API_KEY)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ServiceError::MissingApiKey)?;
        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var(ENV_BASE_URL) {
            config.base_url = base_url;
        }
        if let Ok(model) = std::env::var(ENV_MODEL) {
            config.model = model;
        }
        Ok(config)
    }

    /// Set the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
