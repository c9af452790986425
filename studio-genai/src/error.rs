//! Service error types.

use studio_renderer::RenderError;
use thiserror::Error;

/// Result type for service calls.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors that can occur when talking to the generation service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The configured base URL is invalid.
    #[error("invalid service URL: {0}")]
    InvalidUrl(String),
    /// No API key was configured.
    #[error("no API key configured (set GEMINI_API_KEY)")]
    MissingApiKey,
    /// Generation was requested without reference images.
    #[error("at least one reference image is required")]
    NoReferenceImages,
    /// HTTP layer failed (connection, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// JSON parsing failed.
    #[error("failed to parse service payload: {0}")]
    Json(#[from] serde_json::Error),
    /// The service answered with an error status.
    #[error("service error {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from the error body, or the status text.
        message: String,
    },
    /// The response contained no image part.
    #[error("no image produced")]
    NoImage,
    /// The returned image data could not be decoded.
    #[error("invalid image data: {0}")]
    InvalidImage(String),
    /// Image normalisation failed.
    #[error(transparent)]
    Render(#[from] RenderError),
}
