//! Renderer error types.

use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur while decoding images or exporting a document.
#[derive(Debug, Error)]
pub enum RenderError {
    /// An image payload could not be decoded.
    #[error("Failed to load resource: {0}")]
    Resource(String),

    /// Composing, rasterizing or encoding the export failed.
    #[error("Export failed: {0}")]
    Export(String),
}
