//! Error types for studio operations.
//!
//! Editing operations never fail: unknown IDs and invalid structural edits are
//! no-ops. Errors only arise at the edges, when decoding payloads or loading
//! a layer document.

use thiserror::Error;

/// Result type for studio operations.
pub type StudioResult<T> = Result<T, StudioError>;

/// Errors that can occur outside the editing model.
#[derive(Debug, Error)]
pub enum StudioError {
    /// A layer document violates a structural invariant.
    #[error("Invalid layer document: {0}")]
    InvalidDocument(String),

    /// An image payload could not be decoded.
    #[error("Invalid image payload: {0}")]
    InvalidPayload(String),

    /// Document serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
