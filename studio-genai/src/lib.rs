//! # Layer Studio GenAI
//!
//! The generative-image collaborator of the editor: an [`ImageService`]
//! trait, an HTTP implementation for Gemini-style `generateContent`
//! endpoints, and async drivers that run the editor's request protocol.
//!
//! ```text
//! Editor::begin_generation ──▶ ImageService::generate ──▶ Editor::finish_generation
//!        (busy = true)              (awaited)                (busy = false)
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod gemini;
pub mod service;

pub use config::ServiceConfig;
pub use error::{ServiceError, ServiceResult};
pub use gemini::GeminiImageService;
pub use service::{run_background_removal, run_generation, ImageService};
