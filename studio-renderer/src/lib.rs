//! # Layer Studio Renderer
//!
//! Flattens a layer document into a single image and normalises image
//! payloads moving between the editor and the generation service.
//!
//! ## Export Pipeline
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌──────────────┐
//! │  LayerStore  │──▶│ SVG compose │──▶│ resvg raster │──▶ PNG / JPEG
//! │ (visible,    │   │ (rotation,  │   │ (tiny-skia   │
//! │  back→front) │   │  text fill) │   │  pixmap)     │
//! └──────────────┘   └─────────────┘   └──────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod export;
pub mod image;

pub use self::image::{
    decode_payload, downscale_payload, encode_png, load_image_from_bytes, normalize_to_png,
    payload_from_bytes, resize_to_fit, DecodedImage, ImageFormat,
};
pub use error::{RenderError, RenderResult};
pub use export::{ExportConfig, ExportFormat, SceneExporter};

/// Renderer crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
