//! # Layer Studio Core
//!
//! Editing model for a layered image canvas: layers, groups, selection,
//! transforms and linear undo history. No I/O happens here; rendering and
//! the generative-image service live in sibling crates.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                   Editor                    │
//! ├─────────────────────────────────────────────┤
//! │  History<LayerStore>  │  Selection          │
//! │  - snapshots          │  - ordered ids      │
//! │  - undo / redo        │  - group expansion  │
//! ├─────────────────────────────────────────────┤
//! │  Hierarchy edits      │  Transform gestures │
//! │  - group / ungroup    │  - move / resize    │
//! │  - reorder, delete    │  - rotate           │
//! ├─────────────────────────────────────────────┤
//! │  Drawing │ Text edit │ Shortcuts │ Transcript│
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod drawing;
pub mod editor;
pub mod error;
pub mod event;
pub mod hierarchy;
pub mod history;
pub mod layer;
pub mod payload;
pub mod selection;
pub mod store;
pub mod transcript;
pub mod transform;

pub use drawing::{Drawing, Point, Stroke, StrokeStyle};
pub use editor::{
    BackgroundRemovalRequest, Editor, GeneratedImage, GenerationRequest, Viewport,
};
pub use error::{StudioError, StudioResult};
pub use event::{KeyModifiers, KeyPress, Shortcut};
pub use hierarchy::DropPosition;
pub use history::History;
pub use layer::{
    FontStyle, FontWeight, Geometry, GradientDirection, Layer, LayerId, LayerKind,
    TextDecoration, TextFill, TextOutline, TextShadow, TextStyle, TEXT_LINE_HEIGHT_RATIO,
};
pub use payload::ImagePayload;
pub use selection::{expand_to_elements, find_descendant_ids, Selection};
pub use store::{LayerStore, TreeRow};
pub use transcript::{Message, Role, Transcript};
pub use transform::{Gesture, GestureKind, GestureTarget, ResizeHandle};

/// Core crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
