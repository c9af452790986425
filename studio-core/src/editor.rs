//! Editor state and the operations the UI drives it with.
//!
//! [`Editor`] owns the layer history, the selection and every transient
//! interaction (gesture, freehand drawing, text edit, pending service call).
//! All mutation is synchronous; committed changes go through one history
//! entry each and the selection is pruned afterwards.

use std::borrow::Cow;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::drawing::{Drawing, Point, StrokeStyle};
use crate::event::{KeyPress, Shortcut};
use crate::hierarchy::{self, DropPosition};
use crate::transform::{Gesture, GestureKind};
use crate::transcript::{Role, Transcript};
use crate::{
    Geometry, History, ImagePayload, Layer, LayerId, LayerKind, LayerStore, Selection, TextStyle,
};

/// Size of the visible canvas area in canvas units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1024.0,
            height: 768.0,
        }
    }
}

impl Viewport {
    /// Create a viewport.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Geometry of a `width` x `height` image scaled down to fit and centered.
    #[must_use]
    pub fn fit(&self, width: f32, height: f32) -> Geometry {
        let width = width.max(1.0);
        let height = height.max(1.0);
        let scale = (self.width / width).min(self.height / height).min(1.0);
        let w = (width * scale).max(1.0);
        let h = (height * scale).max(1.0);
        Geometry::new((self.width - w) / 2.0, (self.height - h) / 2.0, w, h)
    }
}

/// Input for an image generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// What to generate.
    pub prompt: String,
    /// Reference images taken from the selection, at least one.
    pub references: Vec<ImagePayload>,
}

/// Input for a background removal call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundRemovalRequest {
    /// Image layer whose source will be replaced.
    pub target: LayerId,
    /// Current image of that layer.
    pub image: ImagePayload,
}

/// An image returned by the generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// Encoded image.
    pub image: ImagePayload,
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
    /// Text the service returned alongside the image.
    pub commentary: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingRequest {
    Generation,
    BackgroundRemoval { target: LayerId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TextEdit {
    id: LayerId,
    buffer: String,
}

/// The application state of one canvas.
#[derive(Debug, Clone)]
pub struct Editor {
    history: History<LayerStore>,
    selection: Selection,
    gesture: Option<Gesture>,
    drawing: Drawing,
    text_edit: Option<TextEdit>,
    transcript: Transcript,
    pending: Option<PendingRequest>,
    viewport: Viewport,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}

impl Editor {
    /// Create an editor with an empty document.
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self::with_document(LayerStore::new(), viewport)
    }

    /// Create an editor over an existing document. History starts at it.
    #[must_use]
    pub fn with_document(store: LayerStore, viewport: Viewport) -> Self {
        Self {
            history: History::new(store),
            selection: Selection::new(),
            gesture: None,
            drawing: Drawing::new(),
            text_edit: None,
            transcript: Transcript::new(),
            pending: None,
            viewport,
        }
    }

    /// Bound the number of history snapshots kept.
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history = History::with_limit(self.history.current().clone(), limit);
        self
    }

    /// The committed document.
    #[must_use]
    pub fn document(&self) -> &LayerStore {
        self.history.current()
    }

    /// Replace the document and forget all history and transient state.
    pub fn load_document(&mut self, store: LayerStore) {
        tracing::info!("Loading document with {} layers", store.len());
        self.history.reset(store);
        self.selection.clear();
        self.gesture = None;
        self.drawing.clear();
        self.text_edit = None;
    }

    /// Viewport size.
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Resize the viewport.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Rolling message log.
    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Append a user message to the transcript.
    pub fn say(&mut self, text: impl Into<String>) {
        self.transcript.push(Role::User, text);
    }

    fn commit(&mut self, next: LayerStore) -> bool {
        let changed = self.history.commit(next);
        self.selection.prune(self.history.current());
        changed
    }

    fn commit_with<F>(&mut self, f: F) -> bool
    where
        F: FnOnce(&LayerStore) -> Option<LayerStore>,
    {
        match f(self.history.current()) {
            Some(next) => self.commit(next),
            None => false,
        }
    }

    fn edit_layer<F>(&mut self, id: LayerId, f: F) -> bool
    where
        F: FnOnce(&mut Layer) -> bool,
    {
        self.commit_with(|store| {
            let mut next = store.clone();
            let layer = next.get_mut(id)?;
            f(layer).then_some(next)
        })
    }

    fn insert(&mut self, layer: Layer) -> LayerId {
        let mut next = self.history.current().clone();
        let id = next.prepend(layer);
        self.commit(next);
        self.selection.select_only(id);
        id
    }

    // ---------------------------------------------------------------------
    // Layer creation
    // ---------------------------------------------------------------------

    /// Add an image layer on top and select it.
    pub fn add_image(&mut self, image: &ImagePayload, geometry: Geometry) -> LayerId {
        self.insert(Layer::image(image.to_data_uri(), image.mime_type.clone(), geometry))
    }

    /// Add a text layer on top and select it.
    pub fn add_text(&mut self, content: impl Into<String>, x: f32, y: f32, style: TextStyle) -> LayerId {
        self.insert(Layer::text(content, x, y, style))
    }

    /// Add a generated image fitted into the viewport and select it.
    pub fn add_generated_image(&mut self, generated: &GeneratedImage) -> LayerId {
        #[allow(clippy::cast_precision_loss)]
        let geometry = self
            .viewport
            .fit(generated.width as f32, generated.height as f32);
        let layer = Layer::image(
            generated.image.to_data_uri(),
            generated.image.mime_type.clone(),
            geometry,
        )
        .with_name("Generated image");
        self.insert(layer)
    }

    // ---------------------------------------------------------------------
    // Selection
    // ---------------------------------------------------------------------

    /// Click on a layer: replace the selection, or toggle it with shift.
    pub fn click(&mut self, id: LayerId, shift: bool) {
        if !self.document().contains(id) {
            return;
        }
        if shift {
            self.selection.toggle(id);
        } else {
            self.selection.select_only(id);
        }
    }

    /// Click on the canvas. Empty space clears the selection unless shift is held.
    pub fn click_at(&mut self, x: f32, y: f32, shift: bool) {
        match self.document().element_at(x, y) {
            Some(id) => self.click(id, shift),
            None if !shift => self.selection.clear(),
            None => {}
        }
    }

    /// Select exactly one layer.
    pub fn select_only(&mut self, id: LayerId) {
        if self.document().contains(id) {
            self.selection.select_only(id);
        }
    }

    /// Deselect everything.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Selected layer IDs in selection order.
    #[must_use]
    pub fn selected_ids(&self) -> &[LayerId] {
        self.selection.ids()
    }

    /// Elements the selection resolves to, with groups expanded.
    #[must_use]
    pub fn effective_elements(&self) -> Vec<LayerId> {
        self.selection.effective_elements(self.document())
    }

    // ---------------------------------------------------------------------
    // History
    // ---------------------------------------------------------------------

    /// Step back one commit.
    pub fn undo(&mut self) -> bool {
        self.cancel_gesture();
        let moved = self.history.undo();
        self.after_history_move();
        moved
    }

    /// Step forward one commit.
    pub fn redo(&mut self) -> bool {
        self.cancel_gesture();
        let moved = self.history.redo();
        self.after_history_move();
        moved
    }

    fn after_history_move(&mut self) {
        let store = self.history.current();
        self.selection.prune(store);
        if self.text_edit.as_ref().is_some_and(|edit| !store.contains(edit.id)) {
            self.text_edit = None;
        }
    }

    /// Whether undo would do anything.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether redo would do anything.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ---------------------------------------------------------------------
    // Structural edits
    // ---------------------------------------------------------------------

    /// Group the selected layers and select the new group.
    pub fn group_selection(&mut self) -> Option<LayerId> {
        let grouped = hierarchy::group(self.document(), self.selection.ids())?;
        self.commit(grouped.store);
        self.selection.select_only(grouped.group_id);
        Some(grouped.group_id)
    }

    /// Dissolve the selected groups and select what they released.
    pub fn ungroup_selection(&mut self) -> bool {
        let Some(ungrouped) = hierarchy::ungroup(self.document(), self.selection.ids()) else {
            return false;
        };
        self.commit(ungrouped.store);
        self.selection.set(ungrouped.released);
        true
    }

    /// Move a layer next to or into another one.
    pub fn reorder(&mut self, drag_id: LayerId, drop_id: LayerId, position: DropPosition) -> bool {
        self.commit_with(|store| hierarchy::reorder_and_reparent(store, drag_id, drop_id, position))
    }

    /// Flip one layer's visibility flag.
    pub fn toggle_visibility(&mut self, id: LayerId) -> bool {
        self.commit_with(|store| hierarchy::toggle_visibility(store, id))
    }

    /// Delete the selected layers and their descendants.
    pub fn delete_selection(&mut self) -> bool {
        let selected = self.selection.ids().to_vec();
        self.commit_with(|store| hierarchy::delete_selected(store, &selected))
    }

    /// Rename a layer.
    pub fn rename(&mut self, id: LayerId, name: &str) -> bool {
        self.commit_with(|store| hierarchy::rename(store, id, name))
    }

    /// Expand or collapse a group in the layer tree.
    pub fn set_expanded(&mut self, id: LayerId, expanded: bool) -> bool {
        self.commit_with(|store| hierarchy::set_expanded(store, id, expanded))
    }

    /// Edit a text layer's style. Non-text layers are ignored.
    pub fn update_text_style<F>(&mut self, id: LayerId, f: F) -> bool
    where
        F: FnOnce(&mut TextStyle),
    {
        self.edit_layer(id, |layer| match &mut layer.kind {
            LayerKind::Text { style, .. } => {
                f(style);
                true
            }
            _ => false,
        })
    }

    /// Replace a text layer's content.
    pub fn set_text_content(&mut self, id: LayerId, content: impl Into<String>) -> bool {
        let new_content = content.into();
        self.edit_layer(id, |layer| match &mut layer.kind {
            LayerKind::Text { content, .. } => {
                *content = new_content;
                true
            }
            _ => false,
        })
    }

    /// Point an image layer at a new source.
    pub fn replace_image_source(&mut self, id: LayerId, src: impl Into<String>, mime: impl Into<String>) -> bool {
        let (new_src, new_mime) = (src.into(), mime.into());
        self.edit_layer(id, |layer| match &mut layer.kind {
            LayerKind::Image { src, mime_type, .. } => {
                *src = new_src;
                *mime_type = new_mime;
                true
            }
            _ => false,
        })
    }

    // ---------------------------------------------------------------------
    // Gestures
    // ---------------------------------------------------------------------

    /// Start transforming the effective selection. Cancels any running gesture.
    pub fn begin_gesture(&mut self, kind: GestureKind) -> bool {
        self.cancel_gesture();
        let targets = self.effective_elements();
        self.gesture = Gesture::begin(kind, self.document(), &targets);
        if let Some(gesture) = &self.gesture {
            tracing::debug!("{kind:?} gesture started on {} elements", gesture.targets().len());
        }
        self.gesture.is_some()
    }

    /// Report a preview frame; see [`Gesture::update`].
    pub fn update_gesture<F>(&mut self, report: F)
    where
        F: FnMut(usize, &Geometry) -> Geometry,
    {
        if let Some(gesture) = &mut self.gesture {
            gesture.update(report);
        }
    }

    /// The running gesture, for the frame helpers.
    pub fn gesture_mut(&mut self) -> Option<&mut Gesture> {
        self.gesture.as_mut()
    }

    /// The running gesture.
    #[must_use]
    pub fn gesture(&self) -> Option<&Gesture> {
        self.gesture.as_ref()
    }

    /// Commit the latest frame as one history entry.
    pub fn end_gesture(&mut self) -> bool {
        let Some(gesture) = self.gesture.take() else {
            return false;
        };
        tracing::debug!(
            "{:?} gesture ended after {} frames",
            gesture.kind(),
            gesture.frame_count()
        );
        let next = gesture.apply(self.document());
        self.commit(next)
    }

    /// Drop the running gesture without touching the document.
    pub fn cancel_gesture(&mut self) -> bool {
        self.gesture.take().is_some()
    }

    /// The document as it should be drawn right now, including the gesture preview.
    #[must_use]
    pub fn preview_layers(&self) -> Cow<'_, LayerStore> {
        match &self.gesture {
            Some(gesture) => Cow::Owned(gesture.apply(self.document())),
            None => Cow::Borrowed(self.document()),
        }
    }

    // ---------------------------------------------------------------------
    // Freehand drawing
    // ---------------------------------------------------------------------

    /// Start a pen stroke.
    pub fn begin_stroke(&mut self, point: Point, style: StrokeStyle) {
        self.drawing.begin_stroke(point, style);
    }

    /// Extend the current pen stroke.
    pub fn extend_stroke(&mut self, point: Point) {
        self.drawing.extend_stroke(point);
    }

    /// Lift the pen.
    pub fn finish_stroke(&mut self) {
        self.drawing.finish_stroke();
    }

    /// Strokes not yet turned into a layer.
    #[must_use]
    pub fn drawing(&self) -> &Drawing {
        &self.drawing
    }

    /// Turn all strokes into one image layer.
    pub fn finalize_drawing(&mut self) -> Option<LayerId> {
        let (geometry, image) = self.drawing.to_svg_image()?;
        self.drawing.clear();
        let layer = Layer::image(image.to_data_uri(), image.mime_type, geometry).with_name("Drawing");
        Some(self.insert(layer))
    }

    // ---------------------------------------------------------------------
    // Text editing
    // ---------------------------------------------------------------------

    /// Open a text layer for editing.
    pub fn begin_text_edit(&mut self, id: LayerId) -> bool {
        let Some(LayerKind::Text { content, .. }) = self.document().get(id).map(|l| &l.kind) else {
            return false;
        };
        let buffer = content.clone();
        self.cancel_gesture();
        self.text_edit = Some(TextEdit { id, buffer });
        true
    }

    /// The open text buffer.
    pub fn edit_text_buffer(&mut self) -> Option<&mut String> {
        self.text_edit.as_mut().map(|edit| &mut edit.buffer)
    }

    /// ID of the layer being edited.
    #[must_use]
    pub fn editing_text(&self) -> Option<LayerId> {
        self.text_edit.as_ref().map(|edit| edit.id)
    }

    /// Write the buffer back as a single commit.
    pub fn commit_text_edit(&mut self) -> bool {
        match self.text_edit.take() {
            Some(edit) => self.set_text_content(edit.id, edit.buffer),
            None => false,
        }
    }

    /// Close the buffer without committing.
    pub fn cancel_text_edit(&mut self) {
        self.text_edit = None;
    }

    // ---------------------------------------------------------------------
    // Keyboard
    // ---------------------------------------------------------------------

    /// Apply a keyboard shortcut. Returns the shortcut that was handled.
    pub fn handle_key(&mut self, press: &KeyPress) -> Option<Shortcut> {
        if press.in_text_input || self.text_edit.is_some() {
            return None;
        }
        let shortcut = Shortcut::from_key(press)?;
        match shortcut {
            Shortcut::Undo => {
                self.undo();
            }
            Shortcut::Redo => {
                self.redo();
            }
            Shortcut::Delete => {
                self.delete_selection();
            }
            Shortcut::Group => {
                self.group_selection();
            }
            Shortcut::Ungroup => {
                self.ungroup_selection();
            }
            Shortcut::Escape => {
                if !self.cancel_gesture() {
                    if self.drawing.is_empty() {
                        self.selection.clear();
                    } else {
                        self.drawing.clear();
                    }
                }
            }
        }
        Some(shortcut)
    }

    // ---------------------------------------------------------------------
    // Service calls
    // ---------------------------------------------------------------------

    /// Whether a service call is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    fn selected_images(&self) -> Vec<(LayerId, ImagePayload)> {
        let store = self.document();
        self.effective_elements()
            .into_iter()
            .filter_map(|id| match &store.get(id)?.kind {
                LayerKind::Image { src, .. } => {
                    ImagePayload::from_data_uri(src).ok().map(|image| (id, image))
                }
                _ => None,
            })
            .collect()
    }

    /// Prepare a generation call from the prompt and the selected images.
    ///
    /// Returns `None` while busy, for an empty prompt, or when no selected
    /// image can be used as a reference.
    pub fn begin_generation(&mut self, prompt: &str) -> Option<GenerationRequest> {
        if self.is_busy() {
            tracing::debug!("generation ignored: a request is already pending");
            return None;
        }
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return None;
        }
        self.transcript.push(Role::User, prompt);
        let references: Vec<ImagePayload> =
            self.selected_images().into_iter().map(|(_, image)| image).collect();
        if references.is_empty() {
            self.transcript
                .push(Role::System, "Select at least one image to use as a reference.");
            return None;
        }
        tracing::info!("Starting generation with {} reference images", references.len());
        self.pending = Some(PendingRequest::Generation);
        Some(GenerationRequest {
            prompt: prompt.to_string(),
            references,
        })
    }

    /// Apply a generation result and leave the busy state.
    pub fn finish_generation<E: Display>(&mut self, outcome: Result<GeneratedImage, E>) -> Option<LayerId> {
        if self.pending != Some(PendingRequest::Generation) {
            tracing::debug!("generation result ignored: no generation pending");
            return None;
        }
        self.pending = None;
        match outcome {
            Ok(generated) => {
                if let Some(text) = generated.commentary.as_deref().filter(|t| !t.trim().is_empty()) {
                    self.transcript.push(Role::Assistant, text);
                }
                Some(self.add_generated_image(&generated))
            }
            Err(err) => {
                tracing::warn!("Generation failed: {err}");
                self.transcript.push(Role::System, format!("Generation failed: {err}"));
                None
            }
        }
    }

    /// Prepare a background removal call for the first selected image.
    pub fn begin_background_removal(&mut self) -> Option<BackgroundRemovalRequest> {
        if self.is_busy() {
            tracing::debug!("background removal ignored: a request is already pending");
            return None;
        }
        let Some((target, image)) = self.selected_images().into_iter().next() else {
            self.transcript
                .push(Role::System, "Select an image to remove its background.");
            return None;
        };
        tracing::info!("Starting background removal for {target}");
        self.pending = Some(PendingRequest::BackgroundRemoval { target });
        Some(BackgroundRemovalRequest { target, image })
    }

    /// Apply a background removal result and leave the busy state.
    ///
    /// Returns `true` when the target layer still exists and now shows the
    /// result. A result identical to the current image commits nothing but
    /// still counts as applied.
    pub fn finish_background_removal<E: Display>(&mut self, outcome: Result<ImagePayload, E>) -> bool {
        let Some(PendingRequest::BackgroundRemoval { target }) = self.pending else {
            tracing::debug!("background removal result ignored: no removal pending");
            return false;
        };
        self.pending = None;
        match outcome {
            Ok(image) => {
                if !self.document().contains(target) {
                    tracing::warn!("Background removal finished for deleted layer {target}");
                    self.transcript.push(
                        Role::System,
                        "Background removed, but the image layer no longer exists.",
                    );
                    return false;
                }
                if !self.replace_image_source(target, image.to_data_uri(), image.mime_type) {
                    tracing::debug!("background removal returned the unchanged image");
                }
                tracing::info!("Background removed for {target}");
                true
            }
            Err(err) => {
                tracing::warn!("Background removal failed: {err}");
                self.transcript
                    .push(Role::System, format!("Background removal failed: {err}"));
                false
            }
        }
    }
}
