//! Move, resize and rotate gestures over the effective selection.
//!
//! A [`Gesture`] captures each target's starting geometry when it begins.
//! Preview frames only rewrite the gesture's own state; nothing reaches the
//! store until [`Gesture::apply`] produces the single committed snapshot.

use serde::{Deserialize, Serialize};

use crate::layer::{font_size_for_height, MIN_ELEMENT_SIZE};
use crate::{Geometry, Layer, LayerId, LayerKind, LayerStore};

/// The kind of pointer interaction in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureKind {
    /// Drag: position only.
    Move,
    /// Handle drag: size and position together.
    Resize,
    /// Rotation handle: rotation only.
    Rotate,
}

/// A resize handle on the selection's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeHandle {
    /// Top-left corner.
    TopLeft,
    /// Top edge.
    Top,
    /// Top-right corner.
    TopRight,
    /// Right edge.
    Right,
    /// Bottom-right corner.
    BottomRight,
    /// Bottom edge.
    Bottom,
    /// Bottom-left corner.
    BottomLeft,
    /// Left edge.
    Left,
}

impl ResizeHandle {
    /// Which edges this handle drags: (left, top, right, bottom).
    const fn edges(self) -> (bool, bool, bool, bool) {
        match self {
            Self::TopLeft => (true, true, false, false),
            Self::Top => (false, true, false, false),
            Self::TopRight => (false, true, true, false),
            Self::Right => (false, false, true, false),
            Self::BottomRight => (false, false, true, true),
            Self::Bottom => (false, false, false, true),
            Self::BottomLeft => (true, false, false, true),
            Self::Left => (true, false, false, false),
        }
    }
}

/// An element taking part in a gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureTarget {
    /// Element being transformed.
    pub id: LayerId,
    /// Geometry when the gesture began.
    pub start: Geometry,
}

/// An in-progress gesture: starting geometry plus the latest preview frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Gesture {
    kind: GestureKind,
    targets: Vec<GestureTarget>,
    preview: Vec<Geometry>,
    frames: u64,
}

impl Gesture {
    /// Start a gesture over the given elements.
    ///
    /// IDs that are unknown or name groups are skipped. Returns `None` when
    /// nothing transformable remains.
    #[must_use]
    pub fn begin(kind: GestureKind, store: &LayerStore, element_ids: &[LayerId]) -> Option<Self> {
        let targets: Vec<GestureTarget> = element_ids
            .iter()
            .filter_map(|id| {
                let start = *store.get(*id)?.geometry()?;
                Some(GestureTarget { id: *id, start })
            })
            .collect();
        if targets.is_empty() {
            return None;
        }
        let preview = targets.iter().map(|t| t.start).collect();
        Some(Self {
            kind,
            targets,
            preview,
            frames: 0,
        })
    }

    /// Kind of gesture.
    #[must_use]
    pub fn kind(&self) -> GestureKind {
        self.kind
    }

    /// Targets with their starting geometry.
    #[must_use]
    pub fn targets(&self) -> &[GestureTarget] {
        &self.targets
    }

    /// Latest reported geometry per target, in target order.
    #[must_use]
    pub fn preview(&self) -> &[Geometry] {
        &self.preview
    }

    /// Number of preview frames received.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Record a preview frame.
    ///
    /// `report` is called once per target with the target index and its
    /// starting geometry, and returns the geometry reported for this frame.
    pub fn update<F>(&mut self, mut report: F)
    where
        F: FnMut(usize, &Geometry) -> Geometry,
    {
        for (index, target) in self.targets.iter().enumerate() {
            self.preview[index] = report(index, &target.start);
        }
        self.frames += 1;
    }

    /// Preview frame offsetting every target from its start.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.update(|_, start| start.with_position(start.x + dx, start.y + dy));
    }

    /// Preview frame scaling every target about a fixed anchor point.
    pub fn scale_from(&mut self, anchor: (f32, f32), sx: f32, sy: f32) {
        let (ax, ay) = anchor;
        self.update(|_, start| Geometry {
            x: ax + (start.x - ax) * sx,
            y: ay + (start.y - ay) * sy,
            width: start.width * sx,
            height: start.height * sy,
            rotation: start.rotation,
        });
    }

    /// Preview frame dragging a handle of the targets' joint bounding box.
    ///
    /// The opposite edges stay fixed, so dragging a top or left handle moves
    /// the origin as well as the size.
    pub fn drag_handle(&mut self, handle: ResizeHandle, dx: f32, dy: f32) {
        let (left, top, right, bottom) = self.start_bounds();
        let (drag_left, drag_top, drag_right, drag_bottom) = handle.edges();

        let width = right - left;
        let height = bottom - top;
        let new_width = if drag_left {
            width - dx
        } else if drag_right {
            width + dx
        } else {
            width
        };
        let new_height = if drag_top {
            height - dy
        } else if drag_bottom {
            height + dy
        } else {
            height
        };

        let sx = if width > 0.0 { new_width / width } else { 1.0 };
        let sy = if height > 0.0 { new_height / height } else { 1.0 };
        let anchor_x = if drag_left { right } else { left };
        let anchor_y = if drag_top { bottom } else { top };
        self.scale_from((anchor_x, anchor_y), sx, sy);
    }

    /// Preview frame rotating every target by `degrees` about its own center.
    pub fn rotate_by(&mut self, degrees: f32) {
        self.update(|_, start| start.with_rotation(start.rotation + degrees));
    }

    /// Bounding box of all starting geometries: (left, top, right, bottom).
    fn start_bounds(&self) -> (f32, f32, f32, f32) {
        self.targets.iter().fold(
            (f32::MAX, f32::MAX, f32::MIN, f32::MIN),
            |(l, t, r, b), target| {
                let g = target.start;
                (
                    l.min(g.x),
                    t.min(g.y),
                    r.max(g.x + g.width),
                    b.max(g.y + g.height),
                )
            },
        )
    }

    /// The store with the latest frame written into every target.
    ///
    /// Used both for live preview and for the final commit, so preview and
    /// committed results never diverge.
    #[must_use]
    pub fn apply(&self, store: &LayerStore) -> LayerStore {
        let mut next = store.clone();
        for (target, reported) in self.targets.iter().zip(&self.preview) {
            if let Some(layer) = next.get_mut(target.id) {
                apply_frame(self.kind, layer, reported);
            }
        }
        next
    }
}

/// Write the properties a gesture kind owns from a reported geometry.
pub fn apply_frame(kind: GestureKind, layer: &mut Layer, reported: &Geometry) {
    match kind {
        GestureKind::Move => {
            if let Some(geometry) = layer.geometry_mut() {
                geometry.x = reported.x;
                geometry.y = reported.y;
            }
        }
        GestureKind::Resize => {
            let Some(geometry) = layer.geometry_mut() else {
                return;
            };
            geometry.x = reported.x;
            geometry.y = reported.y;
            geometry.width = reported.width.max(MIN_ELEMENT_SIZE);
            geometry.height = reported.height.max(MIN_ELEMENT_SIZE);
            let height = geometry.height;
            if let LayerKind::Text { style, .. } = &mut layer.kind {
                style.font_size = font_size_for_height(height);
            }
        }
        GestureKind::Rotate => {
            if let Some(geometry) = layer.geometry_mut() {
                geometry.rotation = reported.rotation;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TextStyle;

    fn image_at(x: f32, y: f32, w: f32, h: f32) -> Layer {
        Layer::image("data:,", "image/png", Geometry::new(x, y, w, h))
    }

    fn geometry_of(store: &LayerStore, id: LayerId) -> Geometry {
        *store.get(id).and_then(Layer::geometry).expect("element geometry")
    }

    #[test]
    fn test_begin_skips_groups_and_unknown() {
        let group = Layer::group();
        let store = LayerStore::from_layers(vec![group.clone()]);
        assert!(Gesture::begin(GestureKind::Move, &store, &[group.id, LayerId::new()]).is_none());
    }

    #[test]
    fn test_move_uses_each_targets_start() {
        let a = image_at(0.0, 0.0, 10.0, 10.0);
        let b = image_at(100.0, 50.0, 10.0, 10.0);
        let store = LayerStore::from_layers(vec![a.clone(), b.clone()]);

        let mut gesture = Gesture::begin(GestureKind::Move, &store, &[a.id, b.id]).expect("gesture");
        gesture.translate(5.0, 5.0);
        gesture.translate(20.0, -10.0);
        let next = gesture.apply(&store);

        assert_eq!(geometry_of(&next, a.id), Geometry::new(20.0, -10.0, 10.0, 10.0));
        assert_eq!(geometry_of(&next, b.id), Geometry::new(120.0, 40.0, 10.0, 10.0));
        assert_eq!(gesture.frame_count(), 2);
    }

    #[test]
    fn test_move_ignores_reported_size() {
        let a = image_at(0.0, 0.0, 10.0, 10.0);
        let store = LayerStore::from_layers(vec![a.clone()]);
        let mut gesture = Gesture::begin(GestureKind::Move, &store, &[a.id]).expect("gesture");
        gesture.update(|_, _| Geometry::new(3.0, 4.0, 999.0, 999.0).with_rotation(45.0));
        let next = gesture.apply(&store);
        assert_eq!(geometry_of(&next, a.id), Geometry::new(3.0, 4.0, 10.0, 10.0));
    }

    #[test]
    fn test_resize_text_recomputes_font_size() {
        let text = Layer::text("Hi", 0.0, 0.0, TextStyle::default());
        let store = LayerStore::from_layers(vec![text.clone()]);
        let mut gesture = Gesture::begin(GestureKind::Resize, &store, &[text.id]).expect("gesture");
        gesture.update(|_, start| Geometry {
            height: 60.0,
            ..*start
        });
        let next = gesture.apply(&store);
        match &next.get(text.id).expect("text").kind {
            LayerKind::Text { style, geometry, .. } => {
                assert!((style.font_size - 50.0).abs() < 1e-4);
                assert!((geometry.height - 60.0).abs() < f32::EPSILON);
            }
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn test_resize_clamps_to_minimum() {
        let text = Layer::text("Hi", 0.0, 0.0, TextStyle::default());
        let store = LayerStore::from_layers(vec![text.clone()]);
        let mut gesture = Gesture::begin(GestureKind::Resize, &store, &[text.id]).expect("gesture");
        gesture.update(|_, start| Geometry {
            width: -5.0,
            height: 0.0,
            ..*start
        });
        let next = gesture.apply(&store);
        let g = geometry_of(&next, text.id);
        assert!((g.width - MIN_ELEMENT_SIZE).abs() < f32::EPSILON);
        assert!((g.height - MIN_ELEMENT_SIZE).abs() < f32::EPSILON);
        match &next.get(text.id).expect("text").kind {
            LayerKind::Text { style, .. } => assert!(style.font_size >= 1.0),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn test_top_left_handle_moves_origin() {
        let a = image_at(10.0, 10.0, 100.0, 50.0);
        let store = LayerStore::from_layers(vec![a.clone()]);
        let mut gesture = Gesture::begin(GestureKind::Resize, &store, &[a.id]).expect("gesture");
        gesture.drag_handle(ResizeHandle::TopLeft, -10.0, -10.0);
        let g = geometry_of(&gesture.apply(&store), a.id);
        assert!((g.x - 0.0).abs() < 1e-4);
        assert!((g.y - 0.0).abs() < 1e-4);
        assert!((g.width - 110.0).abs() < 1e-4);
        assert!((g.height - 60.0).abs() < 1e-4);
    }

    #[test]
    fn test_group_resize_scales_about_bounds() {
        let a = image_at(0.0, 0.0, 10.0, 10.0);
        let b = image_at(90.0, 0.0, 10.0, 10.0);
        let store = LayerStore::from_layers(vec![a.clone(), b.clone()]);
        let mut gesture = Gesture::begin(GestureKind::Resize, &store, &[a.id, b.id]).expect("gesture");
        gesture.drag_handle(ResizeHandle::Right, 100.0, 0.0);
        let next = gesture.apply(&store);

        let ga = geometry_of(&next, a.id);
        let gb = geometry_of(&next, b.id);
        assert!((ga.x - 0.0).abs() < 1e-4);
        assert!((ga.width - 20.0).abs() < 1e-4);
        assert!((gb.x - 180.0).abs() < 1e-4);
        assert!((gb.width - 20.0).abs() < 1e-4);
        assert!((gb.height - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_rotate_only_changes_rotation() {
        let a = image_at(5.0, 6.0, 10.0, 10.0);
        let b = image_at(50.0, 60.0, 10.0, 10.0).kind;
        let mut b = Layer::new("b", b);
        if let Some(g) = b.geometry_mut() {
            g.rotation = 30.0;
        }
        let store = LayerStore::from_layers(vec![a.clone(), b.clone()]);

        let mut gesture = Gesture::begin(GestureKind::Rotate, &store, &[a.id, b.id]).expect("gesture");
        gesture.rotate_by(15.0);
        let next = gesture.apply(&store);
        assert_eq!(geometry_of(&next, a.id), Geometry::new(5.0, 6.0, 10.0, 10.0).with_rotation(15.0));
        assert_eq!(
            geometry_of(&next, b.id),
            Geometry::new(50.0, 60.0, 10.0, 10.0).with_rotation(45.0)
        );
    }
}
