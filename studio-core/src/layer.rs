//! Layers - the entries of the scene graph.
//!
//! A layer is either a renderable element (image or text) or a group that
//! owns other layers through their `parent_id` back-references.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ratio between a text element's box height and its font size.
///
/// Covers line height and descender allowance. Export uses the same ratio as
/// the line height so committed text renders the way it previewed.
pub const TEXT_LINE_HEIGHT_RATIO: f32 = 1.2;

/// Smallest font size a resize can produce.
pub const MIN_FONT_SIZE: f32 = 1.0;

/// Smallest width or height an element can be resized to.
pub const MIN_ELEMENT_SIZE: f32 = 1.0;

/// Unique identifier for a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerId(Uuid);

impl LayerId {
    /// Create a new unique layer ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position, size and rotation of an element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// X position (pixels from left).
    pub x: f32,
    /// Y position (pixels from top).
    pub y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
    /// Rotation in degrees, clockwise about the element's center.
    pub rotation: f32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
            rotation: 0.0,
        }
    }
}

impl Geometry {
    /// Create an unrotated geometry.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            rotation: 0.0,
        }
    }

    /// Center of the element's box.
    #[must_use]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Copy with a different position.
    #[must_use]
    pub const fn with_position(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Copy with a different rotation.
    #[must_use]
    pub const fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }
}

/// Direction of a two-color text gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GradientDirection {
    /// Left edge to right edge.
    #[default]
    #[serde(rename = "to right")]
    ToRight,
    /// Right edge to left edge.
    #[serde(rename = "to left")]
    ToLeft,
    /// Bottom edge to top edge.
    #[serde(rename = "to top")]
    ToTop,
    /// Top edge to bottom edge.
    #[serde(rename = "to bottom")]
    ToBottom,
    /// Top-left corner to bottom-right corner.
    #[serde(rename = "to bottom right")]
    ToBottomRight,
    /// Bottom-right corner to top-left corner.
    #[serde(rename = "to top left")]
    ToTopLeft,
}

impl GradientDirection {
    /// Start and end points of the gradient line on the given box.
    #[must_use]
    pub fn endpoints(self, geometry: &Geometry) -> ((f32, f32), (f32, f32)) {
        let Geometry {
            x, y, width, height, ..
        } = *geometry;
        let (left, top, right, bottom) = (x, y, x + width, y + height);
        match self {
            Self::ToRight => ((left, top), (right, top)),
            Self::ToLeft => ((right, top), (left, top)),
            Self::ToTop => ((left, bottom), (left, top)),
            Self::ToBottom => ((left, top), (left, bottom)),
            Self::ToBottomRight => ((left, top), (right, bottom)),
            Self::ToTopLeft => ((right, bottom), (left, top)),
        }
    }

    /// CSS-style name, e.g. `"to bottom right"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ToRight => "to right",
            Self::ToLeft => "to left",
            Self::ToTop => "to top",
            Self::ToBottom => "to bottom",
            Self::ToBottomRight => "to bottom right",
            Self::ToTopLeft => "to top left",
        }
    }
}

/// How text glyphs are filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TextFill {
    /// A single color.
    Solid {
        /// Color as a CSS color string.
        color: String,
    },
    /// A linear gradient between two colors across the text box.
    Gradient {
        /// Color at the start of the gradient line.
        from: String,
        /// Color at the end of the gradient line.
        to: String,
        /// Direction of the gradient line.
        direction: GradientDirection,
    },
}

impl Default for TextFill {
    fn default() -> Self {
        Self::Solid {
            color: "#000000".to_string(),
        }
    }
}

/// Font weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    /// Regular weight.
    #[default]
    Normal,
    /// Bold weight.
    Bold,
}

/// Font style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    /// Upright glyphs.
    #[default]
    Normal,
    /// Italic glyphs.
    Italic,
}

/// Text decoration line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextDecoration {
    /// No decoration.
    #[default]
    None,
    /// Line under the text.
    Underline,
    /// Line through the middle of the text.
    LineThrough,
}

/// Outline stroke drawn around text glyphs.
///
/// Settings are kept while disabled so toggling back restores them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOutline {
    /// Whether the outline is drawn.
    pub enabled: bool,
    /// Stroke color.
    pub color: String,
    /// Stroke width in pixels.
    pub width: f32,
}

impl Default for TextOutline {
    fn default() -> Self {
        Self {
            enabled: false,
            color: "#ffffff".to_string(),
            width: 2.0,
        }
    }
}

/// Drop shadow applied while drawing text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextShadow {
    /// Whether the shadow is drawn.
    pub enabled: bool,
    /// Shadow color.
    pub color: String,
    /// Blur radius in pixels.
    pub blur: f32,
    /// Horizontal offset in pixels.
    pub offset_x: f32,
    /// Vertical offset in pixels.
    pub offset_y: f32,
}

impl Default for TextShadow {
    fn default() -> Self {
        Self {
            enabled: false,
            color: "rgba(0,0,0,0.5)".to_string(),
            blur: 4.0,
            offset_x: 2.0,
            offset_y: 2.0,
        }
    }
}

/// Visual attributes of a text element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    /// Font size in pixels.
    pub font_size: f32,
    /// Font family name.
    pub font_family: String,
    /// Glyph fill.
    pub fill: TextFill,
    /// Font weight.
    pub weight: FontWeight,
    /// Font style.
    pub style: FontStyle,
    /// Decoration line.
    pub decoration: TextDecoration,
    /// Optional outline.
    pub outline: TextOutline,
    /// Optional drop shadow.
    pub shadow: TextShadow,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 32.0,
            font_family: "sans-serif".to_string(),
            fill: TextFill::default(),
            weight: FontWeight::default(),
            style: FontStyle::default(),
            decoration: TextDecoration::default(),
            outline: TextOutline::default(),
            shadow: TextShadow::default(),
        }
    }
}

/// Font size that fills a text box of the given height.
#[must_use]
pub fn font_size_for_height(height: f32) -> f32 {
    (height / TEXT_LINE_HEIGHT_RATIO).max(MIN_FONT_SIZE)
}

/// The content of a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum LayerKind {
    /// A raster or vector image.
    Image {
        /// Position and size.
        geometry: Geometry,
        /// Image source: a `data:` URI or a URL.
        src: String,
        /// MIME type of the payload.
        mime_type: String,
    },

    /// A text label.
    Text {
        /// Position and size.
        geometry: Geometry,
        /// Text content, possibly multi-line.
        content: String,
        /// Visual attributes.
        style: TextStyle,
    },

    /// A container for other layers.
    Group {
        /// Whether descendants are shown in the layer tree.
        expanded: bool,
    },
}

/// An entry in the layer store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Unique identifier.
    pub id: LayerId,
    /// Display label.
    pub name: String,
    /// Visibility flag of this layer alone (ancestors are not folded in).
    pub visible: bool,
    /// Owning group, `None` for top-level layers.
    pub parent_id: Option<LayerId>,
    /// Layer content.
    pub kind: LayerKind,
}

impl Layer {
    /// Create a visible top-level layer with a fresh ID.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            id: LayerId::new(),
            name: name.into(),
            visible: true,
            parent_id: None,
            kind,
        }
    }

    /// Create an image layer.
    #[must_use]
    pub fn image(src: impl Into<String>, mime_type: impl Into<String>, geometry: Geometry) -> Self {
        Self::new(
            "Image",
            LayerKind::Image {
                geometry,
                src: src.into(),
                mime_type: mime_type.into(),
            },
        )
    }

    /// Create a text layer whose box height matches the font size.
    #[must_use]
    pub fn text(content: impl Into<String>, x: f32, y: f32, style: TextStyle) -> Self {
        let content = content.into();
        #[allow(clippy::cast_precision_loss)]
        let lines = content.lines().count().max(1) as f32;
        let longest = content.lines().map(|l| l.chars().count()).max().unwrap_or(0);
        #[allow(clippy::cast_precision_loss)]
        let width = (longest as f32 * style.font_size * 0.6).max(style.font_size);
        let height = style.font_size * TEXT_LINE_HEIGHT_RATIO * lines;
        Self::new(
            "Text",
            LayerKind::Text {
                geometry: Geometry::new(x, y, width, height),
                content,
                style,
            },
        )
    }

    /// Create an empty, expanded group.
    #[must_use]
    pub fn group() -> Self {
        Self::new("Group", LayerKind::Group { expanded: true })
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the owning group.
    #[must_use]
    pub fn with_parent(mut self, parent_id: Option<LayerId>) -> Self {
        self.parent_id = parent_id;
        self
    }

    /// Set the visibility flag.
    #[must_use]
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Whether this layer is a group.
    #[must_use]
    pub fn is_group(&self) -> bool {
        matches!(self.kind, LayerKind::Group { .. })
    }

    /// Whether this layer is a renderable element (image or text).
    #[must_use]
    pub fn is_element(&self) -> bool {
        !self.is_group()
    }

    /// Geometry of an element, `None` for groups.
    #[must_use]
    pub fn geometry(&self) -> Option<&Geometry> {
        match &self.kind {
            LayerKind::Image { geometry, .. } | LayerKind::Text { geometry, .. } => Some(geometry),
            LayerKind::Group { .. } => None,
        }
    }

    /// Mutable geometry of an element, `None` for groups.
    pub fn geometry_mut(&mut self) -> Option<&mut Geometry> {
        match &mut self.kind {
            LayerKind::Image { geometry, .. } | LayerKind::Text { geometry, .. } => Some(geometry),
            LayerKind::Group { .. } => None,
        }
    }

    /// Check if a point (in canvas coordinates) is within this element's unrotated box.
    #[must_use]
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        self.geometry().is_some_and(|g| {
            x >= g.x && x <= g.x + g.width && y >= g.y && y <= g.y + g.height
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_ids_are_unique() {
        let a = LayerId::new();
        let b = LayerId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_font_size_for_height() {
        assert!((font_size_for_height(60.0) - 50.0).abs() < 1e-4);
        assert!((font_size_for_height(0.5) - MIN_FONT_SIZE).abs() < f32::EPSILON);
    }

    #[test]
    fn test_gradient_endpoints_follow_direction() {
        let g = Geometry::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(
            GradientDirection::ToRight.endpoints(&g),
            ((10.0, 20.0), (110.0, 20.0))
        );
        assert_eq!(
            GradientDirection::ToTop.endpoints(&g),
            ((10.0, 70.0), (10.0, 20.0))
        );
        assert_eq!(
            GradientDirection::ToTopLeft.endpoints(&g),
            ((110.0, 70.0), (10.0, 20.0))
        );
    }

    #[test]
    fn test_gradient_direction_serde_names() {
        let json = serde_json::to_string(&GradientDirection::ToBottomRight).expect("serialize");
        assert_eq!(json, "\"to bottom right\"");
        let back: GradientDirection = serde_json::from_str("\"to left\"").expect("deserialize");
        assert_eq!(back, GradientDirection::ToLeft);
    }

    #[test]
    fn test_text_layer_height_tracks_font_size() {
        let style = TextStyle {
            font_size: 20.0,
            ..TextStyle::default()
        };
        let layer = Layer::text("one\ntwo", 0.0, 0.0, style);
        let geometry = layer.geometry().expect("text has geometry");
        assert!((geometry.height - 48.0).abs() < 1e-4);
    }

    #[test]
    fn test_group_has_no_geometry() {
        let group = Layer::group();
        assert!(group.is_group());
        assert!(group.geometry().is_none());
        assert!(!group.contains_point(0.0, 0.0));
    }

    #[test]
    fn test_contains_point() {
        let layer = Layer::image("data:,", "image/png", Geometry::new(100.0, 100.0, 200.0, 50.0));
        assert!(layer.contains_point(150.0, 125.0));
        assert!(!layer.contains_point(50.0, 50.0));
    }
}
