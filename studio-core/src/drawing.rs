//! Freehand stroke capture.
//!
//! Strokes are transient: they live in a [`Drawing`] until it is finalized
//! into a single SVG image that becomes a regular image layer.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::{Geometry, ImagePayload};

/// A point in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
}

impl Point {
    /// Create a point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Pen settings for a stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    /// Stroke color as a CSS color string.
    pub color: String,
    /// Pen width in pixels.
    pub width: f32,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: "#000000".to_string(),
            width: 4.0,
        }
    }
}

/// One continuous pen stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    /// Pen settings.
    pub style: StrokeStyle,
    /// Sampled points in order.
    pub points: Vec<Point>,
}

/// Strokes collected since drawing mode was entered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Drawing {
    strokes: Vec<Stroke>,
    active: Option<Stroke>,
}

impl Drawing {
    /// Create an empty drawing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a stroke, finishing any stroke still in progress.
    pub fn begin_stroke(&mut self, point: Point, style: StrokeStyle) {
        self.finish_stroke();
        self.active = Some(Stroke {
            style,
            points: vec![point],
        });
    }

    /// Add a sample to the active stroke. Ignored when no stroke is active.
    pub fn extend_stroke(&mut self, point: Point) {
        if let Some(stroke) = &mut self.active {
            stroke.points.push(point);
        }
    }

    /// Close the active stroke.
    pub fn finish_stroke(&mut self) {
        if let Some(stroke) = self.active.take() {
            self.strokes.push(stroke);
        }
    }

    /// Finished strokes.
    #[must_use]
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    /// Whether a stroke is in progress.
    #[must_use]
    pub fn is_stroking(&self) -> bool {
        self.active.is_some()
    }

    /// Whether there is nothing to finalize.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty() && self.active.is_none()
    }

    /// Discard everything.
    pub fn clear(&mut self) {
        self.strokes.clear();
        self.active = None;
    }

    /// Bounding box of all strokes, padded by half the widest pen.
    #[must_use]
    pub fn bounds(&self) -> Option<Geometry> {
        let all = self.strokes.iter().chain(self.active.iter());
        let mut bounds: Option<(f32, f32, f32, f32)> = None;
        let mut pad = 0.0_f32;
        for stroke in all {
            pad = pad.max(stroke.style.width / 2.0);
            for p in &stroke.points {
                bounds = Some(match bounds {
                    None => (p.x, p.y, p.x, p.y),
                    Some((l, t, r, b)) => (l.min(p.x), t.min(p.y), r.max(p.x), b.max(p.y)),
                });
            }
        }
        let (l, t, r, b) = bounds?;
        Some(Geometry::new(
            l - pad,
            t - pad,
            (r - l + pad * 2.0).max(1.0),
            (b - t + pad * 2.0).max(1.0),
        ))
    }

    /// Render all strokes to a standalone SVG image positioned at [`Self::bounds`].
    ///
    /// Returns `None` for an empty drawing. The drawing itself is left intact.
    #[must_use]
    pub fn to_svg_image(&self) -> Option<(Geometry, ImagePayload)> {
        let bounds = self.bounds()?;
        let mut svg = String::with_capacity(1024);
        let _ = write!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
            w = bounds.width,
            h = bounds.height,
        );
        for stroke in self.strokes.iter().chain(self.active.iter()) {
            let Some(first) = stroke.points.first() else {
                continue;
            };
            let mut d = format!("M{} {}", first.x - bounds.x, first.y - bounds.y);
            if stroke.points.len() == 1 {
                let _ = write!(d, " L{} {}", first.x - bounds.x, first.y - bounds.y);
            }
            for p in stroke.points.iter().skip(1) {
                let _ = write!(d, " L{} {}", p.x - bounds.x, p.y - bounds.y);
            }
            let _ = write!(
                svg,
                "<path d=\"{d}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" stroke-linecap=\"round\" stroke-linejoin=\"round\"/>",
                escape_attr(&stroke.style.color),
                stroke.style.width,
            );
        }
        svg.push_str("</svg>");
        Some((bounds, ImagePayload::new("image/svg+xml", svg.into_bytes())))
    }
}

fn escape_attr(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}
