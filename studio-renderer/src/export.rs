//! Document export to flattened images.
//!
//! Renders the visible elements of a [`LayerStore`] to PNG, JPEG or SVG using
//! an SVG intermediate representation and the resvg/tiny-skia rasterization
//! pipeline. Elements are painted back-to-front: the last layer in the store
//! first, the first layer (top-most) last.

use std::fmt::Write;

use image::ImageEncoder;
use serde::{Deserialize, Serialize};
use studio_core::{
    FontStyle, FontWeight, Geometry, Layer, LayerKind, LayerStore, TextDecoration, TextFill,
    TextStyle, Viewport, TEXT_LINE_HEIGHT_RATIO,
};

use crate::error::{RenderError, RenderResult};

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// PNG image.
    Png,
    /// JPEG image.
    Jpeg,
    /// SVG vector graphics (returns the SVG XML string as UTF-8 bytes).
    Svg,
}

impl ExportFormat {
    /// Pick a format from a file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "svg" => Some(Self::Svg),
            _ => None,
        }
    }

    /// MIME type of the encoded output.
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Svg => "image/svg+xml",
        }
    }
}

/// Configuration for document export.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Output width in pixels (default: viewport width).
    pub width: Option<u32>,
    /// Output height in pixels (default: viewport height).
    pub height: Option<u32>,
    /// Background color as RGBA bytes.
    pub background: [u8; 4],
    /// JPEG quality 1-100 (default: 85).
    pub jpeg_quality: u8,
    /// Scale factor (e.g. 2.0 for retina).
    pub scale: f32,
    /// Load system fonts before rasterizing text.
    pub system_fonts: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            background: [255, 255, 255, 255],
            jpeg_quality: 85,
            scale: 1.0,
            system_fonts: true,
        }
    }
}

/// Exports a [`LayerStore`] to flattened image formats.
#[derive(Debug, Clone)]
pub struct SceneExporter {
    config: ExportConfig,
}

impl SceneExporter {
    /// Create a new exporter with the given configuration.
    #[must_use]
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    /// Create an exporter with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(ExportConfig::default())
    }

    /// Export a document to the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be rendered or encoded.
    pub fn export(
        &self,
        store: &LayerStore,
        viewport: Viewport,
        format: ExportFormat,
    ) -> RenderResult<Vec<u8>> {
        tracing::debug!("Exporting {} layers as {format:?}", store.len());
        match format {
            ExportFormat::Png => self.render_to_png(store, viewport),
            ExportFormat::Jpeg => self.render_to_jpeg(store, viewport),
            ExportFormat::Svg => Ok(self.render_to_svg(store, viewport).into_bytes()),
        }
    }

    /// Export the document to PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or encoding fails.
    pub fn render_to_png(&self, store: &LayerStore, viewport: Viewport) -> RenderResult<Vec<u8>> {
        let svg = self.render_to_svg(store, viewport);
        let pixmap = self.rasterize_svg(&svg)?;

        pixmap
            .encode_png()
            .map_err(|e| RenderError::Export(format!("PNG encoding failed: {e}")))
    }

    /// Export the document to JPEG bytes, flattened onto the background color.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or encoding fails.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn render_to_jpeg(&self, store: &LayerStore, viewport: Viewport) -> RenderResult<Vec<u8>> {
        let svg = self.render_to_svg(store, viewport);
        let pixmap = self.rasterize_svg(&svg)?;

        let (width, height) = (pixmap.width(), pixmap.height());
        let bg = &self.config.background;
        let mut rgb_data = Vec::with_capacity((width * height * 3) as usize);
        // Pixmap data is premultiplied, so the source term needs no alpha factor.
        for pixel in pixmap.data().chunks_exact(4) {
            let inv = 1.0 - f32::from(pixel[3]) / 255.0;
            for (&src, &back) in pixel[..3].iter().zip(&bg[..3]) {
                let value = f32::from(back).mul_add(inv, f32::from(src));
                rgb_data.push(value.round().min(255.0) as u8);
            }
        }

        let mut buf = std::io::Cursor::new(Vec::new());
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, self.config.jpeg_quality);
        encoder
            .write_image(&rgb_data, width, height, image::ColorType::Rgb8.into())
            .map_err(|e| RenderError::Export(format!("JPEG encoding failed: {e}")))?;

        Ok(buf.into_inner())
    }

    /// Compose the document as an SVG string.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn render_to_svg(&self, store: &LayerStore, viewport: Viewport) -> String {
        let (out_w, out_h) = self.output_dimensions(viewport);
        let scale = self.config.scale;
        let view_w = out_w as f32 / scale;
        let view_h = out_h as f32 / scale;

        let mut svg = String::with_capacity(4096);
        let _ = write!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" width=\"{out_w}\" height=\"{out_h}\" viewBox=\"0 0 {view_w} {view_h}\">",
        );

        let bg = &self.config.background;
        let bg_alpha = f32::from(bg[3]) / 255.0;
        let _ = write!(
            svg,
            "<rect width=\"100%\" height=\"100%\" fill=\"rgba({},{},{},{})\"/>",
            bg[0], bg[1], bg[2], bg_alpha,
        );

        for (index, layer) in store.visible_elements().iter().rev().enumerate() {
            render_layer_svg(&mut svg, index, layer);
        }

        svg.push_str("</svg>");
        svg
    }

    /// Get output dimensions (width, height) in pixels.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn output_dimensions(&self, viewport: Viewport) -> (u32, u32) {
        let base_w = self
            .config
            .width
            .unwrap_or_else(|| viewport.width.max(1.0) as u32);
        let base_h = self
            .config
            .height
            .unwrap_or_else(|| viewport.height.max(1.0) as u32);

        #[allow(clippy::cast_precision_loss)]
        let out_w = (base_w as f32 * self.config.scale) as u32;
        #[allow(clippy::cast_precision_loss)]
        let out_h = (base_h as f32 * self.config.scale) as u32;
        (out_w.max(1), out_h.max(1))
    }

    /// Rasterize an SVG string to a tiny-skia Pixmap.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn rasterize_svg(&self, svg: &str) -> RenderResult<tiny_skia::Pixmap> {
        let mut opt = usvg::Options::default();
        if self.config.system_fonts {
            opt.fontdb_mut().load_system_fonts();
        }
        let tree = usvg::Tree::from_str(svg, &opt)
            .map_err(|e| RenderError::Export(format!("SVG parsing failed: {e}")))?;

        let px_w = tree.size().width() as u32;
        let px_h = tree.size().height() as u32;

        let mut pixmap = tiny_skia::Pixmap::new(px_w.max(1), px_h.max(1))
            .ok_or_else(|| RenderError::Export("Failed to create pixmap".to_string()))?;

        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

        Ok(pixmap)
    }
}

/// Render one element, rotated about its own center.
fn render_layer_svg(svg: &mut String, index: usize, layer: &Layer) {
    match &layer.kind {
        LayerKind::Image {
            geometry, src, ..
        } => {
            open_group(svg, geometry, None);
            let _ = write!(
                svg,
                "<image x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" preserveAspectRatio=\"none\" xlink:href=\"{}\"/>",
                geometry.x,
                geometry.y,
                geometry.width,
                geometry.height,
                escape_xml(src),
            );
            svg.push_str("</g>");
        }
        LayerKind::Text {
            geometry,
            content,
            style,
        } => render_text_svg(svg, index, geometry, content, style),
        LayerKind::Group { .. } => {}
    }
}

fn open_group(svg: &mut String, geometry: &Geometry, filter: Option<&str>) {
    svg.push_str("<g");
    if geometry.rotation.abs() > f32::EPSILON {
        let (cx, cy) = geometry.center();
        let _ = write!(svg, " transform=\"rotate({} {cx} {cy})\"", geometry.rotation);
    }
    if let Some(filter) = filter {
        let _ = write!(svg, " filter=\"url(#{filter})\"");
    }
    svg.push('>');
}

/// Render a text element: outline stroke first, then the fill.
///
/// Gradient and shadow definitions are scoped to this element by index.
fn render_text_svg(
    svg: &mut String,
    index: usize,
    geometry: &Geometry,
    content: &str,
    style: &TextStyle,
) {
    let fill = match &style.fill {
        TextFill::Solid { color } => escape_xml(color),
        TextFill::Gradient {
            from,
            to,
            direction,
        } => {
            let ((x1, y1), (x2, y2)) = direction.endpoints(geometry);
            let _ = write!(
                svg,
                "<defs><linearGradient id=\"fill-{index}\" gradientUnits=\"userSpaceOnUse\" x1=\"{x1}\" y1=\"{y1}\" x2=\"{x2}\" y2=\"{y2}\"><stop offset=\"0\" stop-color=\"{}\"/><stop offset=\"1\" stop-color=\"{}\"/></linearGradient></defs>",
                escape_xml(from),
                escape_xml(to),
            );
            format!("url(#fill-{index})")
        }
    };

    let shadow = &style.shadow;
    let filter = if shadow.enabled {
        let id = format!("shadow-{index}");
        let _ = write!(
            svg,
            "<defs><filter id=\"{id}\" x=\"-50%\" y=\"-50%\" width=\"200%\" height=\"200%\"><feDropShadow dx=\"{}\" dy=\"{}\" stdDeviation=\"{}\" flood-color=\"{}\"/></filter></defs>",
            shadow.offset_x,
            shadow.offset_y,
            shadow.blur / 2.0,
            escape_xml(&shadow.color),
        );
        Some(id)
    } else {
        None
    };

    open_group(svg, geometry, filter.as_deref());

    let font = font_attributes(style);
    let lines = line_spans(geometry, content, style.font_size);
    let outline = &style.outline;
    if outline.enabled && outline.width > 0.0 {
        let _ = write!(
            svg,
            "<text {font} fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" stroke-linejoin=\"round\">{lines}</text>",
            escape_xml(&outline.color),
            outline.width,
        );
    }
    let _ = write!(svg, "<text {font} fill=\"{fill}\">{lines}</text>");
    svg.push_str("</g>");
}

fn font_attributes(style: &TextStyle) -> String {
    let weight = match style.weight {
        FontWeight::Normal => "normal",
        FontWeight::Bold => "bold",
    };
    let font_style = match style.style {
        FontStyle::Normal => "normal",
        FontStyle::Italic => "italic",
    };
    let mut attrs = format!(
        "xml:space=\"preserve\" font-size=\"{}\" font-family=\"{}\" font-weight=\"{weight}\" font-style=\"{font_style}\"",
        style.font_size,
        escape_xml(&style.font_family),
    );
    match style.decoration {
        TextDecoration::None => {}
        TextDecoration::Underline => attrs.push_str(" text-decoration=\"underline\""),
        TextDecoration::LineThrough => attrs.push_str(" text-decoration=\"line-through\""),
    }
    attrs
}

/// One `<tspan>` per line; baselines are `font_size * 1.2` apart.
#[allow(clippy::cast_precision_loss)]
fn line_spans(geometry: &Geometry, content: &str, font_size: f32) -> String {
    let line_height = font_size * TEXT_LINE_HEIGHT_RATIO;
    let mut spans = String::new();
    for (i, line) in content.split('\n').enumerate() {
        let baseline = geometry.y + font_size + line_height * i as f32;
        let _ = write!(
            spans,
            "<tspan x=\"{}\" y=\"{baseline}\">{}</tspan>",
            geometry.x,
            escape_xml(line),
        );
    }
    spans
}

/// Escape special XML characters in text content and attributes.
fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
