//! # Layer Studio CLI
//!
//! Headless host for the Layer Studio editor.
//!
//! ## Usage
//!
//! ```bash
//! # Flatten a saved document
//! layer-studio export poster.json -o poster.png --scale 2
//!
//! # Generate from reference images (needs GEMINI_API_KEY)
//! layer-studio generate -p "make it a watercolor" -r photo.jpg -o out.png
//!
//! # Cut out the subject of a photo
//! layer-studio remove-bg photo.jpg -o cutout.png
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `ServiceArgs` / `ExportArgs` - Flag groups converted into
//!   `ServiceConfig` and `ExportConfig`
//! - [`commands`] - Drives an `Editor` through each subcommand

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

pub mod commands;

pub use commands::{export_document, generate_image, load_reference, remove_background};

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use studio_core::Viewport;
use studio_genai::config::{DEFAULT_BASE_URL, DEFAULT_MODEL, ENV_API_KEY, ENV_BASE_URL, ENV_MODEL};
use studio_genai::{ServiceConfig, ServiceError};
use studio_renderer::{ExportConfig, ExportFormat};

/// Command-line arguments for layer-studio.
#[derive(Debug, Clone, Parser)]
#[command(name = "layer-studio")]
#[command(about = "Layered canvas editor with a generative-image assistant")]
#[command(version)]
pub struct CliArgs {
    /// Generation service settings
    #[command(flatten)]
    pub service: ServiceArgs,

    /// Canvas viewport width
    #[arg(long, default_value = "1024", global = true)]
    pub viewport_width: u32,

    /// Canvas viewport height
    #[arg(long, default_value = "768", global = true)]
    pub viewport_height: u32,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

impl CliArgs {
    /// Viewport the editor is created with.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn viewport(&self) -> Viewport {
        Viewport::new(
            self.viewport_width.max(1) as f32,
            self.viewport_height.max(1) as f32,
        )
    }
}

/// Subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Render a layer document to PNG, JPEG or SVG
    Export(ExportArgs),
    /// Generate a new image from a prompt and reference images
    Generate(GenerateArgs),
    /// Replace the background of an image with transparency
    RemoveBg(RemoveBgArgs),
}

/// Connection flags for the generation service.
#[derive(Debug, Clone, Args)]
pub struct ServiceArgs {
    /// API key for the generation service
    #[arg(long, env = ENV_API_KEY, hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Service base URL
    #[arg(long, env = ENV_BASE_URL, default_value = DEFAULT_BASE_URL, global = true)]
    pub base_url: String,

    /// Image model name
    #[arg(long, env = ENV_MODEL, default_value = DEFAULT_MODEL, global = true)]
    pub model: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "120", global = true)]
    pub timeout_secs: u64,
}

impl TryFrom<&ServiceArgs> for ServiceConfig {
    type Error = ServiceError;

    fn try_from(args: &ServiceArgs) -> Result<Self, Self::Error> {
        let api_key = args
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ServiceError::MissingApiKey)?;
        Ok(ServiceConfig::new(api_key)
            .with_base_url(args.base_url.clone())
            .with_model(args.model.clone())
            .with_timeout(Duration::from_secs(args.timeout_secs.max(1))))
    }
}

/// Flags for `export`.
#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    /// Layer document (JSON)
    pub document: PathBuf,

    /// Output file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Output format (defaults to the output file extension)
    #[arg(long, value_parser = parse_format)]
    pub format: Option<ExportFormat>,

    /// Output width in pixels (defaults to the viewport width)
    #[arg(long)]
    pub width: Option<u32>,

    /// Output height in pixels (defaults to the viewport height)
    #[arg(long)]
    pub height: Option<u32>,

    /// Pixel density multiplier
    #[arg(long, default_value = "1.0")]
    pub scale: f32,

    /// Background color as `#rrggbb` or `#rrggbbaa`
    #[arg(long, default_value = "#ffffff", value_parser = parse_hex_color)]
    pub background: [u8; 4],

    /// JPEG quality
    #[arg(long, default_value = "85", value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: u8,

    /// Skip loading system fonts (text renders only with fonts embedded in the document)
    #[arg(long)]
    pub no_system_fonts: bool,
}

impl ExportArgs {
    /// Format from `--format`, falling back to the output extension.
    #[must_use]
    pub fn resolved_format(&self) -> Option<ExportFormat> {
        self.format.or_else(|| {
            self.output
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(ExportFormat::from_extension)
        })
    }
}

impl From<&ExportArgs> for ExportConfig {
    fn from(args: &ExportArgs) -> Self {
        let scale = if args.scale.is_finite() && args.scale > 0.0 {
            args.scale
        } else {
            1.0
        };
        Self {
            width: args.width,
            height: args.height,
            background: args.background,
            jpeg_quality: args.quality,
            scale,
            system_fonts: !args.no_system_fonts,
        }
    }
}

/// Flags for `generate`.
#[derive(Debug, Clone, Args)]
pub struct GenerateArgs {
    /// What to generate
    #[arg(short, long)]
    pub prompt: String,

    /// Reference image (repeatable)
    #[arg(short, long = "reference", required = true)]
    pub references: Vec<PathBuf>,

    /// Where to write the generated image
    #[arg(short, long)]
    pub output: PathBuf,

    /// Also save the resulting layer document (JSON)
    #[arg(long)]
    pub save_document: Option<PathBuf>,
}

/// Flags for `remove-bg`.
#[derive(Debug, Clone, Args)]
pub struct RemoveBgArgs {
    /// Source image
    pub input: PathBuf,

    /// Where to write the cut-out image
    #[arg(short, long)]
    pub output: PathBuf,
}

fn parse_format(value: &str) -> Result<ExportFormat, String> {
    ExportFormat::from_extension(value)
        .ok_or_else(|| format!("unsupported format '{value}' (expected png, jpeg or svg)"))
}

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` into RGBA bytes.
///
/// # Errors
///
/// Returns a message describing the malformed value.
pub fn parse_hex_color(value: &str) -> Result<[u8; 4], String> {
    let hex = value.trim().trim_start_matches('#');
    let invalid = || format!("invalid color '{value}'");
    let channel = |i: usize| {
        hex.get(i..i + 2)
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
            .ok_or_else(invalid)
    };

    match hex.len() {
        3 => {
            let mut rgba = [255; 4];
            for (slot, c) in rgba.iter_mut().zip(hex.chars()) {
                let digit = c.to_digit(16).ok_or_else(invalid)?;
                *slot = u8::try_from(digit * 17).map_err(|_| invalid())?;
            }
            Ok(rgba)
        }
        6 => Ok([channel(0)?, channel(2)?, channel(4)?, 255]),
        8 => Ok([channel(0)?, channel(2)?, channel(4)?, channel(6)?]),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(args).expect("valid arguments")
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ffffff"), Ok([255, 255, 255, 255]));
        assert_eq!(parse_hex_color("#00000080"), Ok([0, 0, 0, 128]));
        assert_eq!(parse_hex_color("f0a"), Ok([255, 0, 170, 255]));
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("#gggggg").is_err());
    }

    #[test]
    fn test_export_args() {
        let args = parse(&[
            "layer-studio",
            "export",
            "doc.json",
            "-o",
            "out.jpg",
            "--scale",
            "2",
            "--background",
            "#000000",
            "--quality",
            "70",
        ]);
        let Command::Export(export) = &args.command else {
            panic!("expected export");
        };
        assert_eq!(export.resolved_format(), Some(ExportFormat::Jpeg));

        let config = ExportConfig::from(export);
        assert_eq!(config.background, [0, 0, 0, 255]);
        assert_eq!(config.jpeg_quality, 70);
        assert!((config.scale - 2.0).abs() < f32::EPSILON);
        assert!(config.system_fonts);
    }

    #[test]
    fn test_explicit_format_wins() {
        let args = parse(&["layer-studio", "export", "doc.json", "-o", "out.bin", "--format", "svg"]);
        let Command::Export(export) = &args.command else {
            panic!("expected export");
        };
        assert_eq!(export.resolved_format(), Some(ExportFormat::Svg));
    }

    #[test]
    fn test_quality_out_of_range_rejected() {
        let result = CliArgs::try_parse_from([
            "layer-studio",
            "export",
            "doc.json",
            "-o",
            "out.jpg",
            "--quality",
            "0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_generate_requires_reference() {
        let result = CliArgs::try_parse_from(["layer-studio", "generate", "-p", "cat", "-o", "x.png"]);
        assert!(result.is_err());

        let args = parse(&[
            "layer-studio",
            "generate",
            "-p",
            "cat",
            "-r",
            "a.png",
            "-r",
            "b.png",
            "-o",
            "x.png",
        ]);
        let Command::Generate(generate) = &args.command else {
            panic!("expected generate");
        };
        assert_eq!(generate.references.len(), 2);
    }

    #[test]
    fn test_service_config_from_args() {
        let args = parse(&[
            "layer-studio",
            "--api-key",
            "secret",
            "--base-url",
            "http://localhost:9000",
            "--model",
            "m1",
            "--timeout-secs",
            "5",
            "remove-bg",
            "in.png",
            "-o",
            "out.png",
        ]);
        let config = ServiceConfig::try_from(&args.service).expect("config");
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.model, "m1");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_blank_api_key_rejected() {
        let args = parse(&["layer-studio", "--api-key", " ", "remove-bg", "in.png", "-o", "o.png"]);
        assert!(matches!(
            ServiceConfig::try_from(&args.service),
            Err(ServiceError::MissingApiKey)
        ));
    }

    #[test]
    fn test_viewport_flags() {
        let args = parse(&[
            "layer-studio",
            "export",
            "doc.json",
            "-o",
            "out.png",
            "--viewport-width",
            "800",
            "--viewport-height",
            "600",
        ]);
        assert_eq!(args.viewport(), Viewport::new(800.0, 600.0));
    }
}
