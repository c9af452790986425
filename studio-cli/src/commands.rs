//! Subcommand implementations.
//!
//! Every command goes through an [`Editor`] so the CLI exercises the same
//! layer model, selection and request protocol an interactive front end would.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use studio_core::{Editor, ImagePayload, LayerId, LayerKind, LayerStore, Viewport};
use studio_genai::{run_background_removal, run_generation, ImageService};
use studio_renderer::{
    decode_payload, normalize_to_png, payload_from_bytes, ExportConfig, ExportFormat,
    SceneExporter,
};

use crate::{ExportArgs, GenerateArgs, RemoveBgArgs};

/// Render a saved document. Returns the number of bytes written.
///
/// # Errors
///
/// Fails if the document cannot be read or parsed, the format cannot be
/// determined, or rendering or writing the output fails.
pub fn export_document(args: &ExportArgs, viewport: Viewport) -> Result<usize> {
    let json = fs::read_to_string(&args.document)
        .with_context(|| format!("Failed to read {}", args.document.display()))?;
    let store = LayerStore::from_json(&json)
        .with_context(|| format!("Invalid layer document {}", args.document.display()))?;

    let format = args.resolved_format().ok_or_else(|| {
        anyhow!(
            "Cannot infer export format from {}; pass --format",
            args.output.display()
        )
    })?;

    tracing::info!(
        "Exporting {} layers from {} as {format:?}",
        store.len(),
        args.document.display()
    );
    let exporter = SceneExporter::new(ExportConfig::from(args));
    let bytes = exporter.export(&store, viewport, format)?;
    fs::write(&args.output, &bytes)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    Ok(bytes.len())
}

/// Read an image file and report its pixel size.
///
/// # Errors
///
/// Fails if the file cannot be read or is not a decodable image.
pub fn load_reference(path: &Path) -> Result<(ImagePayload, u32, u32)> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let payload = payload_from_bytes(bytes)
        .with_context(|| format!("{} is not a supported image", path.display()))?;
    let decoded = decode_payload(&payload)
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    Ok((payload, decoded.width, decoded.height))
}

/// Place an image file on the canvas, fitted to the viewport.
#[allow(clippy::cast_precision_loss)]
fn place_image(editor: &mut Editor, path: &Path) -> Result<LayerId> {
    let (payload, width, height) = load_reference(path)?;
    let geometry = editor.viewport().fit(width as f32, height as f32);
    let id = editor.add_image(&payload, geometry);
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        editor.rename(id, name);
    }
    Ok(id)
}

/// Generate an image from the reference files and write it out.
///
/// The references are added as layers and selected together before the
/// request runs, so the editor builds the request from its own selection.
///
/// # Errors
///
/// Fails if a reference cannot be loaded, the service call fails, or the
/// output cannot be written.
pub async fn generate_image<S>(
    editor: &mut Editor,
    service: &S,
    args: &GenerateArgs,
) -> Result<LayerId>
where
    S: ImageService + ?Sized,
{
    let mut placed = Vec::with_capacity(args.references.len());
    for path in &args.references {
        placed.push(place_image(editor, path)?);
    }
    let Some((&first, rest)) = placed.split_first() else {
        bail!("At least one reference image is required");
    };
    editor.select_only(first);
    for &id in rest {
        editor.click(id, true);
    }

    let Some(id) = run_generation(editor, service, &args.prompt).await else {
        return Err(last_failure(editor, "Generation did not produce an image"));
    };

    for message in editor.transcript().messages() {
        tracing::debug!("{:?}: {}", message.role, message.text);
    }
    write_image(&args.output, &layer_image(editor.document(), id)?)?;

    if let Some(path) = &args.save_document {
        let json = editor.document().to_json()?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Saved document to {}", path.display());
    }
    Ok(id)
}

/// Remove the background of an image file and write the cut-out.
///
/// # Errors
///
/// Fails if the input cannot be loaded, the service call fails, or the
/// output cannot be written.
pub async fn remove_background<S>(
    editor: &mut Editor,
    service: &S,
    args: &RemoveBgArgs,
) -> Result<LayerId>
where
    S: ImageService + ?Sized,
{
    let id = place_image(editor, &args.input)?;
    editor.select_only(id);

    if !run_background_removal(editor, service).await {
        return Err(last_failure(editor, "Background removal did not complete"));
    }
    write_image(&args.output, &layer_image(editor.document(), id)?)?;
    Ok(id)
}

fn last_failure(editor: &Editor, fallback: &str) -> anyhow::Error {
    match editor.transcript().last() {
        Some(message) => anyhow!("{}", message.text),
        None => anyhow!("{fallback}"),
    }
}

fn layer_image(store: &LayerStore, id: LayerId) -> Result<ImagePayload> {
    let layer = store
        .get(id)
        .ok_or_else(|| anyhow!("Layer {id} is missing"))?;
    let LayerKind::Image { src, .. } = &layer.kind else {
        bail!("Layer {id} is not an image");
    };
    Ok(ImagePayload::from_data_uri(src)?)
}

/// Write an image, re-encoding to PNG when the path asks for it.
fn write_image(path: &Path, image: &ImagePayload) -> Result<()> {
    let wants_png = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(ExportFormat::from_extension)
        == Some(ExportFormat::Png);
    let bytes = if wants_png {
        normalize_to_png(image)?.bytes
    } else {
        image.bytes.clone()
    };
    fs::write(path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
