//! The service seam and the drivers that connect it to the editor.
//!
//! The editor never awaits anything itself: `begin_*` hands out a request,
//! the caller runs it against an [`ImageService`], and `finish_*` applies
//! the outcome. The drivers here do exactly that.
//!
//! The drivers borrow the editor mutably for the whole call, so nothing else
//! can edit it meanwhile. They suit headless hosts such as the CLI.
//! Interactive hosts should call `begin_*`, run the service on their own task,
//! and hand the outcome to `finish_*`, so edits keep flowing while the editor
//! is busy.

use async_trait::async_trait;
use studio_core::{Editor, GeneratedImage, ImagePayload, LayerId};

use crate::error::ServiceResult;

/// A remote capability that produces images.
#[async_trait]
pub trait ImageService: Send + Sync {
    /// Generate a new image from a prompt and at least one reference image.
    async fn generate(
        &self,
        prompt: &str,
        references: &[ImagePayload],
    ) -> ServiceResult<GeneratedImage>;

    /// Return a copy of the image with a transparent background.
    async fn remove_background(&self, image: &ImagePayload) -> ServiceResult<ImagePayload>;
}

/// Run a generation request from the editor's prompt and selection.
///
/// Returns the new layer on success. Failures end up in the editor's
/// transcript; the busy state is cleared either way. The editor stays
/// borrowed until the service answers; see the module docs for interactive use.
pub async fn run_generation<S>(editor: &mut Editor, service: &S, prompt: &str) -> Option<LayerId>
where
    S: ImageService + ?Sized,
{
    let request = editor.begin_generation(prompt)?;
    let outcome = service.generate(&request.prompt, &request.references).await;
    editor.finish_generation(outcome)
}

/// Remove the background of the first selected image.
///
/// Returns whether the result was applied. Like [`run_generation`], this holds
/// the editor for the whole call.
pub async fn run_background_removal<S>(editor: &mut Editor, service: &S) -> bool
where
    S: ImageService + ?Sized,
{
    let Some(request) = editor.begin_background_removal() else {
        return false;
    };
    let outcome = service.remove_background(&request.image).await;
    editor.finish_background_removal(outcome)
}
