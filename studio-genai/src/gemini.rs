//! HTTP client for a Gemini-style `generateContent` image endpoint.
//!
//! Requests carry one user turn: the prompt as a text part followed by the
//! reference images as `inlineData` parts. The first `inlineData` part of the
//! first candidate is the result; text parts become commentary.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use studio_core::{GeneratedImage, ImagePayload};
use studio_renderer::{decode_payload, downscale_payload, normalize_to_png};
use url::Url;

use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::service::ImageService;

/// Instruction sent with background removal requests.
pub const REMOVE_BACKGROUND_PROMPT: &str = "Remove the background from this image. Keep the main \
subject exactly as it is and make everything else fully transparent. Return a PNG with an alpha channel.";

/// [`ImageService`] backed by the Gemini `generateContent` API.
#[derive(Clone)]
pub struct GeminiImageService {
    inner: Arc<InnerClient>,
}

struct InnerClient {
    http: Client,
    endpoint: Url,
    api_key: String,
    max_reference_side: u32,
}

impl std::fmt::Debug for GeminiImageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiImageService")
            .field("endpoint", &self.inner.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl GeminiImageService {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::MissingApiKey`] for an empty key,
    /// [`ServiceError::InvalidUrl`] if the base URL is malformed, and
    /// [`ServiceError::Http`] if the HTTP client fails to build.
    pub fn new(config: &ServiceConfig) -> ServiceResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ServiceError::MissingApiKey);
        }
        let endpoint = endpoint_url(&config.base_url, &config.model)?;

        let http = Client::builder()
            .user_agent(concat!("studio-genai/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(InnerClient {
                http,
                endpoint,
                api_key: config.api_key.clone(),
                max_reference_side: config.max_reference_side,
            }),
        })
    }

    /// Full URL requests are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    async fn generate_content(
        &self,
        prompt: &str,
        images: &[ImagePayload],
    ) -> ServiceResult<(ImagePayload, Option<String>)> {
        let mut parts = vec![Part::text(prompt)];
        parts.extend(images.iter().map(Part::inline));
        let request = GenerateContentRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                response_modalities: vec!["TEXT", "IMAGE"],
            },
        };

        tracing::debug!(
            "POST {} with {} image parts",
            self.inner.endpoint,
            images.len()
        );
        let response = self
            .inner
            .http
            .post(self.inner.endpoint.clone())
            .header("x-goog-api-key", &self.inner.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .ok()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            tracing::warn!("Service returned {status}: {message}");
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateContentResponse = response.json().await?;
        extract_image(body)
    }
}

#[async_trait]
impl ImageService for GeminiImageService {
    async fn generate(
        &self,
        prompt: &str,
        references: &[ImagePayload],
    ) -> ServiceResult<GeneratedImage> {
        if references.is_empty() {
            return Err(ServiceError::NoReferenceImages);
        }
        let references = references
            .iter()
            .map(|r| downscale_payload(r, self.inner.max_reference_side))
            .collect::<Result<Vec<_>, _>>()?;

        let (image, commentary) = self.generate_content(prompt, &references).await?;
        let decoded = decode_payload(&image)?;
        tracing::info!("Generated {}x{} image", decoded.width, decoded.height);
        Ok(GeneratedImage {
            image,
            width: decoded.width,
            height: decoded.height,
            commentary,
        })
    }

    async fn remove_background(&self, image: &ImagePayload) -> ServiceResult<ImagePayload> {
        let upload = downscale_payload(image, self.inner.max_reference_side)?;
        let (result, _) = self
            .generate_content(REMOVE_BACKGROUND_PROMPT, std::slice::from_ref(&upload))
            .await?;
        Ok(normalize_to_png(&result)?)
    }
}

/// `{base_url}/v1beta/models/{model}:generateContent`
fn endpoint_url(base_url: &str, model: &str) -> ServiceResult<Url> {
    let mut base = Url::parse(base_url).map_err(|e| ServiceError::InvalidUrl(e.to_string()))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(&format!("v1beta/models/{model}:generateContent"))
        .map_err(|e| ServiceError::InvalidUrl(e.to_string()))
}

fn extract_image(body: GenerateContentResponse) -> ServiceResult<(ImagePayload, Option<String>)> {
    let parts = body
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();

    let mut image = None;
    let mut texts = Vec::new();
    for part in parts {
        if let Some(text) = part.text {
            texts.push(text);
        }
        if image.is_none() {
            image = part.inline_data;
        }
    }

    let commentary = Some(texts.join("\n")).filter(|t| !t.trim().is_empty());
    let Some(inline) = image else {
        if let Some(text) = &commentary {
            tracing::debug!("Service replied without an image: {text}");
        }
        return Err(ServiceError::NoImage);
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(inline.data.as_bytes())
        .map_err(|e| ServiceError::InvalidImage(e.to_string()))?;
    Ok((ImagePayload::new(inline.mime_type, bytes), commentary))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_modalities: Vec<&'a str>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, alias = "inline_data", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            inline_data: None,
        }
    }

    fn inline(image: &ImagePayload) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: image.mime_type.clone(),
                data: image.to_base64(),
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(alias = "mime_type")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}
