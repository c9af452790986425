//! HTTP tests for the Gemini image service against a mock server.

use serde_json::json;
use studio_core::{Editor, Geometry, ImagePayload, LayerKind, Role};
use studio_genai::{
    run_generation, GeminiImageService, ImageService, ServiceConfig, ServiceError,
};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// 1x1 red PNG.
const PIXEL_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";
const ENDPOINT: &str = "/v1beta/models/test-model:generateContent";

fn pixel() -> ImagePayload {
    ImagePayload::from_data_uri(&format!("data:image/png;base64,{PIXEL_PNG}")).expect("pixel")
}

fn service_for(server: &MockServer) -> GeminiImageService {
    let config = ServiceConfig::new("test-key")
        .with_base_url(server.uri())
        .with_model("test-model");
    GeminiImageService::new(&config).expect("client")
}

fn image_response(mime: &str, data: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [
                    { "text": "Here is your image." },
                    { "inlineData": { "mimeType": mime, "data": data } }
                ]
            }
        }]
    }))
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn generate_returns_image() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_string_contains("a red square"))
        .and(body_string_contains(PIXEL_PNG))
        .respond_with(image_response("image/png", PIXEL_PNG))
        .expect(1)
        .mount(&server)
        .await;

    let generated = service_for(&server)
        .generate("a red square", &[pixel()])
        .await
        .expect("generated");
    assert_eq!(generated.image, pixel());
    assert_eq!((generated.width, generated.height), (1, 1));
    assert_eq!(generated.commentary.as_deref(), Some("Here is your image."));
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn generate_without_image_fails() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "I cannot help with that." }] }
            }]
        })))
        .mount(&server)
        .await;

    let err = service_for(&server)
        .generate("a red square", &[pixel()])
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NoImage), "unexpected error: {err:?}");
    assert_eq!(err.to_string(), "no image produced");
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn api_error_surfaces_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "code": 400,
                "message": "API key not valid",
                "status": "INVALID_ARGUMENT"
            }
        })))
        .mount(&server)
        .await;

    let err = service_for(&server)
        .generate("a red square", &[pixel()])
        .await
        .unwrap_err();
    match err {
        ServiceError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "API key not valid");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn generate_requires_reference() {
    let config = ServiceConfig::new("test-key").with_base_url("http://127.0.0.1:9");
    let service = GeminiImageService::new(&config).expect("client");
    let err = service.generate("anything", &[]).await.unwrap_err();
    assert!(matches!(err, ServiceError::NoReferenceImages));
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn remove_background_normalizes_to_png() {
    let server = MockServer::start().await;
    let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="2" height="2"><rect width="1" height="2" fill="red"/></svg>"#;
    let encoded = encode_base64(svg.as_bytes());

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(body_string_contains("Remove the background"))
        .respond_with(image_response("image/svg+xml", &encoded))
        .mount(&server)
        .await;

    let result = service_for(&server)
        .remove_background(&pixel())
        .await
        .expect("result");
    assert_eq!(result.mime_type, "image/png");
    assert_eq!(&result.bytes[0..4], &[0x89, 0x50, 0x4E, 0x47]);
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn editor_round_trip_through_http() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(image_response("image/png", PIXEL_PNG))
        .mount(&server)
        .await;

    let mut editor = Editor::default();
    editor.add_image(&pixel(), Geometry::default());

    let id = run_generation(&mut editor, &service_for(&server), "make it blue")
        .await
        .expect("new layer");

    assert!(!editor.is_busy());
    let layer = editor.document().get(id).expect("layer");
    assert!(matches!(&layer.kind, LayerKind::Image { mime_type, .. } if mime_type == "image/png"));
    let roles: Vec<Role> = editor.transcript().messages().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant]);
}

fn encode_base64(bytes: &[u8]) -> String {
    ImagePayload::new("application/octet-stream", bytes.to_vec()).to_base64()
}
