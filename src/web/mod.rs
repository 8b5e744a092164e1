//! HTTP surface: router, shared state and the static endpoints.

use std::num::NonZeroU16;
use std::time::Duration;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::constants::SERVICE_NAME;
use crate::genai::GenerationClient;
use crate::store::BlobStore;

mod prelude;
mod results;
mod tryon;

/// Shared state handed to every request handler.
///
/// The store and client are both cheap clones around shared handles; no
/// handler mutates them, so concurrent requests need no coordination.
#[derive(Clone, Debug)]
pub(crate) struct AppState {
    store: BlobStore,
    client: GenerationClient,
    tryon_delay: Duration,
}

impl AppState {
    fn new(store: BlobStore, client: GenerationClient, tryon_delay: Duration) -> Self {
        Self {
            store,
            client,
            tryon_delay,
        }
    }
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let api_key_status = if state.client.has_api_key() {
        "configured"
    } else {
        "missing"
    };

    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "api_key": api_key_status,
        "model": state.client.model(),
        "endpoints": [
            "/try-on - Virtual clothing try-on",
            "/generate - Text to image generation",
            "/results/<filename> - Get generated images",
        ],
    }))
}

async fn test_handler() -> impl IntoResponse {
    Json(json!({
        "message": "Backend is working!",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

fn create_router() -> Router<AppState> {
    Router::new()
        .route("/try-on", axum::routing::post(tryon::try_on_handler))
        .route("/generate", axum::routing::post(tryon::generate_handler))
        .route(
            "/results/{filename}",
            axum::routing::get(results::results_handler),
        )
        .route("/health", axum::routing::get(health_handler))
        .route("/test", axum::routing::get(test_handler))
}

/// Binds the listener and serves requests until the process exits.
pub async fn setup_server(
    listen_addr: &str,
    port: NonZeroU16,
    store: BlobStore,
    client: GenerationClient,
    tryon_delay: Duration,
) -> Result<(), anyhow::Error> {
    let app = create_router()
        .with_state(AppState::new(store, client, tryon_delay))
        .layer(CorsLayer::permissive());

    let addr = format!("{}:{}", listen_addr, port);
    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app).await {
        error!("Server error: {}", err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_NONE_MATCH};
    use axum::http::{Request, StatusCode};
    use base64::Engine;
    use base64::engine::general_purpose;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    /// Byte payload the stub generation service hands back.
    const GENERATED_BYTES: &[u8] = b"generated image bytes";

    fn png_base64() -> String {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([200, 100, 50]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut bytes, image::ImageFormat::Png)
            .expect("encode png");
        general_purpose::STANDARD.encode(bytes.into_inner())
    }

    fn generation_response_with_image() -> Value {
        json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "done"},
                        {"inlineData": {
                            "mimeType": "image/png",
                            "data": general_purpose::STANDARD.encode(GENERATED_BYTES),
                        }},
                    ]
                }
            }]
        })
    }

    /// Serves a canned generateContent response on an ephemeral port and
    /// captures the last request body it saw.
    async fn spawn_generation_stub(response: Value) -> (String, Arc<Mutex<Option<Value>>>) {
        let captured = Arc::new(Mutex::new(None));
        let capture = captured.clone();
        let app = Router::new().route(
            "/{*path}",
            axum::routing::any(move |Json(body): Json<Value>| {
                let response = response.clone();
                let capture = capture.clone();
                async move {
                    *capture.lock().await = Some(body);
                    Json(response)
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub listener");
        let addr = listener.local_addr().expect("stub local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{}", addr), captured)
    }

    async fn setup_state(api_base: &str) -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = BlobStore::open(dir.path()).await.expect("open store");
        let client = GenerationClient::new("test-key".to_string(), "test-model".to_string())
            .with_api_base(api_base);
        (AppState::new(store, client, Duration::ZERO), dir)
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("parse body as JSON")
    }

    #[tokio::test]
    async fn try_on_requires_both_images() {
        // Upstream is unreachable; validation must fail before it is called.
        let (state, _dir) = setup_state("http://127.0.0.1:1").await;
        let app = create_router().with_state(state);

        let request = json_request("/try-on", json!({"shirtImage": png_base64()}));
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["success"], json!(false));
        assert_eq!(
            body["error"],
            json!("Both shirt and user images are required")
        );
    }

    #[tokio::test]
    async fn try_on_rejects_non_json_body() {
        let (state, _dir) = setup_state("http://127.0.0.1:1").await;
        let app = create_router().with_state(state);

        let request = Request::builder()
            .method("POST")
            .uri("/try-on")
            .header(CONTENT_TYPE, "text/plain")
            .body(Body::from("shirt=yes"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["error"], json!("Request must be JSON"));
    }

    #[tokio::test]
    async fn try_on_rejects_undecodable_images() {
        let (state, _dir) = setup_state("http://127.0.0.1:1").await;
        let app = create_router().with_state(state);

        let request = json_request(
            "/try-on",
            json!({"shirtImage": "!!not-base64!!", "userImage": png_base64()}),
        );
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["success"], json!(false));
    }

    #[tokio::test]
    async fn try_on_generates_and_serves_result() {
        let (base, captured) = spawn_generation_stub(generation_response_with_image()).await;
        let (state, _dir) = setup_state(&base).await;
        let app = create_router().with_state(state);

        let request = json_request(
            "/try-on",
            json!({"shirtImage": png_base64(), "userImage": png_base64()}),
        );
        let response = app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["message"], json!("AI virtual try-on complete"));
        let image_url = body["imageUrl"].as_str().expect("imageUrl");
        assert!(image_url.starts_with("/results/generated_"));

        // The prompt plus both images went upstream as one content.
        let upstream = captured.lock().await.clone().expect("captured request");
        let parts = upstream["contents"][0]["parts"]
            .as_array()
            .expect("parts array");
        assert_eq!(parts.len(), 3);
        assert!(
            parts[0]["text"]
                .as_str()
                .expect("prompt text")
                .contains("virtual try-on")
        );
        assert!(parts[1]["inlineData"]["data"].is_string());
        assert!(parts[2]["inlineData"]["data"].is_string());

        // The returned URL resolves to the stored bytes.
        let request = Request::builder()
            .method("GET")
            .uri(image_url)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "image/png"
        );
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect image")
            .to_bytes();
        assert_eq!(bytes.as_ref(), GENERATED_BYTES);
    }

    #[tokio::test]
    async fn try_on_without_image_parts_is_500() {
        let text_only = json!({
            "candidates": [{"content": {"parts": [{"text": "cannot comply"}]}}]
        });
        let (base, _captured) = spawn_generation_stub(text_only).await;
        let (state, _dir) = setup_state(&base).await;
        let app = create_router().with_state(state);

        let request = json_request(
            "/try-on",
            json!({"shirtImage": png_base64(), "userImage": png_base64()}),
        );
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = read_json(response).await;
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"], json!("No image generated"));
    }

    #[tokio::test]
    async fn generate_falls_back_to_default_prompt() {
        let (base, captured) = spawn_generation_stub(generation_response_with_image()).await;
        let (state, _dir) = setup_state(&base).await;
        let app = create_router().with_state(state);

        let response = app
            .oneshot(json_request("/generate", json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["message"], json!("Image generated successfully!"));

        let upstream = captured.lock().await.clone().expect("captured request");
        let prompt = upstream["contents"][0]["parts"][0]["text"]
            .as_str()
            .expect("prompt text");
        assert!(prompt.contains(crate::constants::DEFAULT_GENERATE_PROMPT));
        assert!(prompt.contains("photorealistic"));
        // No input images on the generate path.
        assert_eq!(
            upstream["contents"][0]["parts"]
                .as_array()
                .expect("parts")
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn generate_forwards_the_supplied_prompt() {
        let (base, captured) = spawn_generation_stub(generation_response_with_image()).await;
        let (state, _dir) = setup_state(&base).await;
        let app = create_router().with_state(state);

        let response = app
            .oneshot(json_request("/generate", json!({"prompt": "a red hoodie"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let upstream = captured.lock().await.clone().expect("captured request");
        let prompt = upstream["contents"][0]["parts"][0]["text"]
            .as_str()
            .expect("prompt text");
        assert!(prompt.ends_with("a red hoodie"));
    }

    #[tokio::test]
    async fn results_unknown_file_returns_404() {
        let (state, _dir) = setup_state("http://127.0.0.1:1").await;
        let app = create_router().with_state(state);

        let request = Request::builder()
            .method("GET")
            .uri("/results/generated_nope.png")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = read_json(response).await;
        assert_eq!(body["error"], json!("File not found"));
    }

    #[tokio::test]
    async fn results_rejects_path_traversal() {
        let dir = tempfile::tempdir().expect("tempdir");
        // A file the traversal would reach if the filename were resolved raw.
        std::fs::write(dir.path().join("escape.png"), b"outside").expect("write outside file");
        let store = BlobStore::open(dir.path().join("blobs"))
            .await
            .expect("open store");
        let client = GenerationClient::new("test-key".to_string(), "test-model".to_string());
        let state = AppState::new(store, client, Duration::ZERO);
        let app = create_router().with_state(state);

        let request = Request::builder()
            .method("GET")
            .uri("/results/..%2Fescape.png")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = read_json(response).await;
        assert_eq!(body["error"], json!("File not found"));
    }

    #[tokio::test]
    async fn results_supports_conditional_requests() {
        let (state, _dir) = setup_state("http://127.0.0.1:1").await;
        let filename = state
            .store
            .put(b"cacheable bytes", "result")
            .await
            .expect("put blob");
        let app = create_router().with_state(state);

        let request = Request::builder()
            .method("GET")
            .uri(format!("/results/{}", filename))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response
                .headers()
                .get(CACHE_CONTROL)
                .unwrap()
                .to_str()
                .unwrap()
                .contains("immutable")
        );
        let etag = response.headers().get(ETAG).expect("etag header").clone();

        let request = Request::builder()
            .method("GET")
            .uri(format!("/results/{}", filename))
            .header(IF_NONE_MATCH, etag)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn health_reports_configured_key() {
        let (state, _dir) = setup_state("http://127.0.0.1:1").await;
        let app = create_router().with_state(state);

        let request = Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["status"], json!("healthy"));
        assert_eq!(body["api_key"], json!("configured"));
        assert_eq!(body["model"], json!("test-model"));
        assert_eq!(body["endpoints"].as_array().expect("endpoints").len(), 3);
    }

    #[tokio::test]
    async fn health_reports_missing_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = BlobStore::open(dir.path()).await.expect("open store");
        let client = GenerationClient::new(String::new(), "test-model".to_string());
        let state = AppState::new(store, client, Duration::ZERO);
        let app = create_router().with_state(state);

        let request = Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["api_key"], json!("missing"));
    }

    #[tokio::test]
    async fn test_endpoint_reports_liveness() {
        let (state, _dir) = setup_state("http://127.0.0.1:1").await;
        let app = create_router().with_state(state);

        let request = Request::builder()
            .method("GET")
            .uri("/test")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["message"], json!("Backend is working!"));
        assert!(body["timestamp"].is_string());
    }
}
