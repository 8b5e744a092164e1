//! Error handling

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::{error, info};

/// definitions for the fitroom application.
#[derive(Debug)]
pub enum FitroomError {
    /// When the request body doesn't hold what it should
    BadRequest(String),
    /// Bad base64 or bytes that don't load as an image
    Decode(String),
    /// When the generation call fails or produces no image
    Generation(String),
    /// When a requested blob is not found
    NotFound(String),
    /// When an internal server error occurs
    InternalServerError(String),
}

impl From<std::io::Error> for FitroomError {
    fn from(err: std::io::Error) -> Self {
        FitroomError::InternalServerError(err.to_string())
    }
}

impl From<axum::http::Error> for FitroomError {
    fn from(err: axum::http::Error) -> Self {
        FitroomError::InternalServerError(err.to_string())
    }
}

impl From<base64::DecodeError> for FitroomError {
    fn from(err: base64::DecodeError) -> Self {
        FitroomError::Decode(format!("Invalid base64 image data: {}", err))
    }
}

impl From<image::ImageError> for FitroomError {
    fn from(err: image::ImageError) -> Self {
        FitroomError::Decode(format!("Unsupported image data: {}", err))
    }
}

impl From<reqwest::Error> for FitroomError {
    fn from(err: reqwest::Error) -> Self {
        FitroomError::Generation(err.to_string())
    }
}

fn envelope(status: StatusCode, message: String) -> axum::response::Response {
    (status, Json(json!({"success": false, "error": message}))).into_response()
}

impl IntoResponse for FitroomError {
    fn into_response(self) -> axum::response::Response {
        match self {
            FitroomError::BadRequest(message) => {
                info!("Bad request: {}", message);
                envelope(StatusCode::BAD_REQUEST, message)
            }
            FitroomError::Decode(message) => {
                info!("Image decode failure: {}", message);
                envelope(StatusCode::BAD_REQUEST, message)
            }
            FitroomError::Generation(message) => {
                error!("Generation failed: {}", message);
                envelope(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            FitroomError::NotFound(filename) => {
                error!("File not found: {}", filename);
                (
                    StatusCode::NOT_FOUND,
                    Json(json!({"error": "File not found"})),
                )
                    .into_response()
            }
            FitroomError::InternalServerError(message) => {
                error!("Internal server error: {}", message);
                envelope(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        }
    }
}
