use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::HeaderMap;
use axum::http::header::{
    CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED,
};
use axum::http::response::Builder;
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;
use httpdate::{fmt_http_date, parse_http_date};

use super::prelude::*;
use crate::constants::RESULT_CACHE_CONTROL;

/// Cache headers derived from a stored blob's metadata.
#[derive(Clone, Debug)]
struct ResultCacheHeaders {
    etag: Option<HeaderValue>,
    last_modified: Option<HeaderValue>,
    modified_at: Option<SystemTime>,
}

impl ResultCacheHeaders {
    fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        let modified_at = metadata.modified().ok();
        Self {
            etag: build_etag(metadata.len(), modified_at),
            last_modified: modified_at
                .and_then(|modified| HeaderValue::from_str(&fmt_http_date(modified)).ok()),
            modified_at,
        }
    }

    fn apply(&self, mut builder: Builder) -> Builder {
        builder = builder.header(CACHE_CONTROL, RESULT_CACHE_CONTROL.as_str());
        if let Some(etag) = &self.etag {
            builder = builder.header(ETAG, etag.clone());
        }
        if let Some(last_modified) = &self.last_modified {
            builder = builder.header(LAST_MODIFIED, last_modified.clone());
        }
        builder
    }

    /// Returns true when the request headers match a not-modified response.
    fn is_not_modified(&self, headers: &HeaderMap) -> bool {
        if let Some(if_none_match) = headers.get(IF_NONE_MATCH) {
            if let Ok(value) = if_none_match.to_str() {
                let value = value.trim();
                if value == "*" {
                    return true;
                }
                if let Some(etag) = self.etag.as_ref().and_then(|etag| etag.to_str().ok())
                    && value.split(',').any(|candidate| candidate.trim() == etag)
                {
                    return true;
                }
            }
            return false;
        }

        if let (Some(if_modified_since), Some(modified_at)) =
            (headers.get(IF_MODIFIED_SINCE), self.modified_at)
            && let Ok(value) = if_modified_since.to_str()
            && let Ok(since) = parse_http_date(value)
            && modified_at <= since
        {
            return true;
        }

        false
    }
}

fn build_etag(size: u64, modified_at: Option<SystemTime>) -> Option<HeaderValue> {
    let suffix = match modified_at {
        Some(modified) => modified
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_secs().to_string())
            .unwrap_or_else(|_| "0".to_string()),
        None => "0".to_string(),
    };
    HeaderValue::from_str(&format!("W/\"{}-{}\"", size, suffix)).ok()
}

/// handles GET /results/{filename}
///
/// Streams a stored blob back as PNG. The store rejects traversal attempts
/// and missing files alike as not-found.
pub(crate) async fn results_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> Result<Response, FitroomError> {
    let metadata = state.store.metadata(&filename).await?;
    let cache = ResultCacheHeaders::from_metadata(&metadata);

    if cache.is_not_modified(&headers) {
        let builder = cache.apply(Response::builder().status(StatusCode::NOT_MODIFIED));
        return builder.body(Body::empty()).map_err(FitroomError::from);
    }

    let bytes = state.store.get(&filename).await?;
    info!("Serving image: {}", filename);
    let builder = cache.apply(
        Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "image/png"),
    );
    builder.body(Body::from(bytes)).map_err(FitroomError::from)
}
