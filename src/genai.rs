//! Client for a multimodal image-generation service.
//!
//! Speaks the `generateContent` REST API: the prompt and any input images
//! go up as one content with text and inline-data parts, and every inline
//! image part of the reply comes back as raw bytes.

use base64::Engine;
use base64::engine::general_purpose;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::FitroomError;

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Handle on the external generation service.
///
/// Holds a single connection pool and no mutable state, so one instance is
/// shared by every request handler. Calls block their request until the
/// service responds; there is no retry and no timeout beyond the client
/// library default.
#[derive(Clone, Debug)]
pub struct GenerationClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

/// Request body for POST /v1beta/models/{model}:generateContent
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_modalities: Vec<&'a str>,
}

#[derive(Serialize, Debug)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RequestPart<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData<'a>>,
}

impl<'a> RequestPart<'a> {
    fn text(text: &'a str) -> Self {
        Self {
            text: Some(text),
            inline_data: None,
        }
    }

    fn inline_png(bytes: &[u8]) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: "image/png",
                data: general_purpose::STANDARD.encode(bytes),
            }),
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Deserialize, Debug)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<ResponseInlineData>,
}

#[derive(Deserialize, Debug)]
struct ResponseInlineData {
    data: String,
}

impl GenerationClient {
    /// Builds a client for `model` authenticated with `api_key`.
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            api_key,
            model,
        }
    }

    /// Overrides the API base URL, for proxies and tests.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// True when a non-empty API key was supplied.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// The configured model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends `prompt` and any input images to the model, requesting mixed
    /// text/image output, and returns every inline image part of the first
    /// candidate in the order the service produced them.
    ///
    /// Fails with [`FitroomError::Generation`] when the call errors, the
    /// body doesn't parse, or no image part comes back.
    pub async fn generate(
        &self,
        prompt: &str,
        images: &[Vec<u8>],
    ) -> Result<Vec<Vec<u8>>, FitroomError> {
        let mut parts = vec![RequestPart::text(prompt)];
        for image in images {
            parts.push(RequestPart::inline_png(image));
        }
        let req_body = GenerateContentRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                response_modalities: vec!["TEXT", "IMAGE"],
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        );
        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&req_body)
            .send()
            .await
            .map_err(|err| {
                FitroomError::Generation(format!("Generation request failed: {err}"))
            })?;

        let status = resp.status();
        let bytes = resp.bytes().await.map_err(|err| {
            FitroomError::Generation(format!("Failed reading generation response: {err}"))
        })?;
        if !status.is_success() {
            return Err(FitroomError::Generation(format!(
                "Generation API error {status}: {}",
                String::from_utf8_lossy(&bytes)
            )));
        }

        let parsed: GenerateContentResponse = serde_json::from_slice(&bytes).map_err(|err| {
            FitroomError::Generation(format!("Failed to parse generation response: {err}"))
        })?;

        let outputs = extract_inline_images(&parsed)?;
        if outputs.is_empty() {
            return Err(FitroomError::Generation("No image generated".to_string()));
        }
        info!("Generation returned {} image part(s)", outputs.len());
        Ok(outputs)
    }
}

/// Pulls every inline image out of the first candidate, in service order.
/// Text parts are logged and dropped.
fn extract_inline_images(
    response: &GenerateContentResponse,
) -> Result<Vec<Vec<u8>>, FitroomError> {
    let mut images = Vec::new();
    let parts = response
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .map(|content| content.parts.as_slice())
        .unwrap_or_default();
    for part in parts {
        if let Some(text) = part.text.as_deref() {
            debug!("Generation text part: {}", text);
        }
        if let Some(inline) = &part.inline_data {
            let bytes = general_purpose::STANDARD.decode(&inline.data).map_err(|err| {
                FitroomError::Generation(format!("Generated image was not valid base64: {err}"))
            })?;
            images.push(bytes);
        }
    }
    Ok(images)
}
