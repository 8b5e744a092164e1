use axum::extract::rejection::JsonRejection;

use super::prelude::*;
use crate::constants::{
    DEFAULT_GENERATE_PROMPT, FIRST_RESULT_INDEX, GENERATE_BASE_PROMPT, TRYON_PROMPT,
};
use crate::imaging;

#[derive(Deserialize, Default)]
#[serde(default)]
pub(crate) struct TryOnRequest {
    #[serde(rename = "shirtImage")]
    shirt_image: String,
    #[serde(rename = "userImage")]
    user_image: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub(crate) struct GenerateRequest {
    prompt: Option<String>,
}

#[derive(Serialize, Debug)]
pub(crate) struct GenerationResponse {
    pub(crate) success: bool,
    #[serde(rename = "imageUrl")]
    pub(crate) image_url: String,
    pub(crate) message: String,
}

impl GenerationResponse {
    fn for_result(filename: &str, message: &str) -> Self {
        Self {
            success: true,
            image_url: format!("/results/{}", filename),
            message: message.to_string(),
        }
    }
}

/// handles POST /try-on
///
/// Validate -> persist inputs -> delay -> invoke the model -> persist the
/// first output -> respond with its retrieval URL.
pub(crate) async fn try_on_handler(
    State(state): State<AppState>,
    payload: Result<Json<TryOnRequest>, JsonRejection>,
) -> Result<Json<GenerationResponse>, FitroomError> {
    info!("Received new try-on request");
    let Json(request) =
        payload.map_err(|_| FitroomError::BadRequest("Request must be JSON".to_string()))?;

    if request.shirt_image.is_empty() || request.user_image.is_empty() {
        return Err(FitroomError::BadRequest(
            "Both shirt and user images are required".to_string(),
        ));
    }

    let shirt_bytes = imaging::decode_image_bytes(&request.shirt_image)?;
    let user_bytes = imaging::decode_image_bytes(&request.user_image)?;

    // Inputs go to disk before the model sees them, for audit/debugging.
    let shirt_file = state.store.put(&shirt_bytes, "shirt").await?;
    info!("Shirt image saved: {}", shirt_file);
    let user_file = state.store.put(&user_bytes, "user").await?;
    info!("User image saved: {}", user_file);

    if !state.tryon_delay.is_zero() {
        tokio::time::sleep(state.tryon_delay).await;
    }

    info!("Calling {} with multi-image input...", state.client.model());
    let generated = state
        .client
        .generate(TRYON_PROMPT, &[user_bytes, shirt_bytes])
        .await?;
    let result = generated
        .get(FIRST_RESULT_INDEX)
        .ok_or_else(|| FitroomError::Generation("No image generated".to_string()))?;

    let filename = state.store.put(result, "generated").await?;
    Ok(Json(GenerationResponse::for_result(
        &filename,
        "AI virtual try-on complete",
    )))
}

/// handles POST /generate
///
/// A missing or malformed body behaves like a missing prompt; the default
/// prompt stands in.
pub(crate) async fn generate_handler(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerationResponse>, FitroomError> {
    let request = payload.map(|Json(request)| request).unwrap_or_default();
    let user_prompt = request
        .prompt
        .unwrap_or_else(|| DEFAULT_GENERATE_PROMPT.to_string());
    let full_prompt = format!("{}{}", GENERATE_BASE_PROMPT, user_prompt);

    info!("Generating image with prompt: {}", full_prompt);
    let generated = state.client.generate(&full_prompt, &[]).await?;
    let image = generated
        .get(FIRST_RESULT_INDEX)
        .ok_or_else(|| FitroomError::Generation("No image generated".to_string()))?;

    let filename = state.store.put(image, "generated").await?;
    info!("Generated image saved as {}", filename);
    Ok(Json(GenerationResponse::for_result(
        &filename,
        "Image generated successfully!",
    )))
}
