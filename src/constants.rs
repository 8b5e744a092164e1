//! Shared constants for prompts, result policy and response caching
//!

use std::sync::LazyLock;

/// Service name reported by the health endpoint.
pub const SERVICE_NAME: &str = "AI Image Generation Service";

/// Instruction block sent to the model with every try-on request. The
/// pose/clarity validation in here is advisory text to the model only; the
/// service performs no independent check of the output.
pub const TRYON_PROMPT: &str = r#"
{
  "task": "virtual try-on",
  "instructions": [
    "Use the provided person image as the base. Do not redraw or regenerate the person.",
    "Overlay and integrate the provided garment image onto the person.",
    "Do not change the person's pose, body proportions, face, or hair.",
    "Do not change the background or lighting.",
    "Do not generate a new background (no white or artificial background).",
    "Maintain original resolution, camera angle, and style."
  ],
  "validation": "if the image of the person is not in front pose or it is unclear or blur, then do not generate the output",
  "output": {
    "image": "Realistic final image of the same person wearing the garment, with background unchanged."
  }
}
"#;

/// Base prompt prepended to every text-to-image request.
pub const GENERATE_BASE_PROMPT: &str = r#"Generate a high-quality, photorealistic image of a Requested garment in a white clear background
- clear and front view of the garment
- Excellent fabric texture and details
- Professional product photography quality
- Clean background
- Well-lit with studio lighting
Specific requirements: "#;

/// Prompt used when a generate request carries no prompt of its own.
pub const DEFAULT_GENERATE_PROMPT: &str = "A futuristic city";

/// Which of the returned images is surfaced to the caller when the model
/// returns more than one. Always the first; the rest are stored nowhere.
pub const FIRST_RESULT_INDEX: usize = 0;

/// Max age (in seconds) for served result images.
pub const RESULT_CACHE_MAX_AGE_SECONDS: u64 = 60 * 60 * 24;

/// Cache-Control value for result image responses. Stored blobs are
/// write-once, so clients may treat them as immutable.
pub static RESULT_CACHE_CONTROL: LazyLock<String> = LazyLock::new(|| {
    format!(
        "public, max-age={}, immutable",
        RESULT_CACHE_MAX_AGE_SECONDS
    )
});
