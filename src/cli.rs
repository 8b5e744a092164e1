//! CLI parser
use clap::Parser;
use std::num::NonZeroU16;
use std::path::PathBuf;

#[derive(Parser, Debug)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "FITROOM_DEBUG")]
    /// Enable debug logging. Env: FITROOM_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "5000", env = "FITROOM_PORT")]
    /// http listener port, defaults to `5000`.
    /// Env: FITROOM_PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "0.0.0.0",
        env = "FITROOM_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `0.0.0.0`.
    /// Env: FITROOM_LISTEN_ADDRESS
    pub listen_address: String,

    #[clap(required = true, long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    /// API key for the generation service. Env: GOOGLE_API_KEY
    pub google_api_key: String,

    #[clap(long, default_value = "gemini-2.0-flash-exp", env = "FITROOM_MODEL")]
    /// Multimodal generation model identifier.
    /// Env: FITROOM_MODEL
    pub model: String,

    #[clap(long, default_value = "./tryon_results", env = "FITROOM_IMAGE_DIR")]
    /// Directory where uploaded and generated images are stored.
    /// Env: FITROOM_IMAGE_DIR
    pub image_dir: PathBuf,

    #[clap(long, default_value_t = 60, env = "FITROOM_TRYON_DELAY")]
    /// Seconds to wait before each try-on generation call, `0` disables.
    /// Env: FITROOM_TRYON_DELAY
    pub tryon_delay: u64,
}
