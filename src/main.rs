use std::time::Duration;

use clap::Parser;
use fitroom::config::setup_logging;
use fitroom::genai::GenerationClient;
use fitroom::store::BlobStore;
use tracing::{error, info};

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = fitroom::cli::CliOptions::parse();

    if setup_logging(cli.debug).is_err() {
        return;
    }

    // clap rejects a missing key; an empty value set via env is just as fatal.
    if cli.google_api_key.trim().is_empty() {
        error!("GOOGLE_API_KEY is set but empty");
        return;
    }

    let store = match BlobStore::open(&cli.image_dir).await {
        Ok(store) => store,
        Err(err) => {
            error!(
                "Failed to prepare image directory {}: {:?}",
                cli.image_dir.display(),
                err
            );
            return;
        }
    };

    let client = GenerationClient::new(cli.google_api_key, cli.model.clone());

    info!("Starting image generation relay with model {}", cli.model);
    if let Err(err) = fitroom::web::setup_server(
        &cli.listen_address,
        cli.port,
        store,
        client,
        Duration::from_secs(cli.tryon_delay),
    )
    .await
    {
        error!("Application error: {}", err);
    }
}
