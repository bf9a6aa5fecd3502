//! One-shot publish binary.
//!
//! Usage: `vpub-publish <answer-id>`

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vpub_media::HlsPackager;
use vpub_models::{Answer, AnswerId};
use vpub_publish::{InMemoryAnswerStore, PublishConfig, Publisher};
use vpub_storage::{R2Uploader, StoreSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vpub=info,info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }

    let answer_id = std::env::args()
        .nth(1)
        .map(AnswerId::from_string)
        .context("usage: vpub-publish <answer-id>")?;

    let config = PublishConfig::from_env();
    info!("Publish config: {:?}", config);

    let settings = StoreSettings::from_env();
    if let Err(e) = settings.validate() {
        warn!("{}; the upload stage will fail", e);
    }

    let repository = match &config.seed_path {
        Some(path) => InMemoryAnswerStore::from_json_file(path).await?,
        None => {
            // No store to read from: publish a READY answer at the default source path.
            info!(
                "ANSWERS_SEED_PATH not set, expecting source at {}",
                vpub_models::default_source_path(&config.media_root, &answer_id).display()
            );
            InMemoryAnswerStore::from_answers([Answer::new(
                answer_id.clone(),
                answer_id.to_string(),
                answer_id.to_string(),
            )])
        }
    };

    let mut packager = HlsPackager::new();
    if let Some(secs) = config.transcode_timeout_secs {
        packager = packager.with_timeout(secs);
    }
    let uploader = R2Uploader::new(settings).with_max_concurrency(config.upload_max_concurrency);

    let publisher = Publisher::new(
        Arc::new(repository),
        Arc::new(packager),
        Arc::new(uploader),
        config,
    );

    let published = publisher
        .publish(&answer_id)
        .await
        .with_context(|| format!("failed to publish answer {}", answer_id))?;

    println!("Public HLS URL: {}", published.url);
    Ok(())
}
