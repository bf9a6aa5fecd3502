//! Application state.

use std::sync::Arc;

use tracing::{info, warn};
use vpub_media::HlsPackager;
use vpub_publish::{InMemoryAnswerStore, PublishConfig, Publisher};
use vpub_storage::{R2Uploader, StoreSettings};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub publisher: Arc<Publisher>,
    pub store_settings: StoreSettings,
}

impl AppState {
    pub fn new(config: ApiConfig, publisher: Arc<Publisher>, store_settings: StoreSettings) -> Self {
        Self {
            config,
            publisher,
            store_settings,
        }
    }

    /// Build the production stack from the environment.
    ///
    /// Missing object store settings are only warned about here; each publish
    /// reports them as a misconfiguration.
    pub async fn from_env(config: ApiConfig) -> anyhow::Result<Self> {
        let publish_config = PublishConfig::from_env();
        info!("Publish config: {:?}", publish_config);

        let repository = match &publish_config.seed_path {
            Some(path) => InMemoryAnswerStore::from_json_file(path).await?,
            None => {
                warn!("ANSWERS_SEED_PATH not set, starting with an empty answer store");
                InMemoryAnswerStore::new()
            }
        };

        let store_settings = StoreSettings::from_env();
        if let Err(e) = store_settings.validate() {
            warn!("{}", e);
        }

        let mut packager = HlsPackager::new();
        if let Some(secs) = publish_config.transcode_timeout_secs {
            packager = packager.with_timeout(secs);
        }

        let uploader = R2Uploader::new(store_settings.clone())
            .with_max_concurrency(publish_config.upload_max_concurrency);

        let publisher = Publisher::new(
            Arc::new(repository),
            Arc::new(packager),
            Arc::new(uploader),
            publish_config,
        );

        Ok(Self::new(config, Arc::new(publisher), store_settings))
    }
}
