//! Recursive directory upload.

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use metrics::histogram;
use tracing::{error, info};
use vpub_models::{master_manifest_key, MASTER_MANIFEST_NAME};
use walkdir::WalkDir;

use crate::client::{ObjectStore, R2Client};
use crate::config::{public_url, StoreConfig, StoreSettings};
use crate::content_type::content_type_for;
use crate::error::{StorageError, StorageResult};
use crate::retry::{retry_async, RetryPolicy};

/// Default number of files uploaded at the same time.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Metric name for whole-directory upload latency.
pub const UPLOAD_DURATION_SECONDS: &str = "vpub_upload_duration_seconds";

/// Uploads a packaged directory and returns the public manifest URL.
#[async_trait]
pub trait ObjectUploader: Send + Sync {
    async fn upload_dir(&self, local_dir: &Path, remote_prefix: &str) -> StorageResult<String>;
}

/// One file scheduled for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadEntry {
    pub path: PathBuf,
    pub key: String,
    pub content_type: String,
}

/// Uploads every file under a directory to an [`ObjectStore`].
pub struct DirectoryUploader<S> {
    store: S,
    public_base_url: String,
    policy: RetryPolicy,
    max_concurrency: usize,
}

impl DirectoryUploader<R2Client> {
    /// Uploader backed by R2.
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(R2Client::new(config), config.public_base_url.clone())
    }
}

impl<S: ObjectStore> DirectoryUploader<S> {
    pub fn new(store: S, public_base_url: impl Into<String>) -> Self {
        Self {
            store,
            public_base_url: public_base_url.into(),
            policy: RetryPolicy::upload_default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Override the per-file retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn upload_entry(&self, entry: UploadEntry) -> StorageResult<()> {
        retry_async(&self.policy, "put_object", || {
            self.store.put_file(&entry.path, &entry.key, &entry.content_type)
        })
        .await
        .map_err(|e| {
            error!(key = %entry.key, "Giving up on upload: {}", e);
            StorageError::upload_failed(&entry.key, e)
        })
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectUploader for DirectoryUploader<S> {
    async fn upload_dir(&self, local_dir: &Path, remote_prefix: &str) -> StorageResult<String> {
        ensure_dir(local_dir)?;

        let started = Instant::now();
        let entries = collect_entries(local_dir, remote_prefix)?;
        let file_count = entries.len();

        info!(
            "Uploading {} files from {} to prefix {}",
            file_count,
            local_dir.display(),
            remote_prefix
        );

        // The first exhausted file ends the stream; nothing new is started after it.
        stream::iter(entries)
            .map(|entry| self.upload_entry(entry))
            .buffer_unordered(self.max_concurrency)
            .try_collect::<Vec<()>>()
            .await?;

        if !local_dir.join(MASTER_MANIFEST_NAME).is_file() {
            return Err(StorageError::invariant(format!(
                "{} not found in {}",
                MASTER_MANIFEST_NAME,
                local_dir.display()
            )));
        }

        histogram!(UPLOAD_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

        let url = public_url(&self.public_base_url, &master_manifest_key(remote_prefix));
        info!("Uploaded {} files, public manifest URL: {}", file_count, url);
        Ok(url)
    }
}

/// R2 uploader that reads its configuration when an upload starts.
///
/// Missing settings surface as [`StorageError::MisconfiguredStore`] from
/// `upload_dir`, before any network call, instead of at process start.
pub struct R2Uploader {
    settings: StoreSettings,
    policy: RetryPolicy,
    max_concurrency: usize,
}

impl R2Uploader {
    pub fn new(settings: StoreSettings) -> Self {
        Self {
            settings,
            policy: RetryPolicy::upload_default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn from_env() -> Self {
        Self::new(StoreSettings::from_env())
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }
}

#[async_trait]
impl ObjectUploader for R2Uploader {
    async fn upload_dir(&self, local_dir: &Path, remote_prefix: &str) -> StorageResult<String> {
        ensure_dir(local_dir)?;

        let config = self.settings.validate().inspect_err(|e| error!("{}", e))?;

        DirectoryUploader::from_config(&config)
            .with_policy(self.policy.clone())
            .with_max_concurrency(self.max_concurrency)
            .upload_dir(local_dir, remote_prefix)
            .await
    }
}

fn ensure_dir(local_dir: &Path) -> StorageResult<()> {
    if local_dir.is_dir() {
        Ok(())
    } else {
        Err(StorageError::NotFound(local_dir.to_path_buf()))
    }
}

/// Enumerate regular files under `local_dir` with their remote keys.
///
/// Keys always use `/` separators. Order is by file name within each directory.
pub fn collect_entries(local_dir: &Path, remote_prefix: &str) -> StorageResult<Vec<UploadEntry>> {
    let prefix = remote_prefix.trim_matches('/');
    let mut entries = Vec::new();

    for entry in WalkDir::new(local_dir).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(local_dir)
            .map_err(|_| StorageError::invariant(format!("{} escaped upload root", entry.path().display())))?;

        let relative_key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let key = if prefix.is_empty() {
            relative_key
        } else {
            format!("{}/{}", prefix, relative_key)
        };

        entries.push(UploadEntry {
            path: entry.path().to_path_buf(),
            key,
            content_type: content_type_for(entry.path()),
        });
    }

    Ok(entries)
}
