//! Publisher configuration.

use std::path::PathBuf;

use vpub_storage::uploader::DEFAULT_MAX_CONCURRENCY;

const MIB: u64 = 1024 * 1024;

/// Publisher configuration.
#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// Root of the `answers/{id}.mp4` source layout
    pub media_root: PathBuf,
    /// Parent directory for per-attempt workspaces
    pub work_dir: PathBuf,
    /// Largest source file accepted, in bytes
    pub max_source_bytes: u64,
    /// Kill the transcoder after this many seconds (no limit when unset)
    pub transcode_timeout_secs: Option<u64>,
    /// Files uploaded at the same time
    pub upload_max_concurrency: usize,
    /// JSON file of answers loaded into the in-memory store
    pub seed_path: Option<PathBuf>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            media_root: PathBuf::from("/media"),
            work_dir: std::env::temp_dir(),
            max_source_bytes: 20 * MIB,
            transcode_timeout_secs: None,
            upload_max_concurrency: DEFAULT_MAX_CONCURRENCY,
            seed_path: None,
        }
    }
}

impl PublishConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            media_root: std::env::var("PUBLISH_MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.media_root),
            work_dir: std::env::var("PUBLISH_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            max_source_bytes: std::env::var("PUBLISH_MAX_SOURCE_MB")
                .ok()
                .and_then(|s| mib_to_bytes(&s))
                .unwrap_or(defaults.max_source_bytes),
            transcode_timeout_secs: std::env::var("PUBLISH_TRANSCODE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0),
            upload_max_concurrency: std::env::var("UPLOAD_MAX_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.upload_max_concurrency),
            seed_path: std::env::var("ANSWERS_SEED_PATH").ok().map(PathBuf::from),
        }
    }

    pub fn with_media_root(mut self, media_root: impl Into<PathBuf>) -> Self {
        self.media_root = media_root.into();
        self
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_max_source_bytes(mut self, bytes: u64) -> Self {
        self.max_source_bytes = bytes;
        self
    }
}

/// Parse a size in MiB. Values that do not fit in bytes are rejected.
fn mib_to_bytes(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()?.checked_mul(MIB)
}
