//! Per-attempt scratch directory.

use std::path::Path;

use tempfile::TempDir;
use tracing::{debug, warn};
use vpub_models::AnswerId;

/// Uniquely named temporary directory holding one attempt's HLS output.
///
/// Removed by [`Workspace::close`] on normal paths and by `Drop` otherwise,
/// including while unwinding.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create `hls_{id}_XXXXXX` under `parent`, creating `parent` if needed.
    pub async fn create(parent: &Path, id: &AnswerId) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(parent).await?;

        let parent = parent.to_path_buf();
        let prefix = format!("hls_{}_", id);
        let dir = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new().prefix(&prefix).tempdir_in(&parent)
        })
        .await
        .map_err(std::io::Error::other)??;

        debug!("Created workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the directory and everything in it.
    ///
    /// Failure is logged and otherwise ignored.
    pub async fn close(self) {
        let path = self.dir.path().to_path_buf();
        let dir = self.dir;
        let removed = tokio::task::spawn_blocking(move || dir.close())
            .await
            .map_err(std::io::Error::other)
            .and_then(|result| result);

        match removed {
            Ok(()) => debug!("Removed workspace {}", path.display()),
            Err(e) => {
                warn!("Failed to remove workspace {}: {}", path.display(), e);
                crate::metrics::record_cleanup_failure();
            }
        }
    }
}
