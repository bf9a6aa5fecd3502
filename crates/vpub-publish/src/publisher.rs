//! Publish orchestration.
//!
//! One call to [`Publisher::publish`] takes a `READY` answer through HLS
//! packaging and upload to `LIVE`, or leaves it in `ERROR`. The answer is
//! claimed for the whole attempt, so a concurrent second call for the same id
//! is rejected instead of repeating the work. Every attempt that gets past the
//! request checks runs inside a [`Workspace`] that is gone before `publish`
//! returns.

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use futures::FutureExt;
use tracing::{error, warn, Instrument};
use vpub_media::MediaPackager;
use vpub_models::{default_source_path, remote_prefix, Answer, AnswerId, AnswerStatus, PublishedAnswer};
use vpub_storage::ObjectUploader;

use crate::config::PublishConfig;
use crate::error::{PublishError, PublishResult};
use crate::logging::PublishLogger;
use crate::metrics;
use crate::repository::AnswerRepository;
use crate::workspace::Workspace;

/// Answer ids with a publish attempt in flight.
#[derive(Debug, Default)]
struct ClaimRegistry {
    in_flight: Mutex<HashSet<AnswerId>>,
}

impl ClaimRegistry {
    fn claim(&self, id: &AnswerId) -> Option<ClaimGuard<'_>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(id.clone()) {
            return None;
        }
        Some(ClaimGuard {
            registry: self,
            id: id.clone(),
        })
    }
}

/// Releases the claim when the attempt ends, however it ends.
struct ClaimGuard<'a> {
    registry: &'a ClaimRegistry,
    id: AnswerId,
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        self.registry
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

/// Publishes answers.
pub struct Publisher {
    repository: Arc<dyn AnswerRepository>,
    packager: Arc<dyn MediaPackager>,
    uploader: Arc<dyn ObjectUploader>,
    config: PublishConfig,
    claims: ClaimRegistry,
}

impl Publisher {
    pub fn new(
        repository: Arc<dyn AnswerRepository>,
        packager: Arc<dyn MediaPackager>,
        uploader: Arc<dyn ObjectUploader>,
        config: PublishConfig,
    ) -> Self {
        Self {
            repository,
            packager,
            uploader,
            config,
            claims: ClaimRegistry::default(),
        }
    }

    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    pub fn repository(&self) -> &Arc<dyn AnswerRepository> {
        &self.repository
    }

    /// Publish one answer.
    ///
    /// Never panics and never leaves the answer in an intermediate state. The
    /// error, when there is one, has already been persisted if its kind
    /// calls for it (see [`PublishError::persists_error`]).
    pub async fn publish(&self, id: &AnswerId) -> PublishResult<PublishedAnswer> {
        let logger = PublishLogger::new(id);
        let span = logger.create_span();

        async move {
            let started = Instant::now();
            logger.log_start("publish requested");

            let result = self.publish_claimed(id, &logger).await;

            let outcome = match &result {
                Ok(published) => {
                    logger.log_completion(&format!("answer is LIVE at {}", published.url));
                    "live"
                }
                Err(e) => {
                    logger.log_error(e.kind(), &e.to_string());
                    e.kind()
                }
            };
            metrics::record_attempt(outcome, started.elapsed().as_secs_f64());

            result
        }
        .instrument(span)
        .await
    }

    async fn publish_claimed(
        &self,
        id: &AnswerId,
        logger: &PublishLogger,
    ) -> PublishResult<PublishedAnswer> {
        // Claimed before the status is read, so the READY seen below cannot
        // belong to an attempt that is still running.
        let _claim = self
            .claims
            .claim(id)
            .ok_or_else(|| PublishError::precondition("publish already in progress"))?;

        let answer = self
            .repository
            .load_by_id(id)
            .await?
            .ok_or_else(|| PublishError::AnswerNotFound(id.clone()))?;

        if !answer.status.can_publish() {
            return Err(PublishError::precondition(format!(
                "answer is {}, not READY",
                answer.status
            )));
        }

        let result = match self.attempt(&answer, logger).await {
            Ok(url) => self.mark_live(id, &url).await.map(|()| PublishedAnswer::live(url)),
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            if e.persists_error() {
                self.mark_error(id, logger).await;
            }
        }

        result
    }

    /// Everything between the status check and the final write.
    async fn attempt(&self, answer: &Answer, logger: &PublishLogger) -> PublishResult<String> {
        let source = self.source_path(answer);

        let size = match tokio::fs::metadata(&source).await {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => return Err(PublishError::SourceNotFound(source)),
        };

        if size > self.config.max_source_bytes {
            return Err(PublishError::PayloadTooLarge {
                size,
                limit: self.config.max_source_bytes,
            });
        }

        let workspace = Workspace::create(&self.config.work_dir, &answer.id).await?;

        let outcome = AssertUnwindSafe(self.run_stages(&answer.id, &source, workspace.path(), logger))
            .catch_unwind()
            .await;

        workspace.close().await;

        outcome.unwrap_or_else(|panic| {
            Err(PublishError::unexpected(format!(
                "publish pipeline panicked: {}",
                panic_message(panic.as_ref())
            )))
        })
    }

    async fn run_stages(
        &self,
        id: &AnswerId,
        source: &Path,
        out_dir: &Path,
        logger: &PublishLogger,
    ) -> PublishResult<String> {
        logger.log_stage("transcoding", &format!("packaging {}", source.display()));
        let manifest = self.packager.package(source, out_dir).await?;

        let prefix = remote_prefix(id);
        logger.log_stage(
            "uploading",
            &format!("uploading {} to {}", manifest.display(), prefix),
        );
        let url = self.uploader.upload_dir(out_dir, &prefix).await?;

        Ok(url)
    }

    fn source_path(&self, answer: &Answer) -> PathBuf {
        answer
            .source_media_path
            .clone()
            .unwrap_or_else(|| default_source_path(&self.config.media_root, &answer.id))
    }

    async fn mark_live(&self, id: &AnswerId, url: &str) -> PublishResult<()> {
        let updated = self
            .repository
            .update_status_and_urls(id, AnswerStatus::Live, Some(url), Some(url))
            .await?;

        if !updated {
            return Err(PublishError::unexpected(format!(
                "answer {} disappeared before it could be marked LIVE",
                id
            )));
        }
        Ok(())
    }

    /// Best effort: a failure here is logged and the publish error is returned as is.
    async fn mark_error(&self, id: &AnswerId, logger: &PublishLogger) {
        match self
            .repository
            .update_status_and_urls(id, AnswerStatus::Error, None, None)
            .await
        {
            Ok(true) => {}
            Ok(false) => logger.log_warning("answer vanished before ERROR could be recorded"),
            Err(e) => error!(answer_id = %id, "Failed to persist ERROR status: {}", e),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        warn!("Publish pipeline panicked with a non-string payload");
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_is_exclusive_until_dropped() {
        let registry = ClaimRegistry::default();
        let id = AnswerId::from("a");

        let first = registry.claim(&id);
        assert!(first.is_some());
        assert!(registry.claim(&id).is_none());
        assert!(registry.claim(&AnswerId::from("b")).is_some());

        drop(first);
        assert!(registry.claim(&id).is_some());
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");

        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");

        let boxed: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
