//! Answer persistence port and the in-memory store used by the binaries.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};
use vpub_models::{Answer, AnswerId, AnswerStatus};

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Failed to read seed file {path}: {source}")]
    SeedRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid seed data: {0}")]
    SeedParse(#[from] serde_json::Error),
}

impl RepositoryError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Where publish state is read from and written to.
#[async_trait]
pub trait AnswerRepository: Send + Sync {
    /// Load an answer, `None` if it does not exist.
    async fn load_by_id(&self, id: &AnswerId) -> RepositoryResult<Option<Answer>>;

    /// Set the status and, where given, the URLs. Returns `false` if the
    /// answer does not exist.
    async fn update_status_and_urls(
        &self,
        id: &AnswerId,
        status: AnswerStatus,
        manifest_url: Option<&str>,
        video_url: Option<&str>,
    ) -> RepositoryResult<bool>;
}

/// In-process answer store.
#[derive(Debug, Default)]
pub struct InMemoryAnswerStore {
    answers: RwLock<HashMap<AnswerId, Answer>>,
}

impl InMemoryAnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_answers(answers: impl IntoIterator<Item = Answer>) -> Self {
        let answers = answers.into_iter().map(|a| (a.id.clone(), a)).collect();
        Self {
            answers: RwLock::new(answers),
        }
    }

    /// Load answers from a JSON array file.
    pub async fn from_json_file(path: impl AsRef<Path>) -> RepositoryResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| RepositoryError::SeedRead {
                path: path.to_path_buf(),
                source,
            })?;
        let answers: Vec<Answer> = serde_json::from_slice(&bytes)?;

        info!("Seeded {} answers from {}", answers.len(), path.display());
        Ok(Self::from_answers(answers))
    }

    /// Insert or replace an answer.
    pub async fn insert(&self, answer: Answer) {
        self.answers.write().await.insert(answer.id.clone(), answer);
    }

    pub async fn len(&self) -> usize {
        self.answers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.answers.read().await.is_empty()
    }
}

#[async_trait]
impl AnswerRepository for InMemoryAnswerStore {
    async fn load_by_id(&self, id: &AnswerId) -> RepositoryResult<Option<Answer>> {
        Ok(self.answers.read().await.get(id).cloned())
    }

    async fn update_status_and_urls(
        &self,
        id: &AnswerId,
        status: AnswerStatus,
        manifest_url: Option<&str>,
        video_url: Option<&str>,
    ) -> RepositoryResult<bool> {
        let mut answers = self.answers.write().await;
        let Some(answer) = answers.get_mut(id) else {
            return Ok(false);
        };

        answer.apply_status(status, manifest_url, video_url);
        debug!(answer_id = %id, status = %status, "Answer status updated");
        Ok(true)
    }
}
