//! Structured publish logging.
//!
//! Consistent lifecycle logging for one publish attempt, with a tracing span
//! carrying the answer id.

use tracing::{error, info, warn, Span};
use vpub_models::AnswerId;

/// Logger for one publish attempt.
#[derive(Debug, Clone)]
pub struct PublishLogger {
    answer_id: String,
}

impl PublishLogger {
    pub fn new(answer_id: &AnswerId) -> Self {
        Self {
            answer_id: answer_id.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(answer_id = %self.answer_id, "Publish started: {}", message);
    }

    /// Log entry into a pipeline stage.
    pub fn log_stage(&self, stage: &str, message: &str) {
        info!(answer_id = %self.answer_id, stage = %stage, "Publish progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(answer_id = %self.answer_id, "Publish warning: {}", message);
    }

    pub fn log_error(&self, kind: &str, message: &str) {
        error!(answer_id = %self.answer_id, kind = %kind, "Publish failed: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(answer_id = %self.answer_id, "Publish completed: {}", message);
    }

    pub fn answer_id(&self) -> &str {
        &self.answer_id
    }

    /// Span covering the whole attempt.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("publish", answer_id = %self.answer_id)
    }
}
