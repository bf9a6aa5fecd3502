//! Publish orchestrator.
//!
//! This crate provides:
//! - `Publisher`: READY → LIVE / ERROR state machine over one answer
//! - `AnswerRepository` persistence port and an in-memory store
//! - Scoped per-attempt workspaces
//! - Publish logging and metrics

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod publisher;
pub mod repository;
pub mod workspace;

pub use config::PublishConfig;
pub use error::{PublishError, PublishResult};
pub use logging::PublishLogger;
pub use publisher::Publisher;
pub use repository::{AnswerRepository, InMemoryAnswerStore, RepositoryError, RepositoryResult};
pub use workspace::Workspace;
