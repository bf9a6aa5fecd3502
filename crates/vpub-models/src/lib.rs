//! Shared data models for the video publish pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Answers (the publishable item) and their lifecycle status
//! - The published result handed back to callers
//! - Remote object layout helpers

pub mod answer;
pub mod layout;

pub use answer::{Answer, AnswerId, AnswerStatus, PublishedAnswer};
pub use layout::{default_source_path, master_manifest_key, remote_prefix, MASTER_MANIFEST_NAME};
