//! Cloudflare R2 storage for HLS packages.
//!
//! This crate provides:
//! - Retry with exponential backoff (blocking and async forms)
//! - Store configuration with complete missing-variable reporting
//! - R2 client (S3 API)
//! - Recursive directory upload with HLS content types

pub mod client;
pub mod config;
pub mod content_type;
pub mod error;
pub mod retry;
pub mod uploader;

pub use client::{ObjectStore, R2Client};
pub use config::{StoreConfig, StoreSettings};
pub use content_type::content_type_for;
pub use error::{StorageError, StorageResult};
pub use retry::{retry_async, retry_blocking, Backoff, RetryPolicy, Retryable};
pub use uploader::{DirectoryUploader, ObjectUploader, R2Uploader};
