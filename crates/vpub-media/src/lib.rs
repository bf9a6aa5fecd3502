//! FFmpeg CLI wrapper for HLS packaging.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - Child process execution with full stdout/stderr capture
//! - Optional timeout that kills the child process
//! - The fixed HLS packaging profile used for answer videos

pub mod command;
pub mod error;
pub mod packager;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner, ProcessOutput};
pub use error::{MediaError, MediaResult};
pub use packager::{HlsPackager, HlsProfile, MediaPackager};
