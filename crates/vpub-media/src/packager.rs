//! HLS packaging of a single MP4 source.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{error, info};
use vpub_models::MASTER_MANIFEST_NAME;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Segment file name template, relative to the output directory.
pub const SEGMENT_TEMPLATE: &str = "v0_%05d.ts";

/// Something that turns a source video into an HLS package inside `out_dir`.
#[async_trait]
pub trait MediaPackager: Send + Sync {
    /// Package `input` into `out_dir` and return the master manifest path.
    async fn package(&self, input: &Path, out_dir: &Path) -> MediaResult<PathBuf>;
}

/// Encoding profile for the single-rendition HLS output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HlsProfile {
    /// Output height in lines (width keeps aspect, rounded to even)
    pub max_height: u32,
    /// Average video bitrate
    pub video_bitrate: String,
    /// Audio bitrate
    pub audio_bitrate: String,
    /// Target segment duration in seconds
    pub segment_seconds: u32,
}

impl Default for HlsProfile {
    fn default() -> Self {
        Self {
            max_height: 720,
            video_bitrate: "3M".to_string(),
            audio_bitrate: "128k".to_string(),
            segment_seconds: 10,
        }
    }
}

impl HlsProfile {
    /// Build the FFmpeg command for this profile.
    pub fn command(&self, input: &Path, out_dir: &Path) -> FfmpegCommand {
        let manifest = out_dir.join(MASTER_MANIFEST_NAME);
        let segments = out_dir.join(SEGMENT_TEMPLATE);

        FfmpegCommand::new(input, manifest)
            .video_codec("libx264")
            .video_filter(format!("scale=-2:{}", self.max_height))
            .video_bitrate(self.video_bitrate.clone())
            .audio_codec("aac")
            .audio_bitrate(self.audio_bitrate.clone())
            .format("hls")
            .output_args([
                "-hls_time".to_string(),
                self.segment_seconds.to_string(),
                "-hls_playlist_type".to_string(),
                "vod".to_string(),
                "-hls_segment_filename".to_string(),
                segments.to_string_lossy().to_string(),
                "-start_number".to_string(),
                "0".to_string(),
            ])
    }
}

/// FFmpeg-backed [`MediaPackager`].
///
/// No retries happen here; a failed transcode is final for the attempt and
/// partial output is left for the caller to clean up.
pub struct HlsPackager {
    runner: FfmpegRunner,
    profile: HlsProfile,
}

impl Default for HlsPackager {
    fn default() -> Self {
        Self::new()
    }
}

impl HlsPackager {
    pub fn new() -> Self {
        Self {
            runner: FfmpegRunner::new(),
            profile: HlsProfile::default(),
        }
    }

    pub fn with_runner(mut self, runner: FfmpegRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_profile(mut self, profile: HlsProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Kill the transcoder if it runs longer than `secs`.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.runner = self.runner.with_timeout(secs);
        self
    }
}

#[async_trait]
impl MediaPackager for HlsPackager {
    async fn package(&self, input: &Path, out_dir: &Path) -> MediaResult<PathBuf> {
        if !tokio::fs::try_exists(input).await.unwrap_or(false) {
            return Err(MediaError::FileNotFound(input.to_path_buf()));
        }

        tokio::fs::create_dir_all(out_dir).await?;

        let cmd = self.profile.command(input, out_dir);
        let manifest = cmd.output_path().to_path_buf();

        info!("Starting HLS packaging for {} to {}", input.display(), out_dir.display());

        match self.runner.run(&cmd).await {
            Ok(_) => {
                info!("HLS packaging complete, master manifest: {}", manifest.display());
                Ok(manifest)
            }
            Err(MediaError::TranscodeFailed {
                exit_code,
                stdout,
                stderr,
            }) => {
                error!(
                    exit_code = ?exit_code,
                    stdout = %stdout,
                    stderr = %stderr,
                    "{} failed for {}",
                    self.runner.program(),
                    input.display()
                );
                Err(MediaError::TranscodeFailed {
                    exit_code,
                    stdout,
                    stderr,
                })
            }
            Err(e) => Err(e),
        }
    }
}
