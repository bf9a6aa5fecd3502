//! Answer models.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an answer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerId(pub String);

impl AnswerId {
    /// Generate a new random answer ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AnswerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AnswerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AnswerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AnswerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Publishing status of an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnswerStatus {
    /// Answer is still being produced
    #[default]
    Pending,
    /// Source video is rendered and can be published
    Ready,
    /// HLS package is uploaded and publicly reachable
    Live,
    /// Publishing failed
    Error,
}

impl AnswerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerStatus::Pending => "PENDING",
            AnswerStatus::Ready => "READY",
            AnswerStatus::Live => "LIVE",
            AnswerStatus::Error => "ERROR",
        }
    }

    /// Only a `READY` answer may start a publish attempt.
    pub fn can_publish(&self) -> bool {
        matches!(self, AnswerStatus::Ready)
    }
}

impl fmt::Display for AnswerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An answer video as stored by the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Unique answer ID
    pub id: AnswerId,

    /// URL slug
    #[serde(default)]
    pub slug: String,

    /// Display title
    #[serde(default)]
    pub title: String,

    /// Publishing status
    #[serde(default)]
    pub status: AnswerStatus,

    /// Location of the rendered MP4. Falls back to the media-root layout when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_media_path: Option<PathBuf>,

    /// Public URL of the HLS master manifest
    #[serde(default)]
    pub hls_manifest_url: Option<String>,

    /// Public video URL (currently the manifest URL)
    #[serde(default)]
    pub video_url: Option<String>,

    /// Creation timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Answer {
    /// Create a new answer in the `READY` state.
    pub fn new(id: AnswerId, slug: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            slug: slug.into(),
            title: title.into(),
            status: AnswerStatus::Ready,
            source_media_path: None,
            hls_manifest_url: None,
            video_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: AnswerStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_source_media_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_media_path = Some(path.into());
        self
    }

    /// Update the status and URLs and bump `updated_at`.
    ///
    /// URLs that are `None` are left untouched.
    pub fn apply_status(
        &mut self,
        status: AnswerStatus,
        manifest_url: Option<&str>,
        video_url: Option<&str>,
    ) {
        self.status = status;
        if let Some(url) = manifest_url {
            self.hls_manifest_url = Some(url.to_string());
        }
        if let Some(url) = video_url {
            self.video_url = Some(url.to_string());
        }
        self.updated_at = Utc::now();
    }
}

/// Successful publish result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedAnswer {
    pub status: AnswerStatus,
    pub url: String,
}

impl PublishedAnswer {
    pub fn live(url: impl Into<String>) -> Self {
        Self {
            status: AnswerStatus::Live,
            url: url.into(),
        }
    }
}
