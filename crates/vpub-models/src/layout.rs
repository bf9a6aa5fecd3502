//! Local and remote path conventions.

use std::path::{Path, PathBuf};

use crate::answer::AnswerId;

/// File name of the HLS master manifest inside a package.
pub const MASTER_MANIFEST_NAME: &str = "master.m3u8";

/// Remote prefix under which one answer's objects live.
pub fn remote_prefix(id: &AnswerId) -> String {
    format!("answers/{}", id)
}

/// Remote key of the master manifest for a prefix.
pub fn master_manifest_key(prefix: &str) -> String {
    format!("{}/{}", prefix.trim_matches('/'), MASTER_MANIFEST_NAME)
}

/// Default source location: `{media_root}/answers/{id}.mp4`.
pub fn default_source_path(media_root: &Path, id: &AnswerId) -> PathBuf {
    media_root.join("answers").join(format!("{}.mp4", id))
}
