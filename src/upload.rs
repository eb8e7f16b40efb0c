//! Upload intake: filename sanitising and staging under a unique name.
//!
//! A recording handed to the service is first copied into the configured
//! upload directory as `<uuid>_<sanitised name>`, so two sessions with the
//! same original filename never collide and no caller-supplied path component
//! escapes the directory.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use uuid::Uuid;

use crate::config::StorageConfig;

static UNSAFE_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.-]").unwrap());

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file type not allowed: {0}")]
    NotAllowed(String),

    #[error("filename {0:?} is empty after sanitising")]
    InvalidName(String),

    #[error("upload source not found: {0}")]
    Missing(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reduce `name` to a safe single path component.
///
/// Non-ASCII characters are dropped, separators and whitespace become
/// underscores, anything outside `[A-Za-z0-9_.-]` is removed and leading or
/// trailing dots and underscores are stripped.
///
/// ```rust
/// use session_transcriber::upload::secure_filename;
///
/// assert_eq!(secure_filename("My Session.wav"), "My_Session.wav");
/// assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
/// assert_eq!(secure_filename("สวัสดี"), "");
/// ```
pub fn secure_filename(name: &str) -> String {
    let ascii: String = name
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = UNSAFE_CHARS.replace_all(&joined, "");
    cleaned.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Whether `filename` carries one of `allowed` (case-insensitive).
pub fn is_allowed(filename: &str, allowed: &[String]) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// A recording copied into the upload directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedUpload {
    /// `<upload_dir>/<uuid>_<sanitised name>`.
    pub path: PathBuf,
    /// File stem exactly as supplied, before sanitising.
    pub original_stem: String,
}

/// Copies incoming recordings into the upload directory.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    allowed: Vec<String>,
}

impl UploadStore {
    pub fn new(storage: &StorageConfig) -> Self {
        Self {
            dir: storage.upload_dir.clone(),
            allowed: storage.allowed_extensions.clone(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy `src` into the upload directory.
    pub fn stage(&self, src: &Path) -> Result<StagedUpload, UploadError> {
        let original = src
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        if !is_allowed(original, &self.allowed) {
            return Err(UploadError::NotAllowed(original.to_string()));
        }
        let safe = secure_filename(original);
        if safe.is_empty() || !is_allowed(&safe, &self.allowed) {
            return Err(UploadError::InvalidName(original.to_string()));
        }
        if !src.is_file() {
            return Err(UploadError::Missing(src.to_path_buf()));
        }

        std::fs::create_dir_all(&self.dir).map_err(|source| UploadError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let dest = self.dir.join(format!("{}_{safe}", Uuid::new_v4()));
        std::fs::copy(src, &dest).map_err(|source| UploadError::Io {
            path: dest.clone(),
            source,
        })?;

        log::info!("upload: staged {} as {}", src.display(), dest.display());
        let original_stem = Path::new(original)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(StagedUpload {
            path: dest,
            original_stem,
        })
    }
}
