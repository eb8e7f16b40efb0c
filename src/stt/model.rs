//! Model registry, metadata and path resolution.
//!
//! [`WHISPER_MODELS`] lists the multilingual GGML checkpoints the recognizer
//! accepts.  [`ModelPaths`] resolves the on-disk location of a model given an
//! [`crate::config::AppPaths`] instance or an explicit override.

use std::path::PathBuf;

use crate::config::{AppPaths, SttConfig};
use crate::stt::engine::SttError;

// ---------------------------------------------------------------------------
// ModelSize
// ---------------------------------------------------------------------------

/// Approximate capacity tier of a Whisper GGML model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelSize {
    Tiny,
    Base,
    Small,
    Medium,
    Large,
}

// ---------------------------------------------------------------------------
// ModelInfo
// ---------------------------------------------------------------------------

/// Static metadata for a single GGML model file.
#[derive(Debug)]
pub struct ModelInfo {
    /// Identifier used in `SttConfig::model` (e.g. `"base"`).
    pub id: &'static str,
    /// Human-readable name.
    pub display_name: &'static str,
    /// Model capacity tier.
    pub size: ModelSize,
    /// File name under the models directory.
    pub file_name: &'static str,
    /// Approximate file size in megabytes.
    pub file_size_mb: u64,
    /// Minimum RAM required to run this model (megabytes).
    pub ram_required_mb: u64,
    /// Source URL for downloading the GGML file.
    pub source_url: &'static str,
}

const GGML_SOURCE: &str = "https://huggingface.co/ggerganov/whisper.cpp";

/// Standard multilingual Whisper models.
pub const WHISPER_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "tiny",
        display_name: "Whisper Tiny",
        size: ModelSize::Tiny,
        file_name: "ggml-tiny.bin",
        file_size_mb: 75,
        ram_required_mb: 400,
        source_url: GGML_SOURCE,
    },
    ModelInfo {
        id: "base",
        display_name: "Whisper Base [Default]",
        size: ModelSize::Base,
        file_name: "ggml-base.bin",
        file_size_mb: 142,
        ram_required_mb: 500,
        source_url: GGML_SOURCE,
    },
    ModelInfo {
        id: "small",
        display_name: "Whisper Small",
        size: ModelSize::Small,
        file_name: "ggml-small.bin",
        file_size_mb: 466,
        ram_required_mb: 1_000,
        source_url: GGML_SOURCE,
    },
    ModelInfo {
        id: "medium",
        display_name: "Whisper Medium",
        size: ModelSize::Medium,
        file_name: "ggml-medium.bin",
        file_size_mb: 1_500,
        ram_required_mb: 2_600,
        source_url: GGML_SOURCE,
    },
    ModelInfo {
        id: "large-v3",
        display_name: "Whisper Large-v3",
        size: ModelSize::Large,
        file_name: "ggml-large-v3.bin",
        file_size_mb: 3_100,
        ram_required_mb: 4_700,
        source_url: GGML_SOURCE,
    },
];

/// Find a [`ModelInfo`] by its `id` string.
pub fn find_model_by_id(id: &str) -> Option<&'static ModelInfo> {
    WHISPER_MODELS.iter().find(|m| m.id == id)
}

// ---------------------------------------------------------------------------
// ModelPaths
// ---------------------------------------------------------------------------

/// Resolves the on-disk location of model files.
///
/// ```rust
/// use session_transcriber::config::SttConfig;
/// use session_transcriber::stt::ModelPaths;
///
/// let paths = ModelPaths::new("/models");
/// let path = paths.resolve(&SttConfig::default()).unwrap();
/// assert!(path.ends_with("ggml-base.bin"));
/// ```
#[derive(Debug, Clone)]
pub struct ModelPaths {
    /// Directory that contains (or will contain) GGML `.bin` files.
    pub models_dir: PathBuf,
}

impl ModelPaths {
    /// Build a [`ModelPaths`] from the application's [`AppPaths`].
    pub fn from_app_paths(app_paths: &AppPaths) -> Self {
        Self {
            models_dir: app_paths.models_dir.clone(),
        }
    }

    /// Construct directly from a models directory path.
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    /// Full path to the GGML file for the given model.
    pub fn model_path(&self, model: &ModelInfo) -> PathBuf {
        self.models_dir.join(model.file_name)
    }

    /// Returns `true` if the model file exists on disk.
    pub fn is_available(&self, model: &ModelInfo) -> bool {
        self.model_path(model).exists()
    }

    /// Path of the model `config` asks for: the explicit `model_path` when
    /// set, otherwise the registry entry for `model` under the models dir.
    ///
    /// # Errors
    ///
    /// [`SttError::ModelNotFound`] when `model` is not a registry id.
    pub fn resolve(&self, config: &SttConfig) -> Result<PathBuf, SttError> {
        if let Some(path) = &config.model_path {
            return Ok(path.clone());
        }
        find_model_by_id(&config.model)
            .map(|m| self.model_path(m))
            .ok_or_else(|| SttError::ModelNotFound(format!("unknown model id '{}'", config.model)))
    }

    /// Registry models present on disk.
    pub fn list_local_models(&self) -> Vec<&'static ModelInfo> {
        WHISPER_MODELS
            .iter()
            .filter(|m| self.is_available(m))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn registry_ids_are_unique() {
        for (i, a) in WHISPER_MODELS.iter().enumerate() {
            for b in &WHISPER_MODELS[i + 1..] {
                assert_ne!(a.id, b.id);
            }
        }
    }

    #[test]
    fn default_model_is_registered() {
        let m = find_model_by_id(&SttConfig::default().model);
        assert_eq!(m.map(|m| m.size), Some(ModelSize::Base));
    }

    #[test]
    fn find_model_by_id_unknown() {
        assert!(find_model_by_id("does-not-exist").is_none());
    }

    #[test]
    fn explicit_path_wins() {
        let config = SttConfig {
            model_path: Some(PathBuf::from("/opt/custom.bin")),
            ..SttConfig::default()
        };
        let p = ModelPaths::new("/models").resolve(&config).unwrap();
        assert_eq!(p, PathBuf::from("/opt/custom.bin"));
    }

    #[test]
    fn unknown_id_is_model_not_found() {
        let config = SttConfig {
            model: "huge".into(),
            ..SttConfig::default()
        };
        let err = ModelPaths::new("/models").resolve(&config).unwrap_err();
        assert!(matches!(err, SttError::ModelNotFound(_)));
    }

    #[test]
    fn local_models_are_listed() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("ggml-tiny.bin"), b"x").unwrap();

        let mp = ModelPaths::new(dir.path());
        let local: Vec<_> = mp.list_local_models().iter().map(|m| m.id).collect();
        assert_eq!(local, vec!["tiny"]);
    }
}
