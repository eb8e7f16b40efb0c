//! Configuration module.
//!
//! Provides [`PipelineConfig`] (top-level settings), sub-configs for each
//! pipeline stage, [`AppPaths`] for cross-platform directories, and TOML
//! persistence via `PipelineConfig::load_from` / `PipelineConfig::save_to`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    ConditioningConfig, DiarizationConfig, NormalizationMode, PipelineConfig, StorageConfig,
    SttConfig, VadConfig,
};
