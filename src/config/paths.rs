//! Cross-platform application paths using the `dirs` crate.
//!
//! Config dir (settings):
//!   Linux:   ~/.config/session-transcriber/
//!   macOS:   ~/Library/Application Support/session-transcriber/
//!   Windows: %APPDATA%\session-transcriber\
//!
//! Data dir (Whisper GGML models):
//!   Linux:   ~/.local/share/session-transcriber/models/
//!   macOS:   ~/Library/Application Support/session-transcriber/models/
//!   Windows: %LOCALAPPDATA%\session-transcriber\models\

use std::path::PathBuf;

/// Resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory holding `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory for downloaded GGML model files.
    pub models_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "session-transcriber";

    /// Resolves all paths, falling back to the current directory when the
    /// platform has no standard location.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        Self {
            settings_file: config_dir.join("settings.toml"),
            config_dir,
            models_dir: data_dir.join("models"),
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_non_empty() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths.models_dir.ends_with("models"));
        assert!(paths
            .settings_file
            .file_name()
            .is_some_and(|n| n == "settings.toml"));
    }
}
