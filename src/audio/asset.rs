//! Audio artifact descriptors passed between pipeline stages.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// An audio file on disk together with its stream properties.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioAsset {
    /// Location of the file.
    pub path: PathBuf,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Playback length.
    pub duration: Duration,
}

impl AudioAsset {
    /// Describe a mono buffer of `len` samples at `sample_rate` stored at `path`.
    pub fn mono(path: impl Into<PathBuf>, sample_rate: u32, len: usize) -> Self {
        Self {
            path: path.into(),
            sample_rate,
            channels: 1,
            duration: Duration::from_secs_f64(len as f64 / f64::from(sample_rate.max(1))),
        }
    }

    /// File stem of the asset, or `"audio"` when the path has none.
    pub fn stem(&self) -> &str {
        file_stem(&self.path)
    }
}

/// Output of the conditioning stage: the written artifact and the samples
/// that were written to it, so later stages need not decode it again.
#[derive(Debug, Clone)]
pub struct ConditionedAudio {
    /// The conditioned file (mono, canonical rate).
    pub asset: AudioAsset,
    /// The conditioned samples.
    pub samples: Vec<f32>,
    /// Audio removed from the front of the input by silence trimming.
    /// Input time = conditioned time + this offset.
    pub trim_offset_ms: u64,
    /// Stem of the file as the user supplied it, before upload staging
    /// renamed it.
    pub source_stem: Option<String>,
}

impl ConditionedAudio {
    pub fn new(asset: AudioAsset, samples: Vec<f32>) -> Self {
        Self {
            asset,
            samples,
            trim_offset_ms: 0,
            source_stem: None,
        }
    }

    pub fn with_trim_offset_ms(mut self, offset_ms: u64) -> Self {
        self.trim_offset_ms = offset_ms;
        self
    }

    /// Path of the conditioned artifact.
    pub fn path(&self) -> &Path {
        &self.asset.path
    }
}

pub(crate) fn file_stem(path: &Path) -> &str {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("audio")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mono_asset_duration_from_length() {
        let asset = AudioAsset::mono("/tmp/a.wav", 16_000, 24_000);
        assert_eq!(asset.channels, 1);
        assert_eq!(asset.duration, Duration::from_millis(1_500));
    }

    #[test]
    fn stem_strips_directory_and_extension() {
        let asset = AudioAsset::mono("/uploads/abc_session.m4a", 16_000, 0);
        assert_eq!(asset.stem(), "abc_session");
    }

    #[test]
    fn conditioned_defaults_to_input_timeline() {
        let c = ConditionedAudio::new(AudioAsset::mono("/tmp/p.wav", 16_000, 0), Vec::new());
        assert_eq!(c.trim_offset_ms, 0);
        assert_eq!(c.source_stem, None);
        assert_eq!(c.with_trim_offset_ms(250).trim_offset_ms, 250);
    }

    #[test]
    fn stem_falls_back_when_missing() {
        assert_eq!(file_stem(Path::new("/")), "audio");
    }
}
