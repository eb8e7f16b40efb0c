//! Signal conditioning: raw upload → clean 16 kHz mono artifact.
//!
//! ```text
//! decode + resample → high-pass (filtfilt) → edge trim → denoise
//!                   → normalize → quality gate → processed_<stem>.wav
//! ```
//!
//! Every step works on an in-memory `f32` buffer.  The input file is never
//! modified; the result is written next to it (or into the configured output
//! directory).

use std::path::{Path, PathBuf};
use std::time::Instant;

use super::asset::{file_stem, AudioAsset, ConditionedAudio};
use super::decode::decode_file;
use super::denoise::NoiseReducer;
use super::filter::HighPassFilter;
use super::normalize::normalize;
use super::quality::{AudioError, AudioQuality};
use super::trim::SilenceTrimmer;
use super::wav::write_wav;
use crate::config::ConditioningConfig;

/// Minimum conditioned duration accepted by the quality gate.
const MIN_CONDITIONED_SECS: f32 = 0.1;

// ---------------------------------------------------------------------------
// Conditioner trait
// ---------------------------------------------------------------------------

/// Turns an uploaded recording into a recognition-ready artifact.
///
/// Failures are soft: implementations log the cause and return `None`.
pub trait Conditioner: Send {
    fn condition(&self, input: &Path) -> Option<ConditionedAudio>;
}

// ---------------------------------------------------------------------------
// SignalConditioner
// ---------------------------------------------------------------------------

/// The production [`Conditioner`].
#[derive(Debug, Clone)]
pub struct SignalConditioner {
    config: ConditioningConfig,
    highpass: HighPassFilter,
    trimmer: SilenceTrimmer,
    denoiser: NoiseReducer,
}

impl SignalConditioner {
    /// Build the conditioning chain.
    ///
    /// # Errors
    ///
    /// [`AudioError::Spectral`] when the high-pass design is invalid for the
    /// configured sample rate.
    pub fn new(config: ConditioningConfig) -> Result<Self, AudioError> {
        let highpass = HighPassFilter::butterworth(
            config.highpass_order,
            config.highpass_cutoff_hz,
            config.sample_rate,
        )?;
        let trimmer = SilenceTrimmer::new(
            config.trim_top_db,
            config.trim_frame_length,
            config.trim_hop_length,
        );
        let denoiser = NoiseReducer::from_config(&config);

        Ok(Self {
            config,
            highpass,
            trimmer,
            denoiser,
        })
    }

    /// Where the conditioned artifact for `input` is written.
    pub fn output_path(&self, input: &Path) -> PathBuf {
        let dir = self
            .config
            .output_dir
            .clone()
            .or_else(|| input.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        dir.join(format!("processed_{}.wav", file_stem(input)))
    }

    /// Run the chain and surface the first error.
    pub fn process(&self, input: &Path) -> Result<ConditionedAudio, AudioError> {
        let rate = self.config.sample_rate;
        let t0 = Instant::now();

        let decoded = decode_file(input, rate)?;
        log::debug!(
            "conditioner: decoded {} samples ({} Hz, {} ch source)",
            decoded.samples.len(),
            decoded.source_rate,
            decoded.source_channels
        );

        let filtered = self.highpass.filtfilt(&decoded.samples);

        let range = self.trimmer.trim_range(&filtered);
        log::debug!(
            "conditioner: trimmed to samples {}..{} of {}",
            range.start,
            range.end,
            filtered.len()
        );
        let trim_offset_ms = range.start as u64 * 1_000 / u64::from(rate.max(1));
        let trimmed = &filtered[range];

        let mut samples = self.denoiser.reduce(trimmed)?;
        normalize(&mut samples, self.config.normalization, self.config.target_dbfs);

        AudioQuality::new(MIN_CONDITIONED_SECS).validate(&samples, rate)?;

        let out = self.output_path(input);
        if let Some(dir) = out.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| AudioError::Io {
                path: dir.display().to_string(),
                source,
            })?;
        }
        write_wav(&out, &samples, rate)?;

        log::info!(
            "conditioner: {} → {} ({:.2}s audio) in {:.2?}",
            input.display(),
            out.display(),
            samples.len() as f32 / rate as f32,
            t0.elapsed()
        );

        let asset = AudioAsset::mono(out, rate, samples.len());
        Ok(ConditionedAudio::new(asset, samples).with_trim_offset_ms(trim_offset_ms))
    }
}

impl Conditioner for SignalConditioner {
    fn condition(&self, input: &Path) -> Option<ConditionedAudio> {
        match self.process(input) {
            Ok(conditioned) => Some(conditioned),
            Err(e) => {
                log::error!("conditioner: {} failed: {e}", input.display());
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::normalize::dbfs_to_linear;
    use crate::audio::wav::read_wav;
    use tempfile::tempdir;

    const SR: u32 = 16_000;

    fn write_session(path: &Path, sample_rate: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut w = hound::WavWriter::create(path, spec).unwrap();
        let n = sample_rate as usize;
        // 0.5 s silence, 1 s tone, 0.5 s silence.
        for i in 0..2 * n {
            let v = if (n / 2..n / 2 + n).contains(&i) {
                0.3 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sample_rate as f32).sin()
            } else {
                0.0
            };
            w.write_sample((v * i16::MAX as f32) as i16).unwrap();
        }
        w.finalize().unwrap();
    }

    fn conditioner() -> SignalConditioner {
        SignalConditioner::new(ConditioningConfig::default()).unwrap()
    }

    #[test]
    fn conditions_session_next_to_input() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("session.wav");
        write_session(&input, SR);

        let out = conditioner().condition(&input).expect("conditioning failed");
        assert_eq!(out.path(), dir.path().join("processed_session.wav"));
        assert!(out.path().exists());
        assert_eq!(out.asset.sample_rate, SR);
        assert_eq!(out.asset.channels, 1);

        let secs = out.asset.duration.as_secs_f32();
        assert!(secs < 2.0, "silence was not trimmed: {secs}s");
        assert!(secs >= 0.95, "speech was trimmed away: {secs}s");

        let peak = out.samples.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!((peak - dbfs_to_linear(-1.0)).abs() < 1e-3, "peak {peak}");
    }

    #[test]
    fn records_leading_trim_offset() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("session.wav");
        write_session(&input, SR);

        let out = conditioner().condition(&input).unwrap();
        // 0.5 s of leading silence, trimmed at 512-sample hop resolution.
        assert!(
            (300..=500).contains(&out.trim_offset_ms),
            "offset {} ms",
            out.trim_offset_ms
        );
        assert_eq!(out.source_stem, None);
    }

    #[test]
    fn written_artifact_matches_samples() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("s.wav");
        write_session(&input, SR);

        let out = conditioner().condition(&input).unwrap();
        let (back, spec) = read_wav(out.path()).unwrap();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, SR);
        assert_eq!(back.len(), out.samples.len());
    }

    #[test]
    fn input_is_not_modified() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("orig.wav");
        write_session(&input, SR);
        let before = std::fs::read(&input).unwrap();

        conditioner().condition(&input).unwrap();
        assert_eq!(std::fs::read(&input).unwrap(), before);
    }

    #[test]
    fn resamples_to_canonical_rate() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("hi_rate.wav");
        write_session(&input, 44_100);

        let out = conditioner().condition(&input).unwrap();
        assert_eq!(out.asset.sample_rate, SR);
        assert!(out.asset.duration.as_secs_f32() < 2.0);
    }

    #[test]
    fn output_dir_is_honoured() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("x.wav");
        write_session(&input, SR);

        let config = ConditioningConfig {
            output_dir: Some(dir.path().join("conditioned")),
            ..ConditioningConfig::default()
        };
        let out = SignalConditioner::new(config).unwrap().condition(&input).unwrap();
        assert_eq!(out.path(), dir.path().join("conditioned").join("processed_x.wav"));
    }

    #[test]
    fn missing_input_is_soft_failure() {
        assert!(conditioner()
            .condition(Path::new("/nonexistent/session.wav"))
            .is_none());
    }

    #[test]
    fn undecodable_input_is_soft_failure() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("notes.mp3");
        std::fs::write(&input, b"not really an mp3").unwrap();
        assert!(conditioner().condition(&input).is_none());
    }

    #[test]
    fn all_silent_input_is_soft_failure() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("quiet.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: SR,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut w = hound::WavWriter::create(&input, spec).unwrap();
        for _ in 0..SR {
            w.write_sample(0_i16).unwrap();
        }
        w.finalize().unwrap();

        assert!(conditioner().condition(&input).is_none());
        assert!(!dir.path().join("processed_quiet.wav").exists());
    }

    #[test]
    fn invalid_filter_design_is_rejected() {
        let config = ConditioningConfig {
            highpass_order: 3,
            ..ConditioningConfig::default()
        };
        assert!(SignalConditioner::new(config).is_err());
    }
}
