//! Audio error type and the post-conditioning quality gate.
//!
//! [`AudioQuality`] checks a conditioned mono `f32` buffer before it is
//! written out for recognition:
//!
//! | Check    | Description                                              |
//! |----------|----------------------------------------------------------|
//! | Duration | Buffer must hold at least `min_secs` of audio            |
//! | Silence  | At least one sample must exceed an amplitude threshold   |
//! | Clipping | Logged only; conditioning already limits peaks           |
//!
//! # Example
//!
//! ```rust
//! use session_transcriber::audio::{AudioError, AudioQuality};
//!
//! let gate = AudioQuality::new(0.1);
//! assert!(gate.validate(&vec![0.1_f32; 16_000], 16_000).is_ok());
//! assert!(matches!(
//!     gate.validate(&vec![0.1_f32; 100], 16_000),
//!     Err(AudioError::TooShort { .. })
//! ));
//! ```

use thiserror::Error;

// ---------------------------------------------------------------------------
// AudioError
// ---------------------------------------------------------------------------

/// Everything that can go wrong while decoding, conditioning or writing audio.
#[derive(Debug, Error)]
pub enum AudioError {
    /// Filesystem error while opening or writing an artifact.
    #[error("audio I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The container or codec could not be decoded.
    #[error("audio decode failed: {0}")]
    Decode(String),

    /// Sample-rate conversion failed.
    #[error("resampling failed: {0}")]
    Resample(String),

    /// FFT planning or execution failed during noise reduction.
    #[error("spectral processing failed: {0}")]
    Spectral(String),

    /// WAV encode/decode of a conditioned artifact failed.
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Buffer is shorter than the configured minimum.
    #[error("audio too short: {got_secs:.2}s (minimum {min_secs:.2}s)")]
    TooShort { min_secs: f32, got_secs: f32 },

    /// All samples are below the silence floor.
    #[error("audio too quiet: max amplitude {amplitude:.4} (threshold {threshold:.4})")]
    TooQuiet { amplitude: f32, threshold: f32 },
}

// ---------------------------------------------------------------------------
// AudioQuality
// ---------------------------------------------------------------------------

/// Validates a conditioned buffer before recognition.
pub struct AudioQuality {
    /// Minimum allowed duration in seconds (default: `0.1`).
    pub min_secs: f32,
    /// Minimum peak amplitude for the buffer to count as non-silent
    /// (default: `1e-4`).
    pub silence_threshold: f32,
    /// Amplitude above which a sample counts as clipped (default: `0.999`).
    pub clipping_threshold: f32,
    /// Clipped-sample percentage above which a warning is logged
    /// (default: `1.0` %).
    pub clipping_warn_pct: f32,
}

impl Default for AudioQuality {
    fn default() -> Self {
        Self {
            min_secs: 0.1,
            silence_threshold: 1e-4,
            clipping_threshold: 0.999,
            clipping_warn_pct: 1.0,
        }
    }
}

impl AudioQuality {
    /// Create a gate with the given minimum duration and default thresholds.
    pub fn new(min_secs: f32) -> Self {
        Self {
            min_secs,
            ..Default::default()
        }
    }

    /// Validate `audio` sampled at `sample_rate`.
    ///
    /// Returns the first failing check.  Clipping never fails the buffer.
    pub fn validate(&self, audio: &[f32], sample_rate: u32) -> Result<(), AudioError> {
        let got_secs = audio.len() as f32 / sample_rate.max(1) as f32;
        if got_secs < self.min_secs {
            return Err(AudioError::TooShort {
                min_secs: self.min_secs,
                got_secs,
            });
        }

        let amplitude = audio.iter().map(|s| s.abs()).fold(0.0_f32, f32::max);
        if amplitude < self.silence_threshold {
            return Err(AudioError::TooQuiet {
                amplitude,
                threshold: self.silence_threshold,
            });
        }

        let clipped = audio
            .iter()
            .filter(|&&s| s.abs() > self.clipping_threshold)
            .count();
        let clipped_pct = clipped as f32 / audio.len() as f32 * 100.0;
        if clipped_pct > self.clipping_warn_pct {
            log::warn!(
                "conditioner: {clipped_pct:.1}% of samples at full scale after conditioning"
            );
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
