//! Decoding options and the segment type produced by recognition.
//!
//! [`DecodeOptions`] carries every setting that controls a Whisper
//! inference run and is built from [`SttConfig`].  [`Segment`] is the unit
//! that flows through the rest of the pipeline.

use serde::{Deserialize, Serialize};

use crate::config::SttConfig;

// ---------------------------------------------------------------------------
// SamplingStrategy
// ---------------------------------------------------------------------------

/// Mirrors `whisper_rs::SamplingStrategy` but is owned and `Clone`.
#[derive(Debug, Clone, PartialEq)]
pub enum SamplingStrategy {
    /// Greedy (single-pass) decoding.
    Greedy {
        /// Number of candidates evaluated per step.
        best_of: i32,
    },
    /// Beam-search decoding.
    BeamSearch {
        /// Number of beams kept alive.
        beam_size: i32,
        /// Patience factor (≥1.0 = standard beam search).
        patience: f32,
    },
}

impl Default for SamplingStrategy {
    fn default() -> Self {
        Self::Greedy { best_of: 1 }
    }
}

// ---------------------------------------------------------------------------
// DecodeOptions
// ---------------------------------------------------------------------------

/// All parameters for a Whisper transcription run.
///
/// The defaults are tuned for long, noisy conversational recordings: beam
/// search with patience, blank suppression and the usual fallback
/// thresholds.
///
/// ```
/// use session_transcriber::config::SttConfig;
/// use session_transcriber::stt::{DecodeOptions, SamplingStrategy};
///
/// let opts = DecodeOptions::from_config(&SttConfig::default());
/// assert_eq!(opts.strategy, SamplingStrategy::BeamSearch { beam_size: 7, patience: 1.5 });
/// assert!(opts.suppress_blank);
/// ```
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// ISO-639-1 language code, or `"auto"` for detection.
    pub language: String,
    /// Decoding strategy.
    pub strategy: SamplingStrategy,
    /// CPU threads handed to Whisper.
    pub n_threads: i32,
    /// Probability above which a window is treated as silence.
    pub no_speech_threshold: f32,
    /// Average log-probability below which decoding is considered failed.
    pub log_prob_threshold: f32,
    /// Token entropy above which output is considered repetitive.
    pub entropy_threshold: f32,
    /// Feed the previous window's text as the prompt for the next.
    pub condition_on_previous_text: bool,
    /// Suppress blank outputs at the start of sampling.
    pub suppress_blank: bool,
    /// Suppress non-speech tokens (music notes, brackets …).
    pub suppress_non_speech_tokens: bool,
    /// Suppress Whisper's progress output to stderr.
    pub suppress_progress: bool,
}

impl DecodeOptions {
    /// Build options from the recognizer settings.  `n_threads == 0` means
    /// [`optimal_threads()`]; `beam_size <= 1` selects greedy decoding.
    pub fn from_config(config: &SttConfig) -> Self {
        let strategy = if config.beam_size > 1 {
            SamplingStrategy::BeamSearch {
                beam_size: config.beam_size,
                patience: config.patience,
            }
        } else {
            SamplingStrategy::Greedy { best_of: 1 }
        };

        Self {
            language: config.language.clone(),
            strategy,
            n_threads: if config.n_threads > 0 {
                config.n_threads
            } else {
                optimal_threads()
            },
            no_speech_threshold: config.no_speech_threshold,
            log_prob_threshold: config.log_prob_threshold,
            entropy_threshold: config.entropy_threshold,
            condition_on_previous_text: config.condition_on_previous_text,
            suppress_blank: config.suppress_blank,
            suppress_non_speech_tokens: config.suppress_non_speech_tokens,
            suppress_progress: true,
        }
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::from_config(&SttConfig::default())
    }
}

/// Number of CPU threads to use for inference, capped at 8.
pub(crate) fn optimal_threads() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get().min(8) as i32)
        .unwrap_or(4)
}

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

/// A time-bounded unit of recognized speech.
///
/// Times are milliseconds from the start of the conditioned audio.  `text`
/// may be empty (a noise or silence window) but is never absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Start time in milliseconds.
    pub start_ms: u64,
    /// End time in milliseconds.
    pub end_ms: u64,
    /// Recognized text, possibly empty.
    pub text: String,
    /// Speaker label assigned by diarization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

impl Segment {
    /// Segment without a speaker.
    pub fn new(start_ms: u64, end_ms: u64, text: impl Into<String>) -> Self {
        Self {
            start_ms,
            end_ms,
            text: text.into(),
            speaker: None,
        }
    }

    /// Builder-style speaker assignment.
    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }

    /// Length of the segment in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Overlap in milliseconds with the span `start_ms..end_ms`.
    pub fn overlap_ms(&self, start_ms: u64, end_ms: u64) -> u64 {
        self.end_ms.min(end_ms).saturating_sub(self.start_ms.max(start_ms))
    }
}
