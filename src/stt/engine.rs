//! Speech recognizer trait and implementations.
//!
//! # Overview
//!
//! [`SpeechRecognizer`] is the narrow interface the pipeline drives.  It is
//! object-safe and `Send`, so a `Box<dyn SpeechRecognizer>` can move into a
//! blocking worker thread.  Recognizers are stateful: the pipeline calls
//! [`SpeechRecognizer::release`] after every run to drop per-run buffers.
//!
//! [`WhisperEngine`] is the production implementation that wraps a
//! `whisper_rs::WhisperContext`.  Construct it with [`WhisperEngine::load`].
//!
//! [`UnloadedRecognizer`] stands in when no model could be loaded, so the
//! pipeline reports a precondition failure instead of the process refusing
//! to start.
//!
//! [`MockRecognizer`] (available under `#[cfg(test)]`) returns canned
//! segments and counts its calls.

use std::path::Path;

use thiserror::Error;
use whisper_rs::{FullParams, WhisperContext, WhisperContextParameters, WhisperState};

use crate::stt::transcribe::{DecodeOptions, SamplingStrategy, Segment};

// ---------------------------------------------------------------------------
// SttError
// ---------------------------------------------------------------------------

/// All errors that can arise from the STT subsystem.
#[derive(Debug, Clone, Error)]
pub enum SttError {
    /// The GGML model file was not found at the given path.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// `whisper_rs` failed to initialise a `WhisperContext` or `WhisperState`.
    #[error("Whisper context initialisation failed: {0}")]
    ContextInit(String),

    /// An error occurred during the inference pass.
    #[error("Transcription error: {0}")]
    Transcription(String),

    /// No model is loaded.
    #[error("Recognizer not initialised: {0}")]
    NotLoaded(String),
}

// ---------------------------------------------------------------------------
// SpeechRecognizer trait
// ---------------------------------------------------------------------------

/// Object-safe interface for speech-recognition engines.
///
/// # Contract
///
/// - `audio` is **16 kHz, mono, f32** PCM.
/// - Returned segment times are relative to the start of `audio`.
/// - Zero segments is a valid result for silent or unintelligible audio.
pub trait SpeechRecognizer: Send {
    /// Recognize `audio`.
    fn recognize(&mut self, audio: &[f32]) -> Result<Vec<Segment>, SttError>;

    /// `false` when the engine cannot serve requests.
    fn is_ready(&self) -> bool {
        true
    }

    /// Drop transient per-run state (decoder buffers, accelerator memory).
    fn release(&mut self) {}
}

// Compile-time assertion: Box<dyn SpeechRecognizer> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SpeechRecognizer>) {}
};

/// Whisper is unreliable on inputs shorter than one second at 16 kHz.
const MIN_AUDIO_SAMPLES: usize = 16_000;

// ---------------------------------------------------------------------------
// WhisperEngine
// ---------------------------------------------------------------------------

/// Production recognizer that wraps a `whisper_rs::WhisperContext`.
///
/// The decoder state is created lazily on the first call of a run and kept
/// for the remaining chunks; [`release`](SpeechRecognizer::release) drops it.
pub struct WhisperEngine {
    ctx: WhisperContext,
    options: DecodeOptions,
    state: Option<WhisperState>,
}

impl std::fmt::Debug for WhisperEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperEngine")
            .field("options", &self.options)
            .field("state_live", &self.state.is_some())
            .finish_non_exhaustive()
    }
}

// SAFETY: WhisperContext is Send+Sync as declared by whisper-rs.  The
// WhisperState is only reached through `&mut self`, so it is never used
// from two threads at once; moving it between threads is fine because
// whisper.cpp keeps no thread-local data in it.
unsafe impl Send for WhisperEngine {}

impl WhisperEngine {
    /// Load a GGML model from `model_path`.
    ///
    /// # Errors
    ///
    /// - [`SttError::ModelNotFound`]: `model_path` does not exist.
    /// - [`SttError::ContextInit`]: whisper-rs failed to load the file.
    pub fn load(
        model_path: impl AsRef<Path>,
        options: DecodeOptions,
        use_gpu: bool,
    ) -> Result<Self, SttError> {
        let path = model_path.as_ref();

        if !path.exists() {
            return Err(SttError::ModelNotFound(path.display().to_string()));
        }

        let path_str = path.to_str().ok_or_else(|| {
            SttError::ModelNotFound(format!(
                "model path contains non-UTF-8 characters: {}",
                path.display()
            ))
        })?;

        let mut ctx_params = WhisperContextParameters::default();
        ctx_params.use_gpu(use_gpu);
        let ctx = WhisperContext::new_with_params(path_str, ctx_params)
            .map_err(|e| SttError::ContextInit(e.to_string()))?;

        log::info!("stt: loaded {} (gpu={use_gpu})", path.display());
        Ok(Self {
            ctx,
            options,
            state: None,
        })
    }

    /// Decoding options in use.
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }
}

/// Translate [`DecodeOptions`] into whisper-rs parameters.
fn full_params(options: &DecodeOptions) -> FullParams<'_, '_> {
    use whisper_rs::SamplingStrategy as WS;
    let ws = match options.strategy {
        SamplingStrategy::Greedy { best_of } => WS::Greedy { best_of },
        SamplingStrategy::BeamSearch {
            beam_size,
            patience,
        } => WS::BeamSearch {
            beam_size,
            patience,
        },
    };

    let mut fp = FullParams::new(ws);

    let lang: Option<&str> = if options.language == "auto" {
        None
    } else {
        Some(options.language.as_str())
    };
    fp.set_language(lang);
    fp.set_n_threads(options.n_threads);
    fp.set_no_context(!options.condition_on_previous_text);
    fp.set_suppress_blank(options.suppress_blank);
    fp.set_suppress_non_speech_tokens(options.suppress_non_speech_tokens);
    fp.set_no_speech_thold(options.no_speech_threshold);
    fp.set_logprob_thold(options.log_prob_threshold);
    fp.set_entropy_thold(options.entropy_threshold);

    if options.suppress_progress {
        fp.set_print_progress(false);
        fp.set_print_realtime(false);
        fp.set_print_special(false);
        fp.set_print_timestamps(false);
    }
    fp
}

impl SpeechRecognizer for WhisperEngine {
    fn recognize(&mut self, audio: &[f32]) -> Result<Vec<Segment>, SttError> {
        if audio.is_empty() {
            return Ok(Vec::new());
        }

        let mut padded = Vec::new();
        let audio = if audio.len() < MIN_AUDIO_SAMPLES {
            padded.extend_from_slice(audio);
            padded.resize(MIN_AUDIO_SAMPLES, 0.0);
            &padded[..]
        } else {
            audio
        };

        if self.state.is_none() {
            let state = self
                .ctx
                .create_state()
                .map_err(|e| SttError::ContextInit(e.to_string()))?;
            self.state = Some(state);
        }

        let fp = full_params(&self.options);
        let Some(state) = self.state.as_mut() else {
            return Err(SttError::NotLoaded("decoder state missing".into()));
        };

        state
            .full(fp, audio)
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let n_segments = state
            .full_n_segments()
            .map_err(|e| SttError::Transcription(e.to_string()))?;

        let mut segments = Vec::with_capacity(n_segments.max(0) as usize);
        for i in 0..n_segments {
            let text = state
                .full_get_segment_text(i)
                .map_err(|e| SttError::Transcription(format!("segment {i}: {e}")))?;

            // Timestamps are in centiseconds → multiply by 10 for ms.
            let t0 = state.full_get_segment_t0(i).unwrap_or(0).max(0) as u64 * 10;
            let t1 = state.full_get_segment_t1(i).unwrap_or(0).max(0) as u64 * 10;

            segments.push(Segment::new(t0, t1, text.trim()));
        }

        Ok(segments)
    }

    fn release(&mut self) {
        if self.state.take().is_some() {
            log::debug!("stt: released decoder state");
        }
    }
}

// ---------------------------------------------------------------------------
// UnloadedRecognizer
// ---------------------------------------------------------------------------

/// Placeholder used when the model failed to load.
#[derive(Debug, Clone)]
pub struct UnloadedRecognizer {
    reason: String,
}

impl UnloadedRecognizer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl SpeechRecognizer for UnloadedRecognizer {
    fn recognize(&mut self, _audio: &[f32]) -> Result<Vec<Segment>, SttError> {
        Err(SttError::NotLoaded(self.reason.clone()))
    }

    fn is_ready(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// MockRecognizer  (test-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use mock::MockRecognizer;


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
