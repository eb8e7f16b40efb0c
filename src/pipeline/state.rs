//! Pipeline state machine and failure taxonomy.
//!
//! [`PipelineState`] records where a run is.  The orchestrator moves
//! through the states strictly in order; any non-terminal state may jump to
//! [`PipelineState::Failed`].

use thiserror::Error;

// ---------------------------------------------------------------------------
// FailureReason
// ---------------------------------------------------------------------------

/// Why a run ended in [`PipelineState::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Engine not initialised or input missing; no stage ran.
    Precondition,
    /// Decoding or a signal transform failed.
    Preprocessing,
    /// The recognizer failed or produced nothing usable.
    Recognition,
    /// Anything else, including a panic inside a stage.
    Unexpected,
}

impl FailureReason {
    pub fn label(&self) -> &'static str {
        match self {
            FailureReason::Precondition => "precondition",
            FailureReason::Preprocessing => "preprocessing",
            FailureReason::Recognition => "recognition",
            FailureReason::Unexpected => "unexpected",
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineState
// ---------------------------------------------------------------------------

/// States of one transcription run.
///
/// ```text
/// Idle ─▶ Validating ─▶ Conditioning ─▶ Recognizing ─▶ Diarizing
///      ─▶ Assembling ─▶ Normalizing ─▶ Done
///
/// Validating   ──no engine / no file──▶ Failed(Precondition)
/// Conditioning ──no artifact─────────▶ Failed(Preprocessing)
/// Recognizing  ──no usable text──────▶ Failed(Recognition)
/// any stage    ──panic───────────────▶ Failed(Unexpected)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    /// No run in progress.
    #[default]
    Idle,
    /// Checking engine readiness and the input path.
    Validating,
    /// Producing the conditioned artifact.
    Conditioning,
    /// Running speech recognition.
    Recognizing,
    /// Attributing speakers (never fails the run).
    Diarizing,
    /// Joining segments into one string.
    Assembling,
    /// Cleaning up the assembled string.
    Normalizing,
    /// The transcript is ready.
    Done,
    /// The run aborted.
    Failed(FailureReason),
}

impl PipelineState {
    /// Returns `true` while a run is in progress.
    ///
    /// ```
    /// use session_transcriber::pipeline::{FailureReason, PipelineState};
    ///
    /// assert!(!PipelineState::Idle.is_busy());
    /// assert!(PipelineState::Recognizing.is_busy());
    /// assert!(!PipelineState::Done.is_busy());
    /// assert!(!PipelineState::Failed(FailureReason::Recognition).is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        !matches!(
            self,
            PipelineState::Idle | PipelineState::Done | PipelineState::Failed(_)
        )
    }

    /// `Done` or `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed(_))
    }

    /// A short human-readable label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            PipelineState::Idle => "Idle",
            PipelineState::Validating => "Validating",
            PipelineState::Conditioning => "Conditioning",
            PipelineState::Recognizing => "Recognizing",
            PipelineState::Diarizing => "Diarizing",
            PipelineState::Assembling => "Assembling",
            PipelineState::Normalizing => "Normalizing",
            PipelineState::Done => "Done",
            PipelineState::Failed(_) => "Failed",
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Terminal failure of a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("preprocessing failed for {0}")]
    Preprocessing(String),

    #[error("recognition produced no usable text")]
    Recognition,

    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl PipelineError {
    pub fn reason(&self) -> FailureReason {
        match self {
            PipelineError::Precondition(_) => FailureReason::Precondition,
            PipelineError::Preprocessing(_) => FailureReason::Preprocessing,
            PipelineError::Recognition => FailureReason::Recognition,
            PipelineError::Unexpected(_) => FailureReason::Unexpected,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
