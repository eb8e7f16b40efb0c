//! session-transcriber: offline transcription of recorded therapy sessions.
//!
//! An uploaded recording is conditioned (decode, high-pass, trim, denoise,
//! level), recognized with Whisper, optionally attributed to speakers,
//! joined into one transcript and cleaned up.  See [`pipeline`] for the
//! orchestration and the state machine.

pub mod audio;
pub mod cli;
pub mod config;
pub mod diarize;
pub mod pipeline;
pub mod stt;
pub mod transcript;
pub mod upload;
