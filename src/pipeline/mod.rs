//! Pipeline orchestrator module.
//!
//! Wires conditioning → recognition → diarization → assembly →
//! normalization for one uploaded recording at a time.
//!
//! # Architecture
//!
//! ```text
//! TranscriptionService (async, Clone)
//!        │  lock_owned + spawn_blocking
//!        ▼
//! TranscriptionPipeline::run_detailed(path)
//!        │
//!        ├─ SignalConditioner          → ConditionedAudio
//!        ├─ RecognitionEngineAdapter   → Vec<Segment>
//!        ├─ DiarizationAdapter         → Vec<Segment> (+ speakers)
//!        ├─ assemble                   → raw text
//!        └─ TextNormalizer             → final text
//!
//! EngineHandle (recognizer + optional diarizer), released after every run
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use session_transcriber::config::{AppPaths, PipelineConfig};
//! use session_transcriber::pipeline::{EngineHandle, TranscriptionPipeline, TranscriptionService};
//! use session_transcriber::stt::ModelPaths;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = PipelineConfig::default();
//!     let models = ModelPaths::from_app_paths(&AppPaths::new());
//!     let engine = EngineHandle::from_config(&config, &models);
//!     let pipeline = TranscriptionPipeline::from_config(&config, engine).unwrap();
//!     let service = TranscriptionService::new(pipeline);
//!
//!     let text = service.transcribe("uploads/session.wav".into()).await;
//!     println!("{text}");
//! }
//! ```

pub mod runner;
pub mod service;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{EngineHandle, TranscriptionOutput, TranscriptionPipeline};
pub use service::TranscriptionService;
pub use state::{FailureReason, PipelineError, PipelineState};
