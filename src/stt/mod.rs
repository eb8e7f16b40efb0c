//! STT (Speech-to-Text) module.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │              RecognitionEngineAdapter                     │
//! │                                                          │
//! │   audio ──▶ SpeechDetector::chunks ──▶ ≤20 s chunks       │
//! │                                           │              │
//! │                                           ▼              │
//! │   ┌─────────────┐          ┌──────────────────────────┐  │
//! │   │ ModelPaths  │─ load ──▶│ dyn SpeechRecognizer     │  │
//! │   │ - resolve   │          │ (WhisperEngine)          │  │
//! │   └─────────────┘          └────────────┬─────────────┘  │
//! │                                         ▼                │
//! │                 offset → sanitize → Vec<Segment>          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use session_transcriber::config::{SttConfig, VadConfig};
//! use session_transcriber::stt::{DecodeOptions, RecognitionEngineAdapter, WhisperEngine};
//!
//! let config = SttConfig::default();
//! let mut engine =
//!     WhisperEngine::load("models/ggml-base.bin", DecodeOptions::from_config(&config), true)
//!         .expect("model not found");
//!
//! let adapter = RecognitionEngineAdapter::new(&VadConfig::default(), 16_000);
//! let audio: Vec<f32> = vec![0.0; 16_000];
//! for seg in adapter.recognize(&mut engine, &audio) {
//!     println!("[{} → {}] {}", seg.start_ms, seg.end_ms, seg.text);
//! }
//! ```

pub mod adapter;
pub mod engine;
pub mod model;
pub mod transcribe;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use adapter::{sanitize, RecognitionEngineAdapter};
pub use engine::{SpeechRecognizer, SttError, UnloadedRecognizer, WhisperEngine};
pub use model::{find_model_by_id, ModelInfo, ModelPaths, ModelSize, WHISPER_MODELS};
pub use transcribe::{DecodeOptions, SamplingStrategy, Segment};

#[cfg(test)]
pub use engine::MockRecognizer;
