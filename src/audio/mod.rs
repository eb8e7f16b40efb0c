//! Audio processing: decoding, conditioning and voice-activity chunking.
//!
//! # Pipeline
//!
//! ```text
//! upload (wav/mp3/m4a/flac) → symphonia decode → stereo_to_mono → rubato resample
//!     → HighPassFilter::filtfilt → SilenceTrimmer → NoiseReducer → normalize
//!     → AudioQuality → processed_<stem>.wav
//! ```
//!
//! [`SignalConditioner`] runs the whole chain; [`SpeechDetector`] is used
//! later by the recognizer to cut the conditioned buffer into speech chunks.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use session_transcriber::audio::{Conditioner, SignalConditioner};
//! use session_transcriber::config::ConditioningConfig;
//!
//! let conditioner = SignalConditioner::new(ConditioningConfig::default()).unwrap();
//! if let Some(out) = conditioner.condition(Path::new("uploads/session.m4a")) {
//!     println!("{} ({:?})", out.path().display(), out.asset.duration);
//! }
//! ```

pub mod asset;
pub mod conditioner;
pub mod decode;
pub mod denoise;
pub mod filter;
pub mod normalize;
pub mod quality;
pub mod resample;
pub mod trim;
pub mod vad;
pub mod wav;

pub use asset::{AudioAsset, ConditionedAudio};
pub use conditioner::{Conditioner, SignalConditioner};
pub use decode::{decode_file, DecodedAudio};
pub use denoise::NoiseReducer;
pub use filter::HighPassFilter;
pub use normalize::{dbfs_to_linear, normalize};
pub use quality::{AudioError, AudioQuality};
pub use resample::{resample, stereo_to_mono};
pub use trim::SilenceTrimmer;
pub use vad::SpeechDetector;
pub use wav::{read_wav, write_wav};
