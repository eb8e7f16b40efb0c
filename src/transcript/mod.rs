//! Transcript assembly, normalization and persistence.
//!
//! ```text
//! Vec<Segment> ──▶ assemble ──▶ raw text ──▶ TextNormalizer ──▶ final text
//!                                                                  │
//!                                              TranscriptWriter ◀──┘
//! ```

pub mod assemble;
pub mod normalize;
pub mod writer;

pub use assemble::{assemble, speaker_marker};
pub use normalize::TextNormalizer;
pub use writer::{TranscriptFiles, TranscriptWriter};
