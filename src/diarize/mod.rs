//! Speaker diarization: who spoke when, aligned to recognized segments.
//!
//! ```text
//! ConditionedAudio ──▶ dyn SpeakerDiarizer (RttmDiarizer) ──▶ Vec<SpeakerTurn>
//!                                                                  │
//! Vec<Segment> ─────────────────────────────▶ assign_speakers ◀───┘
//! ```

pub mod align;
pub mod engine;

pub use align::{assign_speakers, Attribution, DiarizationAdapter};
pub use engine::{
    parse_rttm, shift_turns, DiarizeError, RttmDiarizer, RttmTimeline, SpeakerDiarizer,
    SpeakerTurn,
};
