//! Speaker attribution stage.
//!
//! [`DiarizationAdapter`] asks a [`SpeakerDiarizer`] for speaker turns and
//! assigns one speaker to each recognized segment.  Diarization enriches the
//! transcript but is never required: when the engine is missing or fails,
//! the segments pass through untouched.

use std::time::Instant;

use super::engine::{SpeakerDiarizer, SpeakerTurn};
use crate::audio::ConditionedAudio;
use crate::stt::Segment;

/// Outcome of the attribution stage.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribution {
    /// Speakers were assigned (some segments may still have none).
    Labeled(Vec<Segment>),
    /// Diarization was unavailable or failed; segments are unchanged.
    Degraded(Vec<Segment>),
}

impl Attribution {
    pub fn into_segments(self) -> Vec<Segment> {
        match self {
            Self::Labeled(s) | Self::Degraded(s) => s,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DiarizationAdapter;

impl DiarizationAdapter {
    /// Attribute speakers to `segments`.
    pub fn diarize(
        &self,
        diarizer: Option<&mut dyn SpeakerDiarizer>,
        audio: &ConditionedAudio,
        segments: Vec<Segment>,
    ) -> Attribution {
        let Some(diarizer) = diarizer else {
            log::info!("diarize: disabled");
            return Attribution::Degraded(segments);
        };

        let t0 = Instant::now();
        match diarizer.diarize(audio) {
            Ok(turns) => {
                let labeled = assign_speakers(segments, &turns);
                log::info!(
                    "diarize: {} turns aligned to {} segments in {:.2?}",
                    turns.len(),
                    labeled.len(),
                    t0.elapsed()
                );
                Attribution::Labeled(labeled)
            }
            Err(e) => {
                log::warn!("diarize: continuing without speaker labels: {e}");
                Attribution::Degraded(segments)
            }
        }
    }
}

/// Give each segment the speaker of the turn it overlaps most.  Equal
/// overlaps go to the turn whose start is nearest the segment start.  A
/// segment overlapping no turn keeps no speaker.
pub fn assign_speakers(segments: Vec<Segment>, turns: &[SpeakerTurn]) -> Vec<Segment> {
    segments
        .into_iter()
        .map(|mut seg| {
            seg.speaker = best_turn(&seg, turns).map(|t| t.speaker.clone());
            seg
        })
        .collect()
}

fn best_turn<'a>(seg: &Segment, turns: &'a [SpeakerTurn]) -> Option<&'a SpeakerTurn> {
    turns
        .iter()
        .map(|t| (t, seg.overlap_ms(t.start_ms, t.end_ms)))
        .filter(|&(_, overlap)| overlap > 0)
        .min_by_key(|&(t, overlap)| (std::cmp::Reverse(overlap), t.start_ms.abs_diff(seg.start_ms)))
        .map(|(t, _)| t)
}
