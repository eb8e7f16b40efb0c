//! Energy-based voice-activity detection with onset/offset hysteresis.
//!
//! [`SpeechDetector`] locates speech regions in conditioned 16 kHz mono
//! audio and packs them into recognition chunks no longer than a configured
//! duration.  Sending only speech to the recognizer:
//!
//! * reduces decoding time, and
//! * keeps Whisper from hallucinating text over long quiet stretches.
//!
//! ## Algorithm
//!
//! Audio is split into 30 ms frames and each frame's RMS level is scored
//! twice:
//!
//! * relative to the loudest frame (`0 dB → 1.0`, `-60 dB → 0.0`);
//! * on an absolute scale (`-30 dBFS → 1.0`, `-60 dBFS → 0.0`).
//!
//! The speech probability is the larger score, so a single loud transient
//! cannot push quieter speech below the onset.  A region opens when the
//! probability reaches `onset` and closes when it drops below `offset`;
//! `onset > offset` keeps short dips inside a word from splitting the region.

use std::ops::Range;

/// Level range mapped onto the `[0, 1]` speech probability.
const DYNAMIC_RANGE_DB: f32 = 60.0;

/// Absolute level scored as certain speech.
const SPEECH_DBFS: f32 = -30.0;

/// Absolute level scored as certain silence.
const FLOOR_DBFS: f32 = -60.0;

// ---------------------------------------------------------------------------
// SpeechDetector
// ---------------------------------------------------------------------------

/// Hysteresis voice-activity detector.
///
/// ```rust
/// use session_transcriber::audio::SpeechDetector;
///
/// let vad = SpeechDetector::new(0.45, 0.363, 16_000);
///
/// let mut audio = vec![0.0_f32; 4_800];
/// audio.extend(vec![0.5_f32; 4_800]);
/// audio.extend(vec![0.0_f32; 4_800]);
///
/// let regions = vad.regions(&audio);
/// assert_eq!(regions, vec![4_800..9_600]);
/// ```
#[derive(Debug, Clone)]
pub struct SpeechDetector {
    onset: f32,
    offset: f32,
    frame_size: usize,
}

impl SpeechDetector {
    /// Create a detector with 30 ms frames at `sample_rate`.
    pub fn new(onset: f32, offset: f32, sample_rate: u32) -> Self {
        Self {
            onset,
            offset,
            frame_size: (sample_rate as usize * 30 / 1_000).max(1),
        }
    }

    /// Frame size in samples.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Per-frame speech probability.
    fn probabilities(&self, audio: &[f32]) -> Vec<f32> {
        let levels: Vec<f32> = audio
            .chunks(self.frame_size)
            .map(|frame| {
                let mean_sq = frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32;
                mean_sq.sqrt()
            })
            .collect();

        let peak = levels.iter().copied().fold(0.0_f32, f32::max);
        if peak <= 0.0 {
            return vec![0.0; levels.len()];
        }

        levels
            .iter()
            .map(|&rms| {
                if rms <= 0.0 {
                    return 0.0;
                }
                let relative = 1.0 + 20.0 * (rms / peak).log10() / DYNAMIC_RANGE_DB;
                let absolute = (20.0 * rms.log10() - FLOOR_DBFS) / (SPEECH_DBFS - FLOOR_DBFS);
                relative.max(absolute).clamp(0.0, 1.0)
            })
            .collect()
    }

    /// Speech regions as sample ranges, in order and non-overlapping.
    pub fn regions(&self, audio: &[f32]) -> Vec<Range<usize>> {
        let mut regions = Vec::new();
        let mut open: Option<usize> = None;

        for (i, p) in self.probabilities(audio).into_iter().enumerate() {
            match open {
                None if p >= self.onset => open = Some(i),
                Some(start) if p < self.offset => {
                    regions.push(start * self.frame_size..i * self.frame_size);
                    open = None;
                }
                _ => {}
            }
        }

        if let Some(start) = open {
            regions.push(start * self.frame_size..audio.len());
        }
        regions
    }

    /// Speech regions packed greedily into chunks of at most `max_chunk`
    /// samples.  Regions longer than `max_chunk` are split first.  Gaps
    /// between merged regions stay inside the chunk.
    pub fn chunks(&self, audio: &[f32], max_chunk: usize) -> Vec<Range<usize>> {
        let max_chunk = max_chunk.max(1);

        let pieces = self.regions(audio).into_iter().flat_map(|r| {
            (r.start..r.end)
                .step_by(max_chunk)
                .map(move |s| s..(s + max_chunk).min(r.end))
        });

        let mut chunks = Vec::new();
        let mut current: Option<Range<usize>> = None;

        for piece in pieces {
            current = match current {
                Some(cur) if piece.end - cur.start <= max_chunk => Some(cur.start..piece.end),
                Some(cur) => {
                    chunks.push(cur);
                    Some(piece)
                }
                None => Some(piece),
            };
        }
        chunks.extend(current);
        chunks
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
