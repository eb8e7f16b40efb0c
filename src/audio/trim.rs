//! Leading/trailing silence trimming relative to the loudest frame.
//!
//! [`SilenceTrimmer`] removes dead air from both ends of a recording without
//! touching pauses inside the speech.
//!
//! ## Algorithm
//!
//! The buffer is cut into centred frames of `frame_length` samples every
//! `hop_length` samples (zero-padded at the edges).  Each frame's mean power
//! is compared with the loudest frame; frames more than `top_db` below it
//! are silence.  The result spans from the first non-silent frame's hop
//! position to the end of the last non-silent frame's hop.

use std::ops::Range;

/// Power floor used when converting to decibels.
const AMIN: f64 = 1e-10;

// ---------------------------------------------------------------------------
// SilenceTrimmer
// ---------------------------------------------------------------------------

/// Energy-based edge trimmer.
///
/// ```rust
/// use session_transcriber::audio::SilenceTrimmer;
///
/// let trimmer = SilenceTrimmer::new(35.0, 2048, 512);
///
/// let mut audio = vec![0.0_f32; 8_192];
/// audio.extend(vec![0.5_f32; 8_192]);
/// audio.extend(vec![0.0_f32; 8_192]);
///
/// let kept = trimmer.trim(&audio);
/// assert!(kept.len() < audio.len());
/// assert!(kept.len() >= 8_192);
/// ```
#[derive(Debug, Clone)]
pub struct SilenceTrimmer {
    top_db: f32,
    frame_length: usize,
    hop_length: usize,
}

impl SilenceTrimmer {
    /// Create a trimmer.  `frame_length` and `hop_length` are clamped to at
    /// least one sample.
    pub fn new(top_db: f32, frame_length: usize, hop_length: usize) -> Self {
        Self {
            top_db,
            frame_length: frame_length.max(1),
            hop_length: hop_length.max(1),
        }
    }

    /// Threshold below the peak frame, in dB.
    pub fn top_db(&self) -> f32 {
        self.top_db
    }

    /// Mean power of every centred frame.
    fn frame_powers(&self, audio: &[f32]) -> Vec<f64> {
        let half = (self.frame_length / 2) as isize;
        let n_frames = 1 + audio.len() / self.hop_length;

        (0..n_frames)
            .map(|i| {
                let centre = (i * self.hop_length) as isize;
                let start = (centre - half).max(0) as usize;
                let end = ((centre - half) + self.frame_length as isize)
                    .clamp(0, audio.len() as isize) as usize;
                let energy: f64 = audio[start.min(end)..end]
                    .iter()
                    .map(|&s| f64::from(s) * f64::from(s))
                    .sum();
                energy / self.frame_length as f64
            })
            .collect()
    }

    /// Sample range that survives trimming.  Empty when the whole buffer is
    /// digital silence.
    pub fn trim_range(&self, audio: &[f32]) -> Range<usize> {
        if audio.is_empty() {
            return 0..0;
        }

        let powers = self.frame_powers(audio);
        let peak = powers.iter().copied().fold(0.0_f64, f64::max);
        if peak <= 0.0 {
            return 0..0;
        }

        let ref_db = 10.0 * peak.max(AMIN).log10();
        let threshold = -f64::from(self.top_db);
        let is_voiced = |p: &f64| 10.0 * p.max(AMIN).log10() - ref_db > threshold;

        let Some(first) = powers.iter().position(is_voiced) else {
            return 0..0;
        };
        let last = powers.iter().rposition(is_voiced).unwrap_or(first);

        let start = (first * self.hop_length).min(audio.len());
        let end = ((last + 1) * self.hop_length).min(audio.len());
        start..end
    }

    /// Trimmed sub-slice of `audio`; no allocation.
    pub fn trim<'a>(&self, audio: &'a [f32]) -> &'a [f32] {
        &audio[self.trim_range(audio)]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
