//! Recognition stage: conditioned audio → ordered segment list.
//!
//! The adapter cuts the buffer into speech chunks with [`SpeechDetector`],
//! hands each chunk to the recognizer, shifts the returned timestamps back
//! to file time and sanitises the result.  Engine errors are logged and
//! turned into an empty list; the orchestrator decides what empty means.

use std::time::Instant;

use crate::audio::SpeechDetector;
use crate::config::VadConfig;
use crate::stt::engine::{SpeechRecognizer, SttError};
use crate::stt::transcribe::Segment;

/// Whisper's timestamp resolution; used to widen zero-length segments.
const MIN_SEGMENT_MS: u64 = 10;

/// Drives a [`SpeechRecognizer`] over a whole conditioned recording.
#[derive(Debug, Clone)]
pub struct RecognitionEngineAdapter {
    detector: SpeechDetector,
    chunk_samples: usize,
    sample_rate: u32,
}

impl RecognitionEngineAdapter {
    pub fn new(vad: &VadConfig, sample_rate: u32) -> Self {
        Self {
            detector: SpeechDetector::new(vad.onset, vad.offset, sample_rate),
            chunk_samples: (vad.chunk_secs * sample_rate as f32) as usize,
            sample_rate: sample_rate.max(1),
        }
    }

    /// Recognize `audio`.  Never fails: engine errors yield an empty list.
    pub fn recognize(&self, engine: &mut dyn SpeechRecognizer, audio: &[f32]) -> Vec<Segment> {
        let t0 = Instant::now();
        let result = self.try_recognize(engine, audio);
        let elapsed = t0.elapsed();

        match result {
            Ok(segments) => {
                log::info!(
                    "stt: {} segments from {:.1}s of audio in {:.2?}",
                    segments.len(),
                    audio.len() as f32 / self.sample_rate as f32,
                    elapsed
                );
                segments
            }
            Err(e) => {
                log::error!("stt: recognition failed after {elapsed:.2?}: {e}");
                Vec::new()
            }
        }
    }

    /// Recognize `audio`, surfacing the first engine error.
    pub fn try_recognize(
        &self,
        engine: &mut dyn SpeechRecognizer,
        audio: &[f32],
    ) -> Result<Vec<Segment>, SttError> {
        let chunks = self.detector.chunks(audio, self.chunk_samples);
        if chunks.is_empty() {
            log::info!("stt: no speech detected");
            return Ok(Vec::new());
        }
        log::debug!("stt: {} speech chunks", chunks.len());

        let mut segments = Vec::new();
        for chunk in chunks {
            let offset_ms = self.samples_to_ms(chunk.start);
            let chunk_end_ms = self.samples_to_ms(chunk.end);

            for mut seg in engine.recognize(&audio[chunk])? {
                seg.start_ms = (seg.start_ms + offset_ms).min(chunk_end_ms);
                seg.end_ms = (seg.end_ms + offset_ms).min(chunk_end_ms);
                segments.push(seg);
            }
        }

        Ok(sanitize(segments))
    }

    fn samples_to_ms(&self, samples: usize) -> u64 {
        samples as u64 * 1_000 / u64::from(self.sample_rate)
    }
}

/// Sort by start time and widen segments whose end is not after their
/// start.  Nothing is dropped.
pub fn sanitize(mut segments: Vec<Segment>) -> Vec<Segment> {
    segments.sort_by_key(|s| s.start_ms);
    for seg in &mut segments {
        if seg.end_ms <= seg.start_ms {
            seg.end_ms = seg.start_ms + MIN_SEGMENT_MS;
        }
    }
    segments
}
