//! Speaker-diarization engine trait and the RTTM-backed implementation.
//!
//! [`SpeakerDiarizer`] answers "who spoke when" for a conditioned recording.
//! The production binding is [`RttmDiarizer`], which reads the standard
//! RTTM output an external diarization engine writes for each recording.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::audio::ConditionedAudio;

/// Prefix the conditioner gives its artifacts.
const CONDITIONED_PREFIX: &str = "processed_";

// ---------------------------------------------------------------------------
// DiarizeError
// ---------------------------------------------------------------------------

/// Reasons diarization could not produce speaker turns.
#[derive(Debug, Error)]
pub enum DiarizeError {
    /// No diarization output exists for this recording.
    #[error("diarization unavailable: {0}")]
    Unavailable(String),

    /// The diarization output could not be read.
    #[error("diarization I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A line of diarization output is malformed.
    #[error("malformed RTTM at line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

// ---------------------------------------------------------------------------
// SpeakerTurn
// ---------------------------------------------------------------------------

/// One contiguous stretch attributed to a single speaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerTurn {
    pub start_ms: u64,
    pub end_ms: u64,
    pub speaker: String,
}

impl SpeakerTurn {
    pub fn new(start_ms: u64, end_ms: u64, speaker: impl Into<String>) -> Self {
        Self {
            start_ms,
            end_ms,
            speaker: speaker.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// SpeakerDiarizer trait
// ---------------------------------------------------------------------------

/// Object-safe interface for diarization engines.
pub trait SpeakerDiarizer: Send {
    /// Speaker turns for `audio`, in any order.
    fn diarize(&mut self, audio: &ConditionedAudio) -> Result<Vec<SpeakerTurn>, DiarizeError>;

    /// Drop transient per-run state.
    fn release(&mut self) {}
}

// ---------------------------------------------------------------------------
// RttmDiarizer
// ---------------------------------------------------------------------------

/// Which clock an RTTM file's times are measured on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RttmTimeline {
    /// Produced from the conditioned artifact (`processed_<stem>.rttm`).
    Conditioned,
    /// Produced from the recording as uploaded (`<stem>.rttm`); still
    /// includes the leading silence the conditioner trimmed.
    Source,
}

/// Reads `<dir>/<stem>.rttm` for each recording.
///
/// `dir` defaults to the directory of the conditioned artifact.  Lookup
/// order is the conditioned stem (`processed_x`), the stem the user
/// supplied before upload staging, then the staged upload stem.  Turns from
/// a source-timeline file are shifted onto the conditioned timeline.
#[derive(Debug, Clone, Default)]
pub struct RttmDiarizer {
    rttm_dir: Option<PathBuf>,
}

impl RttmDiarizer {
    pub fn new(rttm_dir: Option<PathBuf>) -> Self {
        Self { rttm_dir }
    }

    /// Candidate RTTM files for `audio`, in lookup order.
    pub fn candidates(&self, audio: &ConditionedAudio) -> Vec<(PathBuf, RttmTimeline)> {
        let conditioned = audio.path();
        let dir = self
            .rttm_dir
            .clone()
            .or_else(|| conditioned.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        let stem = conditioned
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();

        let mut out = vec![(dir.join(format!("{stem}.rttm")), RttmTimeline::Conditioned)];
        let source_stems = audio
            .source_stem
            .as_deref()
            .into_iter()
            .chain(stem.strip_prefix(CONDITIONED_PREFIX));
        for source in source_stems {
            let path = dir.join(format!("{source}.rttm"));
            if out.iter().all(|(p, _)| *p != path) {
                out.push((path, RttmTimeline::Source));
            }
        }
        out
    }
}

impl SpeakerDiarizer for RttmDiarizer {
    fn diarize(&mut self, audio: &ConditionedAudio) -> Result<Vec<SpeakerTurn>, DiarizeError> {
        let candidates = self.candidates(audio);
        let Some((path, timeline)) = candidates.iter().find(|(p, _)| p.is_file()) else {
            return Err(DiarizeError::Unavailable(format!(
                "no RTTM file at {}",
                candidates
                    .iter()
                    .map(|(p, _)| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(" or ")
            )));
        };

        let content = std::fs::read_to_string(path).map_err(|source| DiarizeError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut turns = parse_rttm(&content)?;
        if *timeline == RttmTimeline::Source {
            turns = shift_turns(turns, audio.trim_offset_ms);
        }
        log::debug!(
            "diarize: {} turns from {} ({timeline:?} timeline)",
            turns.len(),
            path.display()
        );
        Ok(turns)
    }
}

/// Move turns `offset_ms` earlier.  Turns that end before the offset are
/// dropped; turns straddling it start at zero.
pub fn shift_turns(turns: Vec<SpeakerTurn>, offset_ms: u64) -> Vec<SpeakerTurn> {
    turns
        .into_iter()
        .filter(|t| t.end_ms > offset_ms)
        .map(|t| SpeakerTurn {
            start_ms: t.start_ms.saturating_sub(offset_ms),
            end_ms: t.end_ms - offset_ms,
            speaker: t.speaker,
        })
        .collect()
}

/// Parse the `SPEAKER` records of an RTTM document.
///
/// ```text
/// SPEAKER <file> <chan> <onset s> <duration s> <NA> <NA> <speaker> <NA> <NA>
/// ```
///
/// Other record types, blank lines and `#` comments are ignored.
pub fn parse_rttm(content: &str) -> Result<Vec<SpeakerTurn>, DiarizeError> {
    let mut turns = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields[0] != "SPEAKER" {
            continue;
        }
        let parse_err = |reason: String| DiarizeError::Parse {
            line: idx + 1,
            reason,
        };
        if fields.len() < 8 {
            return Err(parse_err(format!("expected ≥8 fields, got {}", fields.len())));
        }

        let seconds = |field: &str, what: &str| -> Result<f64, DiarizeError> {
            field
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .ok_or_else(|| parse_err(format!("invalid {what} '{field}'")))
        };
        let onset = seconds(fields[3], "onset")?;
        let duration = seconds(fields[4], "duration")?;

        let start_ms = (onset * 1_000.0).round() as u64;
        let end_ms = ((onset + duration) * 1_000.0).round() as u64;
        turns.push(SpeakerTurn::new(start_ms, end_ms, fields[7]));
    }

    Ok(turns)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
