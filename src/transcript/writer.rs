//! Transcript persistence: `<dir>/<stem>.txt` and an optional JSON segment dump.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::stt::Segment;

/// JSON document written next to the text transcript.
#[derive(Debug, Serialize)]
struct SegmentDump<'a> {
    source: &'a str,
    transcript: &'a str,
    segments: &'a [Segment],
}

/// Files produced for one recording.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptFiles {
    pub text: PathBuf,
    pub json: Option<PathBuf>,
}

/// Writes transcripts into a fixed directory.
#[derive(Debug, Clone)]
pub struct TranscriptWriter {
    dir: PathBuf,
}

impl TranscriptWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `transcript` as `<stem>.txt`, plus `<stem>.json` when
    /// `segments` is given.  The directory is created if needed.
    pub fn write(
        &self,
        stem: &str,
        transcript: &str,
        segments: Option<&[Segment]>,
    ) -> Result<TranscriptFiles> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating transcript dir {}", self.dir.display()))?;

        let text = self.dir.join(format!("{stem}.txt"));
        std::fs::write(&text, transcript)
            .with_context(|| format!("writing {}", text.display()))?;

        let json = match segments {
            Some(segments) => {
                let path = self.dir.join(format!("{stem}.json"));
                let dump = SegmentDump {
                    source: stem,
                    transcript,
                    segments,
                };
                let body = serde_json::to_string_pretty(&dump)?;
                std::fs::write(&path, body)
                    .with_context(|| format!("writing {}", path.display()))?;
                Some(path)
            }
            None => None,
        };

        log::info!("transcript: wrote {}", text.display());
        Ok(TranscriptFiles { text, json })
    }
}
