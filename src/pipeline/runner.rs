//! Pipeline orchestrator: upload path → final transcript.
//!
//! [`TranscriptionPipeline`] owns an [`EngineHandle`] and a [`Conditioner`]
//! and runs one recording at a time through every stage.
//!
//! # Pipeline flow
//!
//! ```text
//! run(input)
//!   ├─ Validating    engine ready? input is a file?     ─▶ Failed(Precondition)
//!   ├─ Conditioning  Conditioner::condition              ─▶ Failed(Preprocessing)
//!   ├─ Recognizing   RecognitionEngineAdapter::recognize ─▶ Failed(Recognition)
//!   ├─ Diarizing     DiarizationAdapter::diarize          (degrades, never fails)
//!   ├─ Assembling    assemble
//!   ├─ Normalizing   TextNormalizer::normalize
//!   └─ Done
//! finally: EngineHandle::release  (exactly once, every exit path)
//! ```
//!
//! Stage failures become [`PipelineError`] values; a panic inside a stage is
//! caught at the run boundary and reported as
//! [`PipelineError::Unexpected`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::audio::{AudioError, Conditioner, SignalConditioner};
use crate::config::PipelineConfig;
use crate::diarize::{DiarizationAdapter, RttmDiarizer, SpeakerDiarizer};
use crate::stt::{
    DecodeOptions, ModelPaths, RecognitionEngineAdapter, Segment, SpeechRecognizer,
    UnloadedRecognizer, WhisperEngine,
};
use crate::transcript::{assemble, TextNormalizer};
use crate::upload::StagedUpload;

use super::state::{PipelineError, PipelineState};

// ---------------------------------------------------------------------------
// EngineHandle
// ---------------------------------------------------------------------------

/// The heavyweight engines one pipeline drives.
///
/// Built once, handed to the pipeline, and disposed explicitly when the
/// pipeline shuts down.  Engines are not thread-safe; at most one run uses a
/// handle at a time.
pub struct EngineHandle {
    recognizer: Box<dyn SpeechRecognizer>,
    diarizer: Option<Box<dyn SpeakerDiarizer>>,
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("ready", &self.recognizer.is_ready())
            .field("diarizer", &self.diarizer.is_some())
            .finish()
    }
}

impl EngineHandle {
    pub fn new(
        recognizer: Box<dyn SpeechRecognizer>,
        diarizer: Option<Box<dyn SpeakerDiarizer>>,
    ) -> Self {
        Self {
            recognizer,
            diarizer,
        }
    }

    /// Load the engines `config` asks for.
    ///
    /// A model that cannot be loaded does not abort construction: the
    /// handle reports not-ready and every run fails its precondition check.
    pub fn from_config(config: &PipelineConfig, models: &ModelPaths) -> Self {
        let options = DecodeOptions::from_config(&config.stt);
        let recognizer: Box<dyn SpeechRecognizer> = match models
            .resolve(&config.stt)
            .and_then(|path| WhisperEngine::load(&path, options, config.stt.use_gpu))
        {
            Ok(engine) => Box::new(engine),
            Err(e) => {
                log::warn!("pipeline: recognizer unavailable ({e}); runs will fail validation");
                Box::new(UnloadedRecognizer::new(e.to_string()))
            }
        };

        let diarizer: Option<Box<dyn SpeakerDiarizer>> = if config.diarization.enabled {
            Some(Box::new(RttmDiarizer::new(config.diarization.rttm_dir.clone())))
        } else {
            None
        };

        Self::new(recognizer, diarizer)
    }

    /// Whether the recognizer can serve requests.
    pub fn is_ready(&self) -> bool {
        self.recognizer.is_ready()
    }

    /// Drop per-run engine state.
    pub fn release(&mut self) {
        self.recognizer.release();
        if let Some(d) = self.diarizer.as_mut() {
            d.release();
        }
    }

    /// Release and drop the engines.
    pub fn dispose(mut self) {
        self.release();
        log::info!("pipeline: engines disposed");
    }
}

// ---------------------------------------------------------------------------
// TranscriptionOutput
// ---------------------------------------------------------------------------

/// Everything a successful run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionOutput {
    /// Final normalized transcript.
    pub text: String,
    /// Segments after speaker attribution.
    pub segments: Vec<Segment>,
    /// The conditioned artifact the run recognized.
    pub conditioned: PathBuf,
    /// `false` when diarization was disabled or degraded.
    pub speakers_attributed: bool,
}

// ---------------------------------------------------------------------------
// TranscriptionPipeline
// ---------------------------------------------------------------------------

/// Sequential transcription orchestrator.
///
/// ```rust,no_run
/// use std::path::Path;
/// use session_transcriber::config::{AppPaths, PipelineConfig};
/// use session_transcriber::pipeline::{EngineHandle, TranscriptionPipeline};
/// use session_transcriber::stt::ModelPaths;
///
/// let config = PipelineConfig::default();
/// let engine = EngineHandle::from_config(&config, &ModelPaths::from_app_paths(&AppPaths::new()));
/// let mut pipeline = TranscriptionPipeline::from_config(&config, engine).unwrap();
///
/// let text = pipeline.transcribe(Path::new("uploads/session.wav"));
/// println!("{text}");
/// ```
pub struct TranscriptionPipeline {
    engine: EngineHandle,
    conditioner: Box<dyn Conditioner>,
    recognition: RecognitionEngineAdapter,
    diarization: DiarizationAdapter,
    normalizer: TextNormalizer,
    state: PipelineState,
    trace: Vec<PipelineState>,
}

impl TranscriptionPipeline {
    pub fn new(
        config: &PipelineConfig,
        engine: EngineHandle,
        conditioner: Box<dyn Conditioner>,
    ) -> Self {
        Self {
            engine,
            conditioner,
            recognition: RecognitionEngineAdapter::new(
                &config.vad,
                config.conditioning.sample_rate,
            ),
            diarization: DiarizationAdapter,
            normalizer: TextNormalizer::new(),
            state: PipelineState::Idle,
            trace: Vec::new(),
        }
    }

    /// Build with the production [`SignalConditioner`].
    pub fn from_config(config: &PipelineConfig, engine: EngineHandle) -> Result<Self, AudioError> {
        let conditioner = SignalConditioner::new(config.conditioning.clone())?;
        Ok(Self::new(config, engine, Box::new(conditioner)))
    }

    /// State reached by the most recent run.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Every state the most recent run entered, in order.
    pub fn trace(&self) -> &[PipelineState] {
        &self.trace
    }

    /// Transcribe `input`; an empty string signals failure.
    pub fn transcribe(&mut self, input: &Path) -> String {
        self.run(input).unwrap_or_default()
    }

    /// Transcribe `input` and return the final text.
    pub fn run(&mut self, input: &Path) -> Result<String, PipelineError> {
        self.run_detailed(input).map(|out| out.text)
    }

    /// Transcribe `input` and return the text with its segments.
    pub fn run_detailed(&mut self, input: &Path) -> Result<TranscriptionOutput, PipelineError> {
        self.execute(input, None)
    }

    /// Transcribe a staged upload.  The name the user gave the recording is
    /// kept for diarization lookup.
    pub fn run_upload(
        &mut self,
        upload: &StagedUpload,
    ) -> Result<TranscriptionOutput, PipelineError> {
        self.execute(&upload.path, Some(&upload.original_stem))
    }

    fn execute(
        &mut self,
        input: &Path,
        source_stem: Option<&str>,
    ) -> Result<TranscriptionOutput, PipelineError> {
        self.trace.clear();
        let started = Instant::now();

        let stages = AssertUnwindSafe(|| self.run_stages(input, source_stem));
        let outcome = panic::catch_unwind(stages)
            .unwrap_or_else(|payload| Err(PipelineError::Unexpected(panic_message(&*payload))));

        self.engine.release();

        match &outcome {
            Ok(out) => {
                self.enter(PipelineState::Done);
                log::info!(
                    "pipeline: {} done in {:.2?} ({} segments, {} chars)",
                    input.display(),
                    started.elapsed(),
                    out.segments.len(),
                    out.text.chars().count()
                );
            }
            Err(e) => {
                self.enter(PipelineState::Failed(e.reason()));
                log::error!(
                    "pipeline: {} failed after {:.2?} [{}]: {e}",
                    input.display(),
                    started.elapsed(),
                    e.reason().label()
                );
            }
        }

        outcome
    }

    /// Release the engines and drop the pipeline.
    pub fn dispose(self) {
        self.engine.dispose();
    }

    fn enter(&mut self, state: PipelineState) {
        log::debug!("pipeline: → {}", state.label());
        self.state = state;
        self.trace.push(state);
    }

    fn run_stages(
        &mut self,
        input: &Path,
        source_stem: Option<&str>,
    ) -> Result<TranscriptionOutput, PipelineError> {
        // ── Validating ───────────────────────────────────────────────────
        self.enter(PipelineState::Validating);
        if !self.engine.is_ready() {
            return Err(PipelineError::Precondition(
                "recognition engine is not initialised".into(),
            ));
        }
        if !input.is_file() {
            return Err(PipelineError::Precondition(format!(
                "audio file not found: {}",
                input.display()
            )));
        }

        // ── Conditioning ─────────────────────────────────────────────────
        self.enter(PipelineState::Conditioning);
        let t = Instant::now();
        let mut conditioned = self
            .conditioner
            .condition(input)
            .ok_or_else(|| PipelineError::Preprocessing(input.display().to_string()))?;
        if let Some(stem) = source_stem {
            conditioned.source_stem = Some(stem.to_string());
        }
        log::info!("pipeline: conditioning took {:.2?}", t.elapsed());

        // ── Recognizing ──────────────────────────────────────────────────
        self.enter(PipelineState::Recognizing);
        let segments = self
            .recognition
            .recognize(self.engine.recognizer.as_mut(), &conditioned.samples);
        if segments.iter().all(|s| s.text.trim().is_empty()) {
            return Err(PipelineError::Recognition);
        }

        // ── Diarizing ────────────────────────────────────────────────────
        self.enter(PipelineState::Diarizing);
        let diarizer = self
            .engine
            .diarizer
            .as_mut()
            .map(|d| d.as_mut() as &mut dyn SpeakerDiarizer);
        let attribution = self.diarization.diarize(diarizer, &conditioned, segments);
        let speakers_attributed = !attribution.is_degraded();
        let segments = attribution.into_segments();

        // ── Assembling / Normalizing ─────────────────────────────────────
        self.enter(PipelineState::Assembling);
        let raw = assemble(&segments);
        log::debug!("pipeline: raw transcript {raw:?}");

        self.enter(PipelineState::Normalizing);
        let text = self.normalizer.normalize(&raw);

        Ok(TranscriptionOutput {
            text,
            segments,
            conditioned: conditioned.asset.path,
            speakers_attributed,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "stage panicked".into())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::audio::{AudioAsset, ConditionedAudio};
    use crate::audio::write_wav;
    use crate::config::StorageConfig;
    use crate::diarize::{DiarizeError, SpeakerTurn};
    use crate::pipeline::state::FailureReason;
    use crate::stt::{MockRecognizer, SttError};
    use crate::upload::UploadStore;
    use tempfile::{tempdir, TempDir};

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Conditioner that returns two seconds of "speech" or nothing.
    struct StubConditioner {
        succeed: bool,
        calls: Arc<AtomicUsize>,
    }

    impl StubConditioner {
        fn new(succeed: bool) -> Self {
            Self {
                succeed,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl Conditioner for StubConditioner {
        fn condition(&self, input: &Path) -> Option<ConditionedAudio> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.succeed.then(|| {
                let samples = vec![0.5_f32; 32_000];
                ConditionedAudio::new(
                    AudioAsset::mono(
                        input.with_file_name("processed_stub.wav"),
                        16_000,
                        samples.len(),
                    ),
                    samples,
                )
            })
        }
    }

    struct StubDiarizer {
        turns: Option<Vec<SpeakerTurn>>,
        releases: Arc<AtomicUsize>,
    }

    impl SpeakerDiarizer for StubDiarizer {
        fn diarize(&mut self, _: &ConditionedAudio) -> Result<Vec<SpeakerTurn>, DiarizeError> {
            self.turns
                .clone()
                .ok_or_else(|| DiarizeError::Unavailable("stub offline".into()))
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn hello_segments() -> Vec<Segment> {
        vec![
            Segment::new(0, 1_000, "hello hello"),
            Segment::new(1_000, 2_000, "world"),
        ]
    }

    /// An existing (empty) upload so validation passes.
    fn upload() -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.wav");
        std::fs::write(&path, b"").unwrap();
        (dir, path)
    }

    fn pipeline(
        recognizer: MockRecognizer,
        diarizer: Option<Box<dyn SpeakerDiarizer>>,
        conditioner: StubConditioner,
    ) -> TranscriptionPipeline {
        TranscriptionPipeline::new(
            &PipelineConfig::default(),
            EngineHandle::new(Box::new(recognizer), diarizer),
            Box::new(conditioner),
        )
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[test]
    fn end_to_end_with_stubs_yields_hello_world() {
        let (_dir, input) = upload();
        let mut p = pipeline(
            MockRecognizer::ok(hello_segments()),
            None,
            StubConditioner::new(true),
        );

        assert_eq!(p.transcribe(&input), "hello world");
        assert_eq!(p.state(), PipelineState::Done);
    }

    #[test]
    fn successful_run_visits_every_state_in_order() {
        let (_dir, input) = upload();
        let mut p = pipeline(
            MockRecognizer::ok(hello_segments()),
            None,
            StubConditioner::new(true),
        );
        p.run(&input).unwrap();

        assert_eq!(
            p.trace(),
            &[
                PipelineState::Validating,
                PipelineState::Conditioning,
                PipelineState::Recognizing,
                PipelineState::Diarizing,
                PipelineState::Assembling,
                PipelineState::Normalizing,
                PipelineState::Done,
            ]
        );
    }

    #[test]
    fn preprocessing_failure_is_empty_and_cleans_up_once() {
        let (_dir, input) = upload();
        let recognizer = MockRecognizer::ok(hello_segments());
        let releases = Arc::clone(&recognizer.releases);
        let calls = Arc::clone(&recognizer.calls);
        let mut p = pipeline(recognizer, None, StubConditioner::new(false));

        assert_eq!(p.transcribe(&input), "");
        assert_eq!(p.state(), PipelineState::Failed(FailureReason::Preprocessing));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_recognition_is_empty_and_cleans_up_once() {
        let (_dir, input) = upload();
        let recognizer = MockRecognizer::ok(Vec::new());
        let releases = Arc::clone(&recognizer.releases);
        let mut p = pipeline(recognizer, None, StubConditioner::new(true));

        assert_eq!(p.run(&input), Err(PipelineError::Recognition));
        assert_eq!(p.state(), PipelineState::Failed(FailureReason::Recognition));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn recognizer_error_is_recognition_failure() {
        let (_dir, input) = upload();
        let recognizer = MockRecognizer::err(SttError::Transcription("cuda oom".into()));
        let releases = Arc::clone(&recognizer.releases);
        let mut p = pipeline(recognizer, None, StubConditioner::new(true));

        assert_eq!(p.transcribe(&input), "");
        assert_eq!(p.state(), PipelineState::Failed(FailureReason::Recognition));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn blank_only_segments_are_recognition_failure() {
        let (_dir, input) = upload();
        let mut p = pipeline(
            MockRecognizer::ok(vec![Segment::new(0, 500, "  ")]),
            None,
            StubConditioner::new(true),
        );
        assert_eq!(p.run(&input), Err(PipelineError::Recognition));
    }

    #[test]
    fn missing_input_is_precondition_failure() {
        let recognizer = MockRecognizer::ok(hello_segments());
        let releases = Arc::clone(&recognizer.releases);
        let conditioner = StubConditioner::new(true);
        let conditioner_calls = Arc::clone(&conditioner.calls);
        let mut p = pipeline(recognizer, None, conditioner);

        let err = p.run(Path::new("/nonexistent/session.wav")).unwrap_err();
        assert_eq!(err.reason(), FailureReason::Precondition);
        assert_eq!(
            p.trace(),
            &[
                PipelineState::Validating,
                PipelineState::Failed(FailureReason::Precondition)
            ]
        );
        assert_eq!(conditioner_calls.load(Ordering::SeqCst), 0);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unloaded_engine_is_precondition_failure() {
        let (_dir, input) = upload();
        let mut p = TranscriptionPipeline::new(
            &PipelineConfig::default(),
            EngineHandle::new(Box::new(UnloadedRecognizer::new("no model")), None),
            Box::new(StubConditioner::new(true)),
        );

        let err = p.run(&input).unwrap_err();
        assert_eq!(err.reason(), FailureReason::Precondition);
    }

    #[test]
    fn panic_in_stage_is_unexpected_failure() {
        let (_dir, input) = upload();
        let recognizer = MockRecognizer::panicking();
        let releases = Arc::clone(&recognizer.releases);
        let mut p = pipeline(recognizer, None, StubConditioner::new(true));

        let err = p.run(&input).unwrap_err();
        assert_eq!(err.reason(), FailureReason::Unexpected);
        assert!(err.to_string().contains("mock recognizer exploded"));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn each_run_cleans_up_exactly_once() {
        let (_dir, input) = upload();
        let recognizer = MockRecognizer::ok(hello_segments());
        let releases = Arc::clone(&recognizer.releases);
        let mut p = pipeline(recognizer, None, StubConditioner::new(true));

        p.transcribe(&input);
        p.transcribe(Path::new("/nonexistent.wav"));
        p.transcribe(&input);
        assert_eq!(releases.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn failed_diarization_keeps_all_text_without_markers() {
        let (_dir, input) = upload();
        let diarizer = StubDiarizer {
            turns: None,
            releases: Arc::new(AtomicUsize::new(0)),
        };
        let mut p = pipeline(
            MockRecognizer::ok(hello_segments()),
            Some(Box::new(diarizer)),
            StubConditioner::new(true),
        );

        let out = p.run_detailed(&input).unwrap();
        assert_eq!(out.text, "hello world");
        assert!(!out.text.contains('['));
        assert!(!out.speakers_attributed);
    }

    #[test]
    fn diarization_adds_speaker_markers() {
        let (_dir, input) = upload();
        let releases = Arc::new(AtomicUsize::new(0));
        let diarizer = StubDiarizer {
            turns: Some(vec![
                SpeakerTurn::new(0, 1_000, "SPEAKER_00"),
                SpeakerTurn::new(1_000, 2_000, "SPEAKER_01"),
            ]),
            releases: Arc::clone(&releases),
        };
        let mut p = pipeline(
            MockRecognizer::ok(hello_segments()),
            Some(Box::new(diarizer)),
            StubConditioner::new(true),
        );

        let out = p.run_detailed(&input).unwrap();
        assert_eq!(out.text, "[SPEAKER_00]: hello [SPEAKER_01]: world");
        assert!(out.speakers_attributed);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn real_conditioner_feeds_recognizer() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut w = hound::WavWriter::create(&input, spec).unwrap();
        for i in 0..32_000 {
            let v = 0.3 * (2.0 * std::f32::consts::PI * 300.0 * i as f32 / 16_000.0).sin();
            w.write_sample((v * i16::MAX as f32) as i16).unwrap();
        }
        w.finalize().unwrap();

        let recognizer = MockRecognizer::ok(hello_segments());
        let calls = Arc::clone(&recognizer.calls);
        let mut p = TranscriptionPipeline::from_config(
            &PipelineConfig::default(),
            EngineHandle::new(Box::new(recognizer), None),
        )
        .unwrap();

        let out = p.run_detailed(&input).unwrap();
        assert_eq!(out.text, "hello world");
        assert_eq!(out.conditioned, dir.path().join("processed_tone.wav"));
        assert!(out.conditioned.exists());
        assert!(calls.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn staged_upload_finds_rttm_by_original_name_on_trimmed_timeline() {
        let dir = tempdir().unwrap();
        let rttm_dir = dir.path().join("rttm");
        std::fs::create_dir_all(&rttm_dir).unwrap();

        // 3 s of silence, then 4 s of "speech": A talks for 2 s, then B.
        let input = dir.path().join("Intake Call.wav");
        let mut samples = vec![0.0_f32; 48_000];
        samples.extend((0..64_000).map(|i| {
            0.3 * (2.0 * std::f32::consts::PI * 300.0 * i as f32 / 16_000.0).sin()
        }));
        write_wav(&input, &samples, 16_000).unwrap();
        std::fs::write(
            rttm_dir.join("Intake Call.rttm"),
            "SPEAKER intake 1 3.0 2.0 <NA> <NA> A <NA> <NA>\n\
             SPEAKER intake 1 5.0 2.0 <NA> <NA> B <NA> <NA>\n",
        )
        .unwrap();

        let staged = UploadStore::new(&StorageConfig {
            upload_dir: dir.path().join("uploads"),
            ..StorageConfig::default()
        })
        .stage(&input)
        .unwrap();

        let recognizer = MockRecognizer::ok(vec![
            Segment::new(100, 1_900, "from A"),
            Segment::new(2_100, 3_900, "from B"),
        ]);
        let diarizer = RttmDiarizer::new(Some(rttm_dir));
        let mut p = TranscriptionPipeline::from_config(
            &PipelineConfig::default(),
            EngineHandle::new(Box::new(recognizer), Some(Box::new(diarizer))),
        )
        .unwrap();

        let out = p.run_upload(&staged).unwrap();
        let speakers: Vec<Option<&str>> =
            out.segments.iter().map(|s| s.speaker.as_deref()).collect();
        assert_eq!(speakers, vec![Some("A"), Some("B")]);
        assert_eq!(out.text, "[A]: from A [B]: from B");
        assert!(out.speakers_attributed);
    }
}
