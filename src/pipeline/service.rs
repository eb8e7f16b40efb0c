//! Async front door for the pipeline.
//!
//! Engines are not re-entrant, so a [`TranscriptionService`] holds the one
//! [`TranscriptionPipeline`] behind a `tokio::sync::Mutex` and runs each
//! request on the blocking pool.  Concurrent callers queue on the lock and
//! are served one at a time.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::runner::{TranscriptionOutput, TranscriptionPipeline};
use super::state::PipelineError;
use crate::upload::StagedUpload;

/// Cloneable handle to a shared pipeline.
#[derive(Clone)]
pub struct TranscriptionService {
    inner: Arc<Mutex<TranscriptionPipeline>>,
}

impl TranscriptionService {
    pub fn new(pipeline: TranscriptionPipeline) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pipeline)),
        }
    }

    /// Transcribe `input`; an empty string signals failure.
    pub async fn transcribe(&self, input: PathBuf) -> String {
        self.run(input).await.map(|out| out.text).unwrap_or_default()
    }

    /// Transcribe `input` on the blocking pool.
    pub async fn run(&self, input: PathBuf) -> Result<TranscriptionOutput, PipelineError> {
        let mut pipeline = Arc::clone(&self.inner).lock_owned().await;

        let joined = tokio::task::spawn_blocking(move || pipeline.run_detailed(&input)).await;
        Self::joined(joined)
    }

    /// Transcribe a staged upload on the blocking pool.
    pub async fn run_upload(
        &self,
        upload: StagedUpload,
    ) -> Result<TranscriptionOutput, PipelineError> {
        let mut pipeline = Arc::clone(&self.inner).lock_owned().await;
        let joined = tokio::task::spawn_blocking(move || pipeline.run_upload(&upload)).await;
        Self::joined(joined)
    }

    fn joined(
        joined: Result<Result<TranscriptionOutput, PipelineError>, tokio::task::JoinError>,
    ) -> Result<TranscriptionOutput, PipelineError> {
        match joined {
            Ok(result) => result,
            Err(e) => {
                log::error!("pipeline: worker task failed: {e}");
                Err(PipelineError::Unexpected(e.to_string()))
            }
        }
    }

    /// Release the engines once every other handle is gone.
    ///
    /// Returns `false` (and disposes nothing) while clones are still alive.
    pub fn shutdown(self) -> bool {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => {
                mutex.into_inner().dispose();
                true
            }
            Err(_) => {
                log::warn!("pipeline: shutdown skipped, service still shared");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::audio::write_wav;
    use crate::config::{PipelineConfig, StorageConfig};
    use crate::pipeline::EngineHandle;
    use crate::stt::{MockRecognizer, Segment};
    use crate::upload::UploadStore;
    use tempfile::tempdir;

    fn tone(secs: f32) -> Vec<f32> {
        (0..(16_000.0 * secs) as usize)
            .map(|i| 0.3 * (2.0 * std::f32::consts::PI * 220.0 * i as f32 / 16_000.0).sin())
            .collect()
    }

    fn service(recognizer: MockRecognizer) -> TranscriptionService {
        let pipeline = TranscriptionPipeline::from_config(
            &PipelineConfig::default(),
            EngineHandle::new(Box::new(recognizer), None),
        )
        .unwrap();
        TranscriptionService::new(pipeline)
    }

    #[tokio::test]
    async fn transcribes_on_blocking_pool() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("a.wav");
        write_wav(&input, &tone(1.5), 16_000).unwrap();

        let svc = service(MockRecognizer::ok(vec![Segment::new(0, 900, "good good morning")]));
        assert_eq!(svc.transcribe(input).await, "good morning");
    }

    #[tokio::test]
    async fn missing_file_yields_empty_string() {
        let svc = service(MockRecognizer::ok(vec![Segment::new(0, 900, "unused")]));
        assert_eq!(svc.transcribe(PathBuf::from("/nonexistent/x.wav")).await, "");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_requests_are_serialized() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.wav");
        let b = dir.path().join("b.wav");
        write_wav(&a, &tone(1.0), 16_000).unwrap();
        write_wav(&b, &tone(1.0), 16_000).unwrap();

        let recognizer = MockRecognizer::ok(vec![Segment::new(0, 500, "hello")]);
        let calls = Arc::clone(&recognizer.calls);
        let releases = Arc::clone(&recognizer.releases);
        let svc = service(recognizer);

        let (ra, rb) = tokio::join!(svc.transcribe(a), svc.transcribe(b));
        assert_eq!(ra, "hello");
        assert_eq!(rb, "hello");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(releases.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn runs_staged_upload() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("first session.wav");
        write_wav(&src, &tone(1.0), 16_000).unwrap();
        let staged = UploadStore::new(&StorageConfig {
            upload_dir: dir.path().join("uploads"),
            ..StorageConfig::default()
        })
        .stage(&src)
        .unwrap();

        let svc = service(MockRecognizer::ok(vec![Segment::new(0, 500, "hello")]));
        let out = svc.run_upload(staged.clone()).await.unwrap();
        assert_eq!(out.text, "hello");
        assert_eq!(out.conditioned.parent(), staged.path.parent());
    }

    #[tokio::test]
    async fn shutdown_requires_sole_owner() {
        let svc = service(MockRecognizer::ok(Vec::new()));
        let other = svc.clone();
        assert!(!svc.shutdown());
        assert!(other.shutdown());
    }
}
