//! Application entry point.
//!
//! # Startup sequence
//!
//! 1. Load `.env` and initialise logging.
//! 2. Load [`PipelineConfig`] (defaults on first run), apply environment and
//!    command-line overrides, validate.
//! 3. Create the [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Load the engines once and build the [`TranscriptionService`].
//! 5. For each input: stage the upload, transcribe, write the transcript.
//! 6. Dispose the engines.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use session_transcriber::{
    cli::Cli,
    config::{AppPaths, PipelineConfig},
    pipeline::{EngineHandle, TranscriptionPipeline, TranscriptionService},
    stt::{find_model_by_id, ModelPaths},
    transcript::TranscriptWriter,
    upload::UploadStore,
};

fn main() -> ExitCode {
    let cli = Cli::parse();

    // 1. Environment + logging
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter()))
        .init();

    match run(cli) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failed) => {
            log::error!("{failed} recording(s) failed");
            ExitCode::FAILURE
        }
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns the number of inputs that produced no transcript.
fn run(cli: Cli) -> Result<usize> {
    // 2. Configuration
    let config = load_config(&cli)?;
    if cli.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(0);
    }
    if cli.inputs.is_empty() {
        bail!("no input recordings given (see --help)");
    }
    log::info!("session-transcriber starting up ({} input(s))", cli.inputs.len());

    // 3. Tokio runtime
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("creating tokio runtime")?;

    // 4. Engines + service
    let models = ModelPaths::from_app_paths(&AppPaths::new());
    let engine = EngineHandle::from_config(&config, &models);
    let pipeline = TranscriptionPipeline::from_config(&config, engine)
        .context("building signal conditioner")?;
    let service = TranscriptionService::new(pipeline);

    let uploads = UploadStore::new(&config.storage);
    let writer = TranscriptWriter::new(&config.storage.transcript_dir);
    let many = cli.inputs.len() > 1;

    // 5. Transcribe
    let failed = rt.block_on(async {
        let mut failed = 0;
        for input in &cli.inputs {
            if !transcribe_one(&service, &uploads, &writer, input, many, cli.json).await {
                failed += 1;
            }
        }
        failed
    });

    // 6. Dispose
    service.shutdown();
    Ok(failed)
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load_from(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::load().unwrap_or_else(|e| {
            log::warn!("Failed to load config ({e}); using defaults");
            PipelineConfig::default()
        }),
    };
    config.apply_env();

    if let Some(model) = &cli.model {
        if find_model_by_id(model).is_some() {
            config.stt.model = model.clone();
            config.stt.model_path = None;
        } else {
            config.stt.model_path = Some(model.into());
        }
    }
    if let Some(lang) = &cli.language {
        config.stt.language = lang.clone();
    }
    if let Some(dir) = &cli.rttm_dir {
        config.diarization.rttm_dir = Some(dir.clone());
    }
    if cli.no_diarization {
        config.diarization.enabled = false;
    }

    config.validate()?;
    Ok(config)
}

async fn transcribe_one(
    service: &TranscriptionService,
    uploads: &UploadStore,
    writer: &TranscriptWriter,
    input: &Path,
    many: bool,
    json: bool,
) -> bool {
    let staged = match uploads.stage(input) {
        Ok(staged) => staged,
        Err(e) => {
            log::error!("{}: {e}", input.display());
            return false;
        }
    };

    let output = match service.run_upload(staged.clone()).await {
        Ok(output) => output,
        Err(e) => {
            log::error!("{}: {e}", input.display());
            return false;
        }
    };

    let stem = staged
        .path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("transcript");
    let segments = json.then_some(output.segments.as_slice());
    if let Err(e) = writer.write(stem, &output.text, segments) {
        log::error!("{}: {e:#}", input.display());
        return false;
    }

    if many {
        println!("# {}", input.display());
    }
    println!("{}", output.text);
    true
}
