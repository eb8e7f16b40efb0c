//! Pipeline settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files.  A [`PipelineConfig`] is
//! built once at startup, handed to the engines and never mutated afterwards.

use std::path::PathBuf;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Decoding settings for the Whisper recognition engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    /// Model id from the registry (e.g. `"base"`, `"large-v3"`).
    pub model: String,
    /// Explicit GGML file; overrides the registry lookup when set.
    pub model_path: Option<PathBuf>,
    /// ISO-639-1 language code, or `"auto"` for Whisper's own detection.
    pub language: String,
    /// Attempt GPU-accelerated inference when available.
    pub use_gpu: bool,
    /// CPU threads handed to Whisper.  `0` picks a value from the host.
    pub n_threads: i32,
    /// Beam width.  `1` falls back to greedy decoding.
    pub beam_size: i32,
    /// Beam-search patience factor.
    pub patience: f32,
    /// Probability above which a window is treated as silence.
    pub no_speech_threshold: f32,
    /// Average log-probability below which decoding is retried hotter.
    pub log_prob_threshold: f32,
    /// Token entropy ceiling (whisper.cpp's stand-in for the compression
    /// ratio check).
    pub entropy_threshold: f32,
    /// Feed the previous window's text back in as the decoder prompt.
    pub condition_on_previous_text: bool,
    /// Suppress blank outputs at the start of sampling.
    pub suppress_blank: bool,
    /// Suppress non-speech tokens (music notes, brackets, …).
    pub suppress_non_speech_tokens: bool,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: "base".into(),
            model_path: None,
            language: "en".into(),
            use_gpu: true,
            n_threads: 0,
            beam_size: 7,
            patience: 1.5,
            no_speech_threshold: 0.6,
            log_prob_threshold: -1.0,
            entropy_threshold: 2.4,
            condition_on_previous_text: true,
            suppress_blank: true,
            suppress_non_speech_tokens: true,
        }
    }
}

// ---------------------------------------------------------------------------
// VadConfig
// ---------------------------------------------------------------------------

/// Voice-activity hysteresis used to cut the conditioned audio into
/// recognition chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VadConfig {
    /// Speech probability at which a region opens.
    pub onset: f32,
    /// Speech probability below which an open region closes.
    pub offset: f32,
    /// Maximum length of one recognition chunk, in seconds.
    pub chunk_secs: f32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            onset: 0.450,
            offset: 0.363,
            chunk_secs: 20.0,
        }
    }
}

// ---------------------------------------------------------------------------
// ConditioningConfig
// ---------------------------------------------------------------------------

/// How the conditioned buffer is brought to a reference level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NormalizationMode {
    /// Scale so the largest absolute sample hits `target_dbfs`.
    Peak,
    /// Scale so the RMS level hits `target_dbfs`, then limit peaks to 0 dBFS.
    Rms,
}

impl Default for NormalizationMode {
    fn default() -> Self {
        Self::Peak
    }
}

/// Signal-conditioning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditioningConfig {
    /// Canonical sample rate of every buffer downstream of decoding.
    pub sample_rate: u32,
    /// High-pass cutoff in Hz.
    pub highpass_cutoff_hz: f32,
    /// Butterworth order of the high-pass filter (even).
    pub highpass_order: usize,
    /// Frames quieter than this many dB below the loudest frame are silence.
    pub trim_top_db: f32,
    /// Trim analysis frame length in samples.
    pub trim_frame_length: usize,
    /// Trim analysis hop length in samples.
    pub trim_hop_length: usize,
    /// STFT size used by noise reduction.
    pub noise_n_fft: usize,
    /// STFT hop used by noise reduction.
    pub noise_hop_length: usize,
    /// Fraction of the estimated noise that is removed (0.0 – 1.0).
    pub prop_decrease: f32,
    /// Use one noise profile for the whole file instead of a running estimate.
    pub stationary: bool,
    /// Smoothing time constant of the running noise estimate, in seconds.
    pub noise_time_constant_secs: f32,
    /// Reference level strategy.
    pub normalization: NormalizationMode,
    /// Reference level in dBFS.
    pub target_dbfs: f32,
    /// Directory for conditioned artifacts.  `None` writes next to the input.
    pub output_dir: Option<PathBuf>,
}

impl Default for ConditioningConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            highpass_cutoff_hz: 70.0,
            highpass_order: 4,
            trim_top_db: 35.0,
            trim_frame_length: 2048,
            trim_hop_length: 512,
            noise_n_fft: 2048,
            noise_hop_length: 512,
            prop_decrease: 0.3,
            stationary: false,
            noise_time_constant_secs: 2.0,
            normalization: NormalizationMode::default(),
            target_dbfs: -1.0,
            output_dir: None,
        }
    }
}

// ---------------------------------------------------------------------------
// DiarizationConfig
// ---------------------------------------------------------------------------

/// Speaker attribution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiarizationConfig {
    /// Run the diarization stage at all.
    pub enabled: bool,
    /// Directory holding `<stem>.rttm` files from the external diarizer.
    /// `None` looks next to the conditioned audio.
    pub rttm_dir: Option<PathBuf>,
}

impl Default for DiarizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rttm_dir: None,
        }
    }
}

// ---------------------------------------------------------------------------
// StorageConfig
// ---------------------------------------------------------------------------

/// Where uploads and transcripts live on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Uploaded recordings are copied here under a unique name.
    pub upload_dir: PathBuf,
    /// Final transcripts are written here.
    pub transcript_dir: PathBuf,
    /// Accepted upload extensions (lower case, without the dot).
    pub allowed_extensions: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("./uploads"),
            transcript_dir: PathBuf::from("./transcript"),
            allowed_extensions: ["wav", "mp3", "m4a", "flac"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use session_transcriber::config::PipelineConfig;
///
/// // Returns Default when the file is missing.
/// let config = PipelineConfig::load().unwrap();
/// assert_eq!(config.conditioning.sample_rate, 16_000);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Recognition engine settings.
    pub stt: SttConfig,
    /// Voice-activity chunking.
    pub vad: VadConfig,
    /// Signal conditioning.
    pub conditioning: ConditioningConfig,
    /// Speaker attribution.
    pub diarization: DiarizationConfig,
    /// Upload / transcript directories.
    pub storage: StorageConfig,
}

impl PipelineConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.  A missing file yields the defaults.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save to an explicit path, creating parent directories as needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply process-environment overrides (`UPLOAD_FOLDER`,
    /// `SESSION_TRANSCRIBER_MODEL`).
    pub fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("UPLOAD_FOLDER") {
            if !dir.trim().is_empty() {
                self.storage.upload_dir = PathBuf::from(dir);
            }
        }
        if let Ok(model) = std::env::var("SESSION_TRANSCRIBER_MODEL") {
            if !model.trim().is_empty() {
                self.stt.model_path = Some(PathBuf::from(model));
            }
        }
    }

    /// Reject settings the pipeline cannot honour.
    pub fn validate(&self) -> Result<()> {
        let c = &self.conditioning;
        if c.sample_rate == 0 {
            bail!("conditioning.sample_rate must be positive");
        }
        if c.highpass_cutoff_hz <= 0.0 || c.highpass_cutoff_hz >= c.sample_rate as f32 / 2.0 {
            bail!(
                "conditioning.highpass_cutoff_hz must lie in (0, {})",
                c.sample_rate / 2
            );
        }
        if c.highpass_order == 0 || c.highpass_order % 2 != 0 {
            bail!("conditioning.highpass_order must be a positive even number");
        }
        if c.trim_frame_length == 0 || c.trim_hop_length == 0 {
            bail!("conditioning trim frame and hop lengths must be positive");
        }
        if c.noise_n_fft < 2 || c.noise_hop_length == 0 || c.noise_hop_length > c.noise_n_fft {
            bail!("conditioning noise STFT needs n_fft >= 2 and 0 < hop <= n_fft");
        }
        if !(0.0..=1.0).contains(&c.prop_decrease) {
            bail!("conditioning.prop_decrease must lie in [0, 1]");
        }
        if self.stt.beam_size < 1 {
            bail!("stt.beam_size must be at least 1");
        }
        if self.vad.onset < self.vad.offset {
            bail!(
                "vad.onset ({}) must not be below vad.offset ({})",
                self.vad.onset,
                self.vad.offset
            );
        }
        if self.vad.chunk_secs <= 0.0 {
            bail!("vad.chunk_secs must be positive");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
