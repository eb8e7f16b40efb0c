//! Command-line interface definition.

use std::path::PathBuf;

use clap::Parser;

/// Transcribe recorded therapy sessions offline.
#[derive(Parser, Debug)]
#[command(name = "session-transcriber", version, about)]
pub struct Cli {
    /// Recordings to transcribe (wav, mp3, m4a, flac)
    #[arg(value_name = "FILE")]
    pub inputs: Vec<PathBuf>,

    /// Path to configuration file (default: platform settings.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Whisper model id (tiny, base, small, medium, large-v3) or path to a GGML file
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Language code passed to the recognizer (e.g. en, th, auto)
    #[arg(long, value_name = "LANG")]
    pub language: Option<String>,

    /// Directory holding `<stem>.rttm` speaker turns
    #[arg(long, value_name = "DIR")]
    pub rttm_dir: Option<PathBuf>,

    /// Skip speaker attribution
    #[arg(long)]
    pub no_diarization: bool,

    /// Also write a `<stem>.json` segment dump next to each transcript
    #[arg(long)]
    pub json: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,

    /// Verbose logging (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Default log filter for the requested verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
