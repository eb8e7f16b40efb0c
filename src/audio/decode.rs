//! Container/codec decoding into canonical mono `f32` PCM.
//!
//! Supports WAV, MP3, M4A/AAC and FLAC through `symphonia`.  The first audio
//! track is decoded, mixed down to mono and resampled to the requested rate.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::quality::AudioError;
use super::resample::{resample, stereo_to_mono};

/// Result of decoding one file.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono samples at the requested rate.
    pub samples: Vec<f32>,
    /// Sample rate of the source stream.
    pub source_rate: u32,
    /// Channel count of the source stream.
    pub source_channels: u16,
}

/// Decode `path` to mono `f32` at `target_rate` Hz.
///
/// Corrupt packets are skipped with a warning; a stream that yields no
/// samples at all is an error.
pub fn decode_file(path: &Path, target_rate: u32) -> Result<DecodedAudio, AudioError> {
    let file = File::open(path).map_err(|source| AudioError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::Decode(format!("probe failed: {e}")))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::Decode("no audio track found".into()))?;

    let codec_params = track.codec_params.clone();
    let track_id = track.id;
    let source_rate = codec_params
        .sample_rate
        .ok_or_else(|| AudioError::Decode("stream has no sample rate".into()))?;
    let mut source_channels = codec_params.channels.map_or(1, |c| c.count()) as u16;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::Decode(format!("codec init failed: {e}")))?;

    let mut mono: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(AudioError::Decode(format!("packet read: {e}"))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(e)) => {
                log::warn!("decode: skipping corrupt packet in {}: {e}", path.display());
                continue;
            }
            Err(e) => return Err(AudioError::Decode(format!("decode: {e}"))),
        };

        let spec = *decoded.spec();
        source_channels = spec.channels.count() as u16;
        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);
        mono.extend(stereo_to_mono(buf.samples(), source_channels));
    }

    if mono.is_empty() {
        return Err(AudioError::Decode("no audio samples decoded".into()));
    }

    let samples = resample(&mono, source_rate, target_rate)?;
    log::debug!(
        "decode: {} ({} Hz, {} ch) → {} samples @ {} Hz",
        path.display(),
        source_rate,
        source_channels,
        samples.len(),
        target_rate
    );

    Ok(DecodedAudio {
        samples,
        source_rate,
        source_channels,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_test_wav(path: &Path, sample_rate: u32, channels: u16, frames: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            let v = ((i as f32 * 0.05).sin() * 8_000.0) as i16;
            for _ in 0..channels {
                writer.write_sample(v).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = decode_file(Path::new("/nonexistent/session.wav"), 16_000).unwrap_err();
        assert!(matches!(err, AudioError::Io { .. }), "{err}");
    }

    #[test]
    fn garbage_is_decode_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("junk.wav");
        std::fs::write(&path, b"definitely not audio").unwrap();
        let err = decode_file(&path, 16_000).unwrap_err();
        assert!(matches!(err, AudioError::Decode(_)), "{err}");
    }

    #[test]
    fn mono_16k_wav_is_passed_through() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_test_wav(&path, 16_000, 1, 1_600);

        let decoded = decode_file(&path, 16_000).unwrap();
        assert_eq!(decoded.source_rate, 16_000);
        assert_eq!(decoded.source_channels, 1);
        assert_eq!(decoded.samples.len(), 1_600);
        assert!(decoded.samples.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn stereo_44k_wav_is_mixed_and_resampled() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_test_wav(&path, 44_100, 2, 22_050);

        let decoded = decode_file(&path, 16_000).unwrap();
        assert_eq!(decoded.source_rate, 44_100);
        assert_eq!(decoded.source_channels, 2);
        assert_eq!(decoded.samples.len(), 8_000);
    }
}
