//! 16-bit PCM WAV read/write for conditioned artifacts.

use std::path::Path;

use super::quality::AudioError;

/// Write mono `f32` samples as 16-bit PCM.  Samples are clamped to
/// `[-1.0, 1.0]` before quantisation.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), AudioError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &s in samples {
        writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Read a WAV file as interleaved `f32` plus its spec.
pub fn read_wav(path: &Path) -> Result<(Vec<f32>, hound::WavSpec), AudioError> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok((samples, spec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn written_file_reads_back_within_quantisation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let samples = vec![0.0_f32, 0.5, -0.5, 0.25];

        write_wav(&path, &samples, 16_000).unwrap();
        let (back, spec) = read_wav(&path).unwrap();

        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16_000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(back.len(), samples.len());
        for (a, b) in samples.iter().zip(&back) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn out_of_range_samples_are_clamped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hot.wav");
        write_wav(&path, &[2.0, -2.0], 16_000).unwrap();

        let (back, _) = read_wav(&path).unwrap();
        assert!(back[0] <= 1.0 && back[0] > 0.99);
        assert!(back[1] >= -1.0 && back[1] < -0.99);
    }

    #[test]
    fn missing_file_is_wav_error() {
        let err = read_wav(Path::new("/nonexistent/x.wav")).unwrap_err();
        assert!(matches!(err, AudioError::Wav(_)));
    }
}
