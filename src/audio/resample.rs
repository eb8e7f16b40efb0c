//! Channel mixing and sample-rate conversion.
//!
//! Every stage downstream of decoding assumes **mono `f32` at the canonical
//! rate**.  This module provides the two conversion steps:
//!
//! 1. [`stereo_to_mono`]: downmix any number of interleaved channels.
//! 2. [`resample`]: windowed-sinc conversion via `rubato`, with the
//!    resampler's output delay removed so timestamps stay aligned.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use super::quality::AudioError;

/// Frames pushed through the resampler per call.
const CHUNK_SIZE: usize = 1024;

// ---------------------------------------------------------------------------
// stereo_to_mono
// ---------------------------------------------------------------------------

/// Mix interleaved multi-channel audio down to mono by averaging all channels.
///
/// * `channels == 1` returns the input as an owned `Vec`.
/// * `channels == 0` returns an empty vector.
/// * A trailing partial frame is dropped.
///
/// ```rust
/// use session_transcriber::audio::stereo_to_mono;
///
/// let stereo = vec![0.5_f32, -0.5, 0.2, 0.4]; // L R L R
/// let mono = stereo_to_mono(&stereo, 2);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[0] - 0.0).abs() < 1e-6);
/// assert!((mono[1] - 0.3).abs() < 1e-6);
/// ```
pub fn stereo_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// resample
// ---------------------------------------------------------------------------

/// Resample mono `samples` from `from_rate` Hz to `to_rate` Hz.
///
/// The output holds `ceil(len * to_rate / from_rate)` samples; the sinc
/// filter's group delay is trimmed from the front so sample `i` of the output
/// corresponds to time `i / to_rate` of the input.
///
/// # Errors
///
/// [`AudioError::Resample`] when either rate is zero or `rubato` rejects the
/// configuration.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, AudioError> {
    if from_rate == 0 || to_rate == 0 {
        return Err(AudioError::Resample(format!(
            "invalid rates {from_rate} Hz → {to_rate} Hz"
        )));
    }
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = f64::from(to_rate) / f64::from(from_rate);
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, CHUNK_SIZE, 1)
        .map_err(|e| AudioError::Resample(format!("init: {e}")))?;

    let expected = (samples.len() as f64 * ratio).ceil() as usize;
    let delay = resampler.output_delay();
    let wanted = expected + delay;

    let mut output = Vec::with_capacity(wanted + CHUNK_SIZE);
    let mut chunks = samples.chunks(CHUNK_SIZE);
    let silence = vec![0.0_f32; CHUNK_SIZE];

    // Keep feeding zeros after the input runs out until the delayed tail
    // has been flushed.
    while output.len() < wanted {
        let input: Vec<Vec<f32>> = match chunks.next() {
            Some(chunk) if chunk.len() == CHUNK_SIZE => vec![chunk.to_vec()],
            Some(chunk) => {
                let mut padded = chunk.to_vec();
                padded.resize(CHUNK_SIZE, 0.0);
                vec![padded]
            }
            None => vec![silence.clone()],
        };

        let resampled = resampler
            .process(&input, None)
            .map_err(|e| AudioError::Resample(format!("process: {e}")))?;

        if let Some(channel) = resampled.first() {
            output.extend_from_slice(channel);
        }
    }

    Ok(output[delay..wanted].to_vec())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- stereo_to_mono ----------------------------------------------------

    #[test]
    fn stereo_to_mono_already_mono() {
        let input = vec![0.1_f32, 0.2, 0.3];
        assert_eq!(stereo_to_mono(&input, 1), input);
    }

    #[test]
    fn stereo_to_mono_two_channel() {
        let out = stereo_to_mono(&[1.0_f32, -1.0, 0.5, 0.5], 2);
        assert_eq!(out.len(), 2);
        assert!((out[0] - 0.0).abs() < 1e-6);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn stereo_to_mono_zero_channels() {
        assert!(stereo_to_mono(&[1.0_f32, 2.0], 0).is_empty());
    }

    #[test]
    fn stereo_to_mono_drops_partial_frame() {
        let out = stereo_to_mono(&[0.2_f32, 0.4, 0.9], 2);
        assert_eq!(out.len(), 1);
    }

    // ---- resample ----------------------------------------------------------

    #[test]
    fn same_rate_is_noop() {
        let input: Vec<f32> = (0..160).map(|i| i as f32 / 160.0).collect();
        assert_eq!(resample(&input, 16_000, 16_000).unwrap(), input);
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(resample(&[], 48_000, 16_000).unwrap().is_empty());
    }

    #[test]
    fn zero_rate_is_an_error() {
        let err = resample(&[0.0; 10], 0, 16_000).unwrap_err();
        assert!(matches!(err, AudioError::Resample(_)));
    }

    #[test]
    fn downsample_48k_output_length() {
        let input = vec![0.0_f32; 48_000];
        let out = resample(&input, 48_000, 16_000).unwrap();
        assert_eq!(out.len(), 16_000);
    }

    #[test]
    fn upsample_8k_output_length() {
        let input = vec![0.0_f32; 8_000];
        let out = resample(&input, 8_000, 16_000).unwrap();
        assert_eq!(out.len(), 16_000);
    }

    #[test]
    fn delay_is_compensated() {
        // A click at 0.5 s must still sit near 0.5 s after conversion.
        let mut input = vec![0.0_f32; 44_100];
        input[22_050] = 1.0;
        let out = resample(&input, 44_100, 16_000).unwrap();

        let peak = out
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .map(|(i, _)| i)
            .unwrap();
        assert!(peak.abs_diff(8_000) <= 2, "click moved to sample {peak}");
    }

    #[test]
    fn dc_level_is_preserved_mid_buffer() {
        let input = vec![0.5_f32; 48_000];
        let out = resample(&input, 48_000, 16_000).unwrap();
        for &s in &out[2_000..14_000] {
            assert!((s - 0.5).abs() < 1e-2, "amplitude drift: {s}");
        }
    }
}
