//! Level normalization of conditioned audio.

use crate::config::NormalizationMode;

/// Convert a dBFS level to a linear amplitude.
pub fn dbfs_to_linear(dbfs: f32) -> f32 {
    10_f32.powf(dbfs / 20.0)
}

/// Scale `audio` in place so its level matches `target_dbfs`.
///
/// * [`NormalizationMode::Peak`] scales the loudest sample to the target.
/// * [`NormalizationMode::Rms`] scales the RMS level to the target and then
///   pulls the whole buffer down if that pushed any sample past full scale.
///
/// Silent buffers are left untouched.
///
/// ```rust
/// use session_transcriber::audio::normalize;
/// use session_transcriber::config::NormalizationMode;
///
/// let mut audio = vec![0.1_f32, -0.25, 0.05];
/// normalize(&mut audio, NormalizationMode::Peak, 0.0);
/// assert!((audio[1] + 1.0).abs() < 1e-6);
/// ```
pub fn normalize(audio: &mut [f32], mode: NormalizationMode, target_dbfs: f32) {
    let peak = audio.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
    if peak <= 0.0 {
        return;
    }

    let target = dbfs_to_linear(target_dbfs);
    let gain = match mode {
        NormalizationMode::Peak => target / peak,
        NormalizationMode::Rms => {
            let rms = (audio.iter().map(|s| s * s).sum::<f32>() / audio.len() as f32).sqrt();
            (target / rms).min(1.0 / peak)
        }
    };

    audio.iter_mut().for_each(|s| *s *= gain);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(x: &[f32]) -> f32 {
        x.iter().fold(0.0_f32, |m, s| m.max(s.abs()))
    }

    #[test]
    fn peak_mode_hits_target() {
        let mut audio = vec![0.02_f32, -0.1, 0.05];
        normalize(&mut audio, NormalizationMode::Peak, -1.0);
        assert!((peak(&audio) - dbfs_to_linear(-1.0)).abs() < 1e-6);
    }

    #[test]
    fn peak_mode_keeps_shape() {
        let mut audio = vec![0.2_f32, -0.4];
        normalize(&mut audio, NormalizationMode::Peak, 0.0);
        assert!((audio[0] - 0.5).abs() < 1e-6);
        assert!((audio[1] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn rms_mode_hits_target_when_headroom_allows() {
        let mut audio = vec![0.01_f32; 1_000];
        normalize(&mut audio, NormalizationMode::Rms, -20.0);
        assert!((audio[0] - 0.1).abs() < 1e-5);
    }

    #[test]
    fn rms_mode_never_exceeds_full_scale() {
        let mut audio = vec![0.0_f32; 1_000];
        audio[0] = 0.5;
        normalize(&mut audio, NormalizationMode::Rms, -3.0);
        assert!(peak(&audio) <= 1.0 + 1e-6);
    }

    #[test]
    fn silence_is_untouched() {
        let mut audio = vec![0.0_f32; 16];
        normalize(&mut audio, NormalizationMode::Peak, -1.0);
        assert!(audio.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn empty_buffer_is_noop() {
        let mut audio: Vec<f32> = Vec::new();
        normalize(&mut audio, NormalizationMode::Rms, -1.0);
        assert!(audio.is_empty());
    }
}
