//! Spectral-subtraction noise reduction.
//!
//! [`NoiseReducer`] estimates the noise magnitude of every STFT bin and
//! subtracts it, then blends the result with the original spectrum:
//!
//! ```text
//! g_sub  = max(|X| - N, 0) / |X|
//! g      = 1 - prop_decrease · (1 - g_sub)
//! ```
//!
//! With `prop_decrease = 0.3` a bin is never attenuated by more than 30 %,
//! which removes steady hiss and hum without the "musical noise" full
//! subtraction leaves behind.
//!
//! Two noise estimates are available:
//!
//! * **stationary**: one profile for the whole file, averaged over the
//!   quietest tenth of the frames;
//! * **non-stationary** (default): a per-bin noise-floor tracker that falls
//!   quickly and rises with the configured time constant, seeded from the
//!   first half second.
//!
//! Frames are Hann-windowed, centred (zero padding of `n_fft / 2` at both
//! ends) and resynthesised by weighted overlap-add, so the output has exactly
//! the input's length and alignment.

use std::sync::Arc;

use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};

use super::quality::AudioError;
use crate::config::ConditioningConfig;

/// Window-power floor below which overlap-add output is treated as zero.
const WSUM_EPS: f32 = 1e-8;

// ---------------------------------------------------------------------------
// NoiseReducer
// ---------------------------------------------------------------------------

/// Partial spectral-subtraction denoiser.
#[derive(Debug, Clone)]
pub struct NoiseReducer {
    n_fft: usize,
    hop: usize,
    prop_decrease: f32,
    stationary: bool,
    time_constant_secs: f32,
    sample_rate: u32,
}

/// FFT plans and buffers shared by the analysis passes.
struct Stft {
    r2c: Arc<dyn RealToComplex<f32>>,
    c2r: Arc<dyn ComplexToReal<f32>>,
    window: Vec<f32>,
    pad: usize,
    n_frames: usize,
}

impl NoiseReducer {
    /// Create a reducer.  `n_fft` is clamped to at least 2 and `hop` to
    /// `1..=n_fft`.
    pub fn new(
        n_fft: usize,
        hop: usize,
        prop_decrease: f32,
        stationary: bool,
        time_constant_secs: f32,
        sample_rate: u32,
    ) -> Self {
        let n_fft = n_fft.max(2);
        Self {
            n_fft,
            hop: hop.clamp(1, n_fft),
            prop_decrease: prop_decrease.clamp(0.0, 1.0),
            stationary,
            time_constant_secs: time_constant_secs.max(1e-3),
            sample_rate: sample_rate.max(1),
        }
    }

    /// Build from the conditioning settings.
    pub fn from_config(config: &ConditioningConfig) -> Self {
        Self::new(
            config.noise_n_fft,
            config.noise_hop_length,
            config.prop_decrease,
            config.stationary,
            config.noise_time_constant_secs,
            config.sample_rate,
        )
    }

    /// Denoise `audio`.  The output has the same length as the input.
    pub fn reduce(&self, audio: &[f32]) -> Result<Vec<f32>, AudioError> {
        if audio.is_empty() || self.prop_decrease <= 0.0 {
            return Ok(audio.to_vec());
        }

        let stft = self.plan(audio.len());
        let mut frame = stft.r2c.make_input_vec();
        let mut spectrum = stft.r2c.make_output_vec();
        let mut resynth = stft.c2r.make_output_vec();
        let n_bins = spectrum.len();

        let mut noise = if self.stationary {
            let quiet = self.quietest_frames(audio, &stft, &mut frame);
            self.mean_magnitude(audio, &stft, quiet, &mut frame, &mut spectrum)?
        } else {
            let seed_frames = ((self.sample_rate as usize / 2).div_ceil(self.hop)).max(1);
            let seed = (0..stft.n_frames.min(seed_frames)).collect::<Vec<_>>();
            self.mean_magnitude(audio, &stft, seed, &mut frame, &mut spectrum)?
        };

        let frame_secs = self.hop as f32 / self.sample_rate as f32;
        let rise = (-frame_secs / self.time_constant_secs).exp();
        let fall = (-frame_secs / (self.time_constant_secs / 10.0)).exp();

        let total = (stft.n_frames - 1) * self.hop + self.n_fft;
        let mut out = vec![0.0_f32; total];
        let mut wsum = vec![0.0_f32; total];
        let scale = 1.0 / self.n_fft as f32;

        for f in 0..stft.n_frames {
            self.load_frame(audio, &stft, f, &mut frame);
            stft.r2c
                .process(&mut frame, &mut spectrum)
                .map_err(|e| AudioError::Spectral(format!("forward FFT: {e}")))?;

            for (bin, c) in spectrum.iter_mut().enumerate() {
                let mag = c.norm();
                if !self.stationary {
                    let alpha = if mag > noise[bin] { rise } else { fall };
                    noise[bin] = alpha * noise[bin] + (1.0 - alpha) * mag;
                }
                let g_sub = if mag > 0.0 {
                    (mag - noise[bin]).max(0.0) / mag
                } else {
                    1.0
                };
                *c *= 1.0 - self.prop_decrease * (1.0 - g_sub);
            }

            // The inverse transform rejects imaginary parts on DC / Nyquist.
            spectrum[0].im = 0.0;
            if self.n_fft % 2 == 0 {
                spectrum[n_bins - 1].im = 0.0;
            }

            stft.c2r
                .process(&mut spectrum, &mut resynth)
                .map_err(|e| AudioError::Spectral(format!("inverse FFT: {e}")))?;

            let start = f * self.hop;
            for (k, (&y, &w)) in resynth.iter().zip(&stft.window).enumerate() {
                out[start + k] += y * scale * w;
                wsum[start + k] += w * w;
            }
        }

        Ok((0..audio.len())
            .map(|i| {
                let p = i + stft.pad;
                if wsum[p] > WSUM_EPS {
                    out[p] / wsum[p]
                } else {
                    0.0
                }
            })
            .collect())
    }

    fn plan(&self, len: usize) -> Stft {
        let mut planner = RealFftPlanner::<f32>::new();
        let pad = self.n_fft / 2;
        let n_frames = 1 + (len + 2 * pad).saturating_sub(self.n_fft).div_ceil(self.hop);
        let window = (0..self.n_fft)
            .map(|k| {
                0.5 - 0.5 * (2.0 * std::f32::consts::PI * k as f32 / self.n_fft as f32).cos()
            })
            .collect();

        Stft {
            r2c: planner.plan_fft_forward(self.n_fft),
            c2r: planner.plan_fft_inverse(self.n_fft),
            window,
            pad,
            n_frames,
        }
    }

    /// Fill `frame` with the windowed samples of frame `index`.
    fn load_frame(&self, audio: &[f32], stft: &Stft, index: usize, frame: &mut [f32]) {
        let origin = (index * self.hop) as isize - stft.pad as isize;
        for (k, (slot, &w)) in frame.iter_mut().zip(&stft.window).enumerate() {
            let i = origin + k as isize;
            *slot = if i >= 0 && (i as usize) < audio.len() {
                audio[i as usize] * w
            } else {
                0.0
            };
        }
    }

    /// Indices of the lowest-energy tenth of the frames (at least one).
    fn quietest_frames(&self, audio: &[f32], stft: &Stft, frame: &mut [f32]) -> Vec<usize> {
        let mut energies: Vec<(usize, f32)> = (0..stft.n_frames)
            .map(|f| {
                self.load_frame(audio, stft, f, frame);
                (f, frame.iter().map(|s| s * s).sum::<f32>())
            })
            .collect();
        energies.sort_by(|a, b| a.1.total_cmp(&b.1));

        let keep = (stft.n_frames / 10).max(1);
        energies.into_iter().take(keep).map(|(f, _)| f).collect()
    }

    /// Per-bin mean magnitude over `frames`.
    fn mean_magnitude(
        &self,
        audio: &[f32],
        stft: &Stft,
        frames: Vec<usize>,
        frame: &mut [f32],
        spectrum: &mut [realfft::num_complex::Complex<f32>],
    ) -> Result<Vec<f32>, AudioError> {
        let mut profile = vec![0.0_f32; spectrum.len()];
        let count = frames.len().max(1) as f32;

        for f in frames {
            self.load_frame(audio, stft, f, frame);
            stft.r2c
                .process(frame, spectrum)
                .map_err(|e| AudioError::Spectral(format!("noise profile FFT: {e}")))?;
            for (acc, c) in profile.iter_mut().zip(spectrum.iter()) {
                *acc += c.norm();
            }
        }

        profile.iter_mut().for_each(|v| *v /= count);
        Ok(profile)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
