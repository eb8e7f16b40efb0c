//! Zero-phase Butterworth high-pass filter.
//!
//! The filter is a cascade of second-order sections designed with the
//! bilinear transform (pre-warped at the cutoff), so an order-`N` cascade is
//! an exact digital Butterworth response.  [`HighPassFilter::filtfilt`] runs
//! it forward and then backward, which squares the magnitude response and
//! cancels the phase shift: speech keeps its timing while room rumble below
//! the cutoff is removed.
//!
//! ## Edge handling
//!
//! Before filtering, the signal is extended at both ends by an odd
//! reflection of `3 × (order + 1)` samples and every section starts from its
//! steady-state for the first input value.  This keeps the filter from
//! ringing on the step a hard start would otherwise introduce.

use std::f64::consts::PI;

use super::quality::AudioError;

// ---------------------------------------------------------------------------
// Biquad
// ---------------------------------------------------------------------------

/// One second-order section, normalised so `a0 == 1`.
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Biquad {
    fn highpass(cutoff_hz: f64, sample_rate: f64, q: f64) -> Self {
        let w0 = 2.0 * PI * cutoff_hz / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);
        let a0 = 1.0 + alpha;

        Self {
            b0: (1.0 + cos_w0) / 2.0 / a0,
            b1: -(1.0 + cos_w0) / a0,
            b2: (1.0 + cos_w0) / 2.0 / a0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
        }
    }

    /// DC gain and the transposed direct-form II state reached after an
    /// infinitely long unit input.
    fn steady_state(&self) -> (f64, [f64; 2]) {
        let gain = (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2);
        let z2 = self.b2 - self.a2 * gain;
        let z1 = self.b1 - self.a1 * gain + z2;
        (gain, [z1, z2])
    }
}

// ---------------------------------------------------------------------------
// HighPassFilter
// ---------------------------------------------------------------------------

/// Butterworth high-pass filter applied without phase distortion.
///
/// ```rust
/// use session_transcriber::audio::HighPassFilter;
///
/// let hp = HighPassFilter::butterworth(4, 70.0, 16_000).unwrap();
/// let dc = vec![0.5_f32; 16_000];
/// let out = hp.filtfilt(&dc);
/// assert_eq!(out.len(), dc.len());
/// assert!(out.iter().all(|s| s.abs() < 1e-3));
/// ```
#[derive(Debug, Clone)]
pub struct HighPassFilter {
    sections: Vec<Biquad>,
    order: usize,
}

impl HighPassFilter {
    /// Design an order-`order` Butterworth high-pass at `cutoff_hz`.
    ///
    /// # Errors
    ///
    /// `order` must be even and positive; `cutoff_hz` must lie strictly
    /// between 0 and the Nyquist frequency.
    pub fn butterworth(order: usize, cutoff_hz: f32, sample_rate: u32) -> Result<Self, AudioError> {
        let nyquist = sample_rate as f32 / 2.0;
        if order == 0 || order % 2 != 0 {
            return Err(AudioError::Spectral(format!(
                "high-pass order must be even and positive, got {order}"
            )));
        }
        if !(cutoff_hz > 0.0 && cutoff_hz < nyquist) {
            return Err(AudioError::Spectral(format!(
                "high-pass cutoff {cutoff_hz} Hz outside (0, {nyquist}) Hz"
            )));
        }

        let sections = (0..order / 2)
            .map(|k| {
                let theta = PI * (2 * k + 1) as f64 / (2 * order) as f64;
                let q = 1.0 / (2.0 * theta.cos());
                Biquad::highpass(f64::from(cutoff_hz), f64::from(sample_rate), q)
            })
            .collect();

        Ok(Self { sections, order })
    }

    /// Filter order.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Forward-backward filtering.  Output length equals input length.
    pub fn filtfilt(&self, audio: &[f32]) -> Vec<f32> {
        if audio.is_empty() {
            return Vec::new();
        }

        let n = audio.len();
        let padlen = (3 * (self.order + 1)).min(n - 1);
        let first = f64::from(audio[0]);
        let last = f64::from(audio[n - 1]);

        let mut ext: Vec<f64> = Vec::with_capacity(n + 2 * padlen);
        ext.extend((1..=padlen).rev().map(|i| 2.0 * first - f64::from(audio[i])));
        ext.extend(audio.iter().map(|&s| f64::from(s)));
        ext.extend((1..=padlen).map(|i| 2.0 * last - f64::from(audio[n - 1 - i])));

        self.run(&mut ext);
        ext.reverse();
        self.run(&mut ext);
        ext.reverse();

        ext[padlen..padlen + n].iter().map(|&s| s as f32).collect()
    }

    /// One causal pass through every section, in place.
    fn run(&self, x: &mut [f64]) {
        let Some(&x0) = x.first() else {
            return;
        };
        let mut scale = x0;

        for section in &self.sections {
            let (gain, zi) = section.steady_state();
            let mut z1 = zi[0] * scale;
            let mut z2 = zi[1] * scale;

            for v in x.iter_mut() {
                let input = *v;
                let y = section.b0 * input + z1;
                z1 = section.b1 * input - section.a1 * y + z2;
                z2 = section.b2 * input - section.a2 * y;
                *v = y;
            }

            scale *= gain;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
