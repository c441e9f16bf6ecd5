//! Tone shaping: the oscillator's one-pole lowpass and its 8-band
//! peaking equalizer.

use std::f64::consts::PI;

/// Centre frequencies of the eight EQ bands, in Hz.
pub const EQ_BAND_FREQUENCIES: [f64; 8] = [60.0, 170.0, 310.0, 600.0, 1000.0, 3000.0, 6000.0, 12000.0];

/// Q shared by every EQ band.
pub const EQ_Q: f64 = 1.41;

/// Single-pole smoothing lowpass.
///
/// `alpha = cutoff * 0.9` and every output is scaled by
/// `1 - resonance * 0.99`, so resonance lowers the level rather than
/// adding a peak. The first output equals the first input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OnePoleLowpass {
    /// Normalized cutoff [0, 1].
    pub cutoff: f64,
    /// Resonance [0, 1].
    pub resonance: f64,
}

impl OnePoleLowpass {
    pub fn new(cutoff: f64, resonance: f64) -> Self {
        OnePoleLowpass { cutoff, resonance }
    }

    /// Fully open with no resonance: the filter is skipped.
    pub fn is_bypassed(&self) -> bool {
        self.cutoff >= 1.0 && self.resonance == 0.0
    }

    pub fn process(&self, samples: &mut [f64]) {
        if self.is_bypassed() || samples.is_empty() {
            return;
        }
        let alpha = self.cutoff * 0.9;
        let scale = 1.0 - self.resonance * 0.99;
        let mut prev = samples[0];
        for s in samples.iter_mut().skip(1) {
            prev = (alpha * *s + (1.0 - alpha) * prev) * scale;
            *s = prev;
        }
    }
}

/// RBJ peaking biquad, Direct Form I.
///
/// Coefficient formulas from the Audio EQ Cookbook (Robert Bristow-Johnson).
#[derive(Debug, Clone)]
pub struct PeakingFilter {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,

    // State (Direct Form I)
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl PeakingFilter {
    pub fn new(frequency: f64, q: f64, gain_db: f64, sample_rate: f64) -> Self {
        let a_lin = 10.0_f64.powf(gain_db / 40.0);
        let w0 = 2.0 * PI * frequency / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let b0 = 1.0 + alpha * a_lin;
        let b1 = -2.0 * cos_w0;
        let b2 = 1.0 - alpha * a_lin;
        let a0 = 1.0 + alpha / a_lin;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha / a_lin;

        PeakingFilter {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Process a single sample through the filter.
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2 - self.a1 * self.y1 - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }

    pub fn process_buffer(&mut self, samples: &mut [f64]) {
        for s in samples.iter_mut() {
            *s = self.process(*s);
        }
    }

    /// Reset filter state.
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

/// Apply the 8-band EQ in series. Bands at 0 dB are skipped entirely; each
/// active band runs with fresh state.
pub fn apply_eq(samples: &mut [f64], gains_db: &[f64; 8], sample_rate: f64) {
    for (&frequency, &gain) in EQ_BAND_FREQUENCIES.iter().zip(gains_db) {
        if gain == 0.0 {
            continue;
        }
        // A band above Nyquist has no meaningful centre; leave it out.
        if frequency >= sample_rate / 2.0 {
            tracing::debug!(frequency, sample_rate, "EQ band above Nyquist skipped");
            continue;
        }
        PeakingFilter::new(frequency, EQ_Q, gain, sample_rate).process_buffer(samples);
    }
}
