//! DSP Engine — offline rendering of oscillators and chords.
//!
//! Every render call produces a fixed-length buffer from its inputs alone;
//! nothing here streams or touches an audio device.

pub mod engine;
pub mod envelope;
pub mod filter;
pub mod mixer;
pub mod oscillator;
pub mod renderer;
pub mod waveform;

/// Default output sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Number of samples covering `duration_ms` at `sample_rate`, rounded to the
/// nearest sample.
pub fn samples_for_ms(duration_ms: f64, sample_rate: f64) -> usize {
    (sample_rate * duration_ms.max(0.0) / 1000.0).round() as usize
}

/// `n` evenly spaced values from `start` to `end` inclusive. A single value
/// is `start`; the last value is exactly `end`.
pub fn linspace(start: f64, end: f64, n: usize) -> impl Iterator<Item = f64> {
    let step = if n > 1 { (end - start) / (n - 1) as f64 } else { 0.0 };
    (0..n).map(move |i| if n > 1 && i == n - 1 { end } else { start + step * i as f64 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_endpoints() {
        let v: Vec<f64> = linspace(1.0, 0.0, 5).collect();
        assert_eq!(v, vec![1.0, 0.75, 0.5, 0.25, 0.0]);
        assert_eq!(linspace(0.3, 1.0, 1).collect::<Vec<_>>(), vec![0.3]);
        assert_eq!(linspace(0.0, 1.0, 0).count(), 0);
    }

    #[test]
    fn sample_counts_round() {
        assert_eq!(samples_for_ms(1100.0, 44100.0), 48510);
        assert_eq!(samples_for_ms(2.0, 44100.0), 88);
        assert_eq!(samples_for_ms(-5.0, 44100.0), 0);
    }
}
