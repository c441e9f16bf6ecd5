//! Mixer — sums voice buffers, then normalizes, fades and spreads to stereo.

use serde::{Deserialize, Serialize};

use super::{linspace, samples_for_ms};

/// Delay applied to the right channel in wide-stereo mode, in milliseconds.
pub const WIDE_STEREO_DELAY_MS: f64 = 2.0;

/// How the mono mix is turned into two channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SoundMode {
    Mono,
    /// Mono duplicated to both channels; oscillator pan is not applied.
    #[default]
    Stereo,
    /// Right channel is the mix delayed by a few milliseconds.
    WideStereo,
}

/// Two equal-length channels of audio.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StereoBuffer {
    pub left: Vec<f64>,
    pub right: Vec<f64>,
}

impl StereoBuffer {
    pub fn silence(frames: usize) -> Self {
        StereoBuffer {
            left: vec![0.0; frames],
            right: vec![0.0; frames],
        }
    }

    /// Spread a mono mix across two channels according to `mode`.
    pub fn from_mono(mono: Vec<f64>, mode: SoundMode, sample_rate: f64) -> Self {
        let right = match mode {
            SoundMode::Mono | SoundMode::Stereo => mono.clone(),
            SoundMode::WideStereo => {
                let delay = samples_for_ms(WIDE_STEREO_DELAY_MS, sample_rate).min(mono.len());
                let mut right = vec![0.0; delay];
                right.extend_from_slice(&mono[..mono.len() - delay]);
                right
            }
        };
        StereoBuffer { left: mono, right }
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Master section: mute zeroes everything, otherwise scale by `volume`.
    pub fn apply_master(&mut self, volume: f64, mute: bool) {
        let gain = if mute { 0.0 } else { volume };
        for s in self.left.iter_mut().chain(self.right.iter_mut()) {
            *s *= gain;
        }
    }
}

/// A summing mixer over a fixed-length mono buffer.
#[derive(Debug, Clone)]
pub struct Mixer {
    buffer: Vec<f64>,
}

impl Mixer {
    pub fn new(num_samples: usize) -> Self {
        Mixer {
            buffer: vec![0.0; num_samples],
        }
    }

    /// Add `samples` left-aligned; anything past the end is dropped.
    pub fn add(&mut self, samples: &[f64]) {
        for (acc, &s) in self.buffer.iter_mut().zip(samples) {
            *acc += s;
        }
    }

    pub fn peak(&self) -> f64 {
        self.buffer.iter().fold(0.0_f64, |m, s| m.max(s.abs()))
    }

    /// Scale down to unit peak, only when the mix clips.
    pub fn normalize(&mut self) {
        let peak = self.peak();
        if peak > 1.0 {
            for s in self.buffer.iter_mut() {
                *s /= peak;
            }
        }
    }

    /// Linear fade from 1 to 0 over the final `fade_samples`.
    pub fn fade_out(&mut self, fade_samples: usize) {
        let n = fade_samples.min(self.buffer.len());
        let start = self.buffer.len() - n;
        for (s, gain) in self.buffer[start..].iter_mut().zip(linspace(1.0, 0.0, n)) {
            *s *= gain;
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn samples(&self) -> &[f64] {
        &self.buffer
    }

    pub fn into_samples(self) -> Vec<f64> {
        self.buffer
    }
}
