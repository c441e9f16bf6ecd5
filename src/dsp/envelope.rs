//! ADSR envelope applied over a whole fixed-length buffer.

use super::linspace;

/// ADSR Envelope with linear attack/decay/release ramps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    /// Attack time in seconds.
    pub attack: f64,
    /// Decay time in seconds.
    pub decay: f64,
    /// Sustain level [0, 1].
    pub sustain: f64,
    /// Release time in seconds.
    pub release: f64,
}

/// Sample counts of each envelope stage for one buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stages {
    pub attack: usize,
    pub decay: usize,
    pub sustain: usize,
    pub release: usize,
}

impl Default for Envelope {
    fn default() -> Self {
        Envelope {
            attack: 0.1,
            decay: 0.1,
            sustain: 0.7,
            release: 0.3,
        }
    }
}

impl Envelope {
    /// Split `total` samples into stages. Attack, decay and release are
    /// truncated to whole samples and capped in that order so they never
    /// exceed the buffer; sustain takes what is left.
    pub fn stages(&self, total: usize, sample_rate: f64) -> Stages {
        let to_samples = |seconds: f64| (seconds.max(0.0) * sample_rate) as usize;
        let attack = to_samples(self.attack).min(total);
        let decay = to_samples(self.decay).min(total - attack);
        let release = to_samples(self.release).min(total - attack - decay);
        Stages {
            attack,
            decay,
            sustain: total - attack - decay - release,
            release,
        }
    }

    /// The envelope curve for a buffer of `total` samples.
    pub fn shape(&self, total: usize, sample_rate: f64) -> Vec<f64> {
        let stages = self.stages(total, sample_rate);
        let mut curve = Vec::with_capacity(total);
        curve.extend(linspace(0.0, 1.0, stages.attack));
        curve.extend(linspace(1.0, self.sustain, stages.decay));
        curve.extend(std::iter::repeat_n(self.sustain, stages.sustain));
        curve.extend(linspace(self.sustain, 0.0, stages.release));
        curve
    }

    /// Multiply `samples` elementwise by the envelope.
    pub fn apply(&self, samples: &mut [f64], sample_rate: f64) {
        let curve = self.shape(samples.len(), sample_rate);
        for (s, e) in samples.iter_mut().zip(curve) {
            *s *= e;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_fit_inside_buffer() {
        let env = Envelope {
            attack: 1.0,
            decay: 1.0,
            sustain: 0.5,
            release: 1.0,
        };
        let stages = env.stages(1000, 44100.0);
        assert_eq!(stages.attack, 1000);
        assert_eq!(stages.decay, 0);
        assert_eq!(stages.release, 0);
        assert_eq!(stages.sustain, 0);
    }

    #[test]
    fn stage_counts_truncate() {
        let env = Envelope {
            attack: 0.01,
            decay: 0.02,
            sustain: 0.6,
            release: 0.005,
        };
        let stages = env.stages(44100, 44100.0);
        assert_eq!(stages.attack, 441);
        assert_eq!(stages.decay, 882);
        assert_eq!(stages.release, 220);
        assert_eq!(stages.sustain, 44100 - 441 - 882 - 220);
    }

    #[test]
    fn shape_hits_stage_endpoints() {
        let env = Envelope {
            attack: 0.01,
            decay: 0.01,
            sustain: 0.6,
            release: 0.01,
        };
        let curve = env.shape(4410, 44100.0);
        assert_eq!(curve.len(), 4410);
        assert_eq!(curve[0], 0.0);
        assert_eq!(curve[440], 1.0, "attack ramp should end at 1.0");
        assert_eq!(curve[441], 1.0, "decay ramp should start at 1.0");
        assert!((curve[881] - 0.6).abs() < 1e-12, "decay should land on sustain");
        assert_eq!(curve[2000], 0.6);
        assert_eq!(curve[4410 - 441], 0.6, "release ramp should start at sustain");
        assert_eq!(curve[4409], 0.0, "release should end at zero");
    }

    #[test]
    fn full_cycle_range() {
        let env = Envelope::default();
        for s in env.shape(22050, 44100.0) {
            assert!((0.0..=1.0).contains(&s), "Envelope out of range: {s}");
        }
    }

    #[test]
    fn zero_times_hold_sustain() {
        let env = Envelope {
            attack: 0.0,
            decay: 0.0,
            sustain: 0.25,
            release: 0.0,
        };
        let mut samples = vec![1.0; 16];
        env.apply(&mut samples, 44100.0);
        assert!(samples.iter().all(|&s| s == 0.25));
    }

    #[test]
    fn empty_buffer() {
        assert!(Envelope::default().shape(0, 44100.0).is_empty());
    }
}
