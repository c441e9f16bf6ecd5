//! A single voice generator: waveform → ADSR → lowpass → 8-band EQ.

use super::envelope::Envelope;
use super::filter::{apply_eq, OnePoleLowpass};
use super::samples_for_ms;
use super::waveform::{cycle_samples, harmonic_sum, BasicShape, WaveformDefinition, WaveformTable};

/// One oscillator in a rack. All parameters are plain fields; rendering
/// reads them and never writes back.
#[derive(Debug, Clone, PartialEq)]
pub struct Oscillator {
    /// Display name, unique within a rack.
    pub name: String,
    /// Basic shape name or key into the waveform table.
    pub waveform: String,
    /// Frequency used by [`Oscillator::generate_samples`]. Chord rendering
    /// passes the note frequency explicitly instead.
    pub frequency: f64,
    /// Output level [0, 1].
    pub amplitude: f64,
    /// Phase offset in radians.
    pub phase: f64,
    pub enabled: bool,
    /// Detune in cents [-100, 100].
    pub detune: f64,
    pub envelope: Envelope,
    /// Normalized lowpass cutoff [0, 1].
    pub filter_cutoff: f64,
    /// Lowpass resonance [0, 1].
    pub filter_resonance: f64,
    /// Stereo position [0, 1]. Stored and exported but not mixed.
    pub pan: f64,
    /// Per-band gain in dB [-12, 12].
    pub eq_gains: [f64; 8],
    is_live_editing: bool,
    live_edit_points: Vec<f64>,
}

impl Oscillator {
    pub fn new(name: impl Into<String>) -> Self {
        Oscillator {
            name: name.into(),
            waveform: "sine".to_string(),
            frequency: 440.0,
            amplitude: 0.5,
            phase: 0.0,
            enabled: true,
            detune: 0.0,
            envelope: Envelope::default(),
            filter_cutoff: 1.0,
            filter_resonance: 0.0,
            pan: 0.5,
            eq_gains: [0.0; 8],
            is_live_editing: false,
            live_edit_points: Vec::new(),
        }
    }

    /// Effective frequency accounting for detune (in cents).
    pub fn effective_frequency(&self, frequency: f64) -> f64 {
        frequency * 2.0_f64.powf(self.detune / 1200.0)
    }

    /// Install or clear the live-edit cycle. Passing `None` for `points`
    /// keeps the previously stored points, so toggling `active` off and on
    /// restores the same shape.
    pub fn set_live_edit(&mut self, points: Option<Vec<f64>>, active: bool) {
        if let Some(points) = points {
            self.live_edit_points = points;
        }
        self.is_live_editing = active;
    }

    pub fn is_live_editing(&self) -> bool {
        self.is_live_editing
    }

    pub fn live_edit_points(&self) -> &[f64] {
        &self.live_edit_points
    }

    /// Render at the oscillator's own `frequency` field.
    pub fn generate_samples(&self, duration_ms: f64, sample_rate: f64, table: &WaveformTable) -> Vec<f64> {
        self.render(self.frequency, duration_ms, sample_rate, table)
    }

    /// Render `duration_ms` of audio at `frequency`.
    pub fn render(&self, frequency: f64, duration_ms: f64, sample_rate: f64, table: &WaveformTable) -> Vec<f64> {
        let len = samples_for_ms(duration_ms, sample_rate);
        let times: Vec<f64> = (0..len).map(|i| i as f64 / sample_rate).collect();
        let freq = self.effective_frequency(frequency);

        let mut samples = self.raw_waveform(freq, &times, table);
        self.envelope.apply(&mut samples, sample_rate);
        OnePoleLowpass::new(self.filter_cutoff, self.filter_resonance).process(&mut samples);
        apply_eq(&mut samples, &self.eq_gains, sample_rate);
        samples
    }

    /// The waveform before envelope and filtering, already scaled by
    /// amplitude.
    fn raw_waveform(&self, freq: f64, times: &[f64], table: &WaveformTable) -> Vec<f64> {
        if self.is_live_editing && !self.live_edit_points.is_empty() {
            return cycle_samples(&self.live_edit_points, freq, times, self.amplitude);
        }

        let (name, definition) = table.resolve(&self.waveform);
        match definition {
            WaveformDefinition::Basic { .. } => {
                let shape = BasicShape::from_name(name).unwrap_or_else(|| {
                    tracing::warn!(waveform = name, "basic waveform has no formula, using sine");
                    BasicShape::Sine
                });
                times
                    .iter()
                    .map(|&t| self.amplitude * shape.value(freq, t, self.phase))
                    .collect()
            }
            WaveformDefinition::Custom { harmonics, .. } => {
                harmonic_sum(harmonics, freq, times, self.phase, self.amplitude)
            }
            WaveformDefinition::Sculpted { points, .. } => cycle_samples(points, freq, times, self.amplitude),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 44100.0;

    /// Unit-amplitude oscillator with a flat envelope and no filtering.
    fn raw(waveform: &str) -> Oscillator {
        let mut osc = Oscillator::new("test");
        osc.waveform = waveform.to_string();
        osc.amplitude = 1.0;
        osc.envelope = Envelope {
            attack: 0.0,
            decay: 0.0,
            sustain: 1.0,
            release: 0.0,
        };
        osc
    }

    fn rising_crossings(samples: &[f64]) -> Vec<usize> {
        (1..samples.len())
            .filter(|&i| samples[i - 1] < 0.0 && samples[i] >= 0.0)
            .collect()
    }

    #[test]
    fn sample_count_matches_duration() {
        let osc = Oscillator::new("a");
        assert_eq!(osc.generate_samples(1000.0, SR, &WaveformTable::default()).len(), 44100);
        assert_eq!(osc.generate_samples(10.0, 22050.0, &WaveformTable::default()).len(), 221);
        assert!(osc.generate_samples(0.0, SR, &WaveformTable::default()).is_empty());
    }

    #[test]
    fn basic_waveforms_have_expected_period() {
        let table = WaveformTable::default();
        let freq = 440.0;
        let period = SR / freq;
        for name in ["sine", "square", "sawtooth", "triangle"] {
            let samples = raw(name).render(freq, 1000.0, SR, &table);
            let crossings = rising_crossings(&samples);
            assert!(crossings.len() > 400, "{name}: too few cycles ({})", crossings.len());
            for pair in crossings.windows(2) {
                let gap = (pair[1] - pair[0]) as f64;
                assert!((gap - period).abs() <= 1.0, "{name}: cycle of {gap} samples, expected {period}");
            }
        }
    }

    #[test]
    fn symmetric_waveforms_have_no_dc() {
        let table = WaveformTable::default();
        for name in ["sine", "square", "triangle"] {
            let samples = raw(name).render(440.0, 1000.0, SR, &table);
            let mean = samples.iter().sum::<f64>() / samples.len() as f64;
            assert!(mean.abs() < 0.01, "{name}: DC offset {mean}");
        }
    }

    #[test]
    fn amplitude_scales_output() {
        let table = WaveformTable::default();
        let mut osc = raw("square");
        osc.amplitude = 0.25;
        let samples = osc.render(100.0, 100.0, SR, &table);
        let peak = samples.iter().fold(0.0_f64, |m, s| m.max(s.abs()));
        assert!((peak - 0.25).abs() < 1e-12);
    }

    #[test]
    fn detune_shifts_frequency() {
        let table = WaveformTable::default();
        let plain = rising_crossings(&raw("sine").render(220.0, 1000.0, SR, &table)).len();
        let mut up = raw("sine");
        up.detune = 1200.0;
        let octave_up = rising_crossings(&up.render(220.0, 1000.0, SR, &table)).len();
        assert!((octave_up as i64 - 2 * plain as i64).abs() <= 1, "{plain} vs {octave_up}");
    }

    #[test]
    fn unknown_waveform_renders_as_sine() {
        let table = WaveformTable::default();
        let sine = raw("sine").render(330.0, 50.0, SR, &table);
        let unknown = raw("no-such-wave").render(330.0, 50.0, SR, &table);
        assert_eq!(sine, unknown);
    }

    #[test]
    fn live_edit_overrides_selection() {
        let table = WaveformTable::default();
        let mut osc = raw("sine");
        osc.amplitude = 0.5;
        osc.set_live_edit(Some(vec![0.8]), true);
        let samples = osc.render(440.0, 10.0, SR, &table);
        assert!(samples.iter().all(|&s| (s - 0.4).abs() < 1e-12), "single point should give DC");

        osc.set_live_edit(None, false);
        assert_eq!(osc.render(440.0, 10.0, SR, &table), raw_half_sine(&table));
        assert_eq!(osc.live_edit_points(), &[0.8]);
    }

    fn raw_half_sine(table: &WaveformTable) -> Vec<f64> {
        let mut osc = raw("sine");
        osc.amplitude = 0.5;
        osc.render(440.0, 10.0, SR, table)
    }

    #[test]
    fn empty_live_edit_falls_back_to_waveform() {
        let table = WaveformTable::default();
        let mut osc = raw("sine");
        osc.amplitude = 0.5;
        osc.set_live_edit(Some(Vec::new()), true);
        assert_eq!(osc.render(440.0, 10.0, SR, &table), raw_half_sine(&table));
    }

    #[test]
    fn sculpted_and_custom_definitions() {
        let mut table = WaveformTable::from_json(
            r#"{"organ": {"type": "custom", "harmonics": [{"frequency": 1.0, "amplitude": 1.0}, {"frequency": 3.0, "amplitude": 0.3}]},
                "hollow": {"type": "custom", "harmonics": []}}"#,
        )
        .unwrap();
        table.insert_sculpted("ramp", vec![-1.0, 0.0, 1.0], None).unwrap();

        let mut osc = raw("organ");
        osc.amplitude = 0.6;
        let organ = osc.render(220.0, 100.0, SR, &table);
        let peak = organ.iter().fold(0.0_f64, |m, s| m.max(s.abs()));
        assert!((peak - 0.6).abs() < 1e-9, "custom waveform should peak at amplitude, got {peak}");

        osc.waveform = "hollow".into();
        assert!(osc.render(220.0, 10.0, SR, &table).iter().all(|&s| s == 0.0));

        osc.waveform = "ramp".into();
        let ramp = osc.render(441.0, 10.0, SR, &table);
        assert!((ramp[0] + 0.6).abs() < 1e-12, "sculpted cycle starts at first point");
        assert!(ramp.iter().all(|s| s.abs() <= 0.6 + 1e-12));
    }

    #[test]
    fn envelope_shapes_render() {
        let table = WaveformTable::default();
        let mut osc = raw("square");
        osc.envelope = Envelope {
            attack: 0.01,
            decay: 0.0,
            sustain: 1.0,
            release: 0.01,
        };
        let samples = osc.render(441.0, 100.0, SR, &table);
        assert_eq!(samples[0], 0.0);
        assert!(samples.last().unwrap().abs() < 1e-12);
    }

    #[test]
    fn eq_changes_output() {
        let table = WaveformTable::default();
        let flat = raw("sine").render(1000.0, 100.0, SR, &table);
        let mut boosted = raw("sine");
        boosted.eq_gains[4] = 12.0;
        let loud = boosted.render(1000.0, 100.0, SR, &table);
        let peak = |v: &[f64]| v.iter().fold(0.0_f64, |m, s| m.max(s.abs()));
        assert!(peak(&loud) > 2.0 * peak(&flat));
    }

    #[test]
    fn rendering_is_repeatable() {
        let table = WaveformTable::default();
        let mut osc = Oscillator::new("a");
        osc.filter_cutoff = 0.4;
        osc.filter_resonance = 0.2;
        osc.eq_gains = [3.0, 0.0, -3.0, 0.0, 6.0, 0.0, 0.0, -6.0];
        let before = osc.clone();
        let first = osc.render(261.63, 250.0, SR, &table);
        let second = osc.render(261.63, 250.0, SR, &table);
        assert_eq!(first, second);
        assert_eq!(osc, before);
    }
}
