//! Oscillator rack presets.
//!
//! A rack file is a JSON list of oscillator snapshots. Every field is
//! optional on import; missing ones take the defaults below, which differ
//! slightly from a freshly added oscillator (louder, snappier envelope).

use serde::{Deserialize, Serialize};

use crate::dsp::engine::{check_name, next_default_name, ChordGenerator};
use crate::dsp::envelope::Envelope;
use crate::dsp::oscillator::Oscillator;
use crate::error::{DefinitionError, RackError};

// ── Snapshot ────────────────────────────────────────────────

/// Persisted settings of one oscillator. Frequency and phase are transient
/// and not stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscillatorPreset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub enabled: bool,
    pub waveform_selection: String,
    pub is_live_editing: bool,
    /// Only meaningful when `is_live_editing`; exported empty otherwise.
    pub live_edit_points: Vec<f64>,
    pub amplitude: f64,
    pub detune: f64,
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
    pub filter_cutoff: f64,
    pub filter_resonance: f64,
    pub pan: f64,
    /// Up to eight band gains; extra entries are ignored on import.
    pub eq_gains: Vec<f64>,
}

impl Default for OscillatorPreset {
    fn default() -> Self {
        OscillatorPreset {
            name: None,
            enabled: true,
            waveform_selection: "sine".to_string(),
            is_live_editing: false,
            live_edit_points: Vec::new(),
            amplitude: 0.7,
            detune: 0.0,
            attack: 0.01,
            decay: 0.1,
            sustain: 0.8,
            release: 0.2,
            filter_cutoff: 1.0,
            filter_resonance: 0.0,
            pan: 0.5,
            eq_gains: vec![0.0; 8],
        }
    }
}

impl OscillatorPreset {
    pub fn from_oscillator(osc: &Oscillator) -> Self {
        OscillatorPreset {
            name: Some(osc.name.clone()),
            enabled: osc.enabled,
            waveform_selection: osc.waveform.clone(),
            is_live_editing: osc.is_live_editing(),
            live_edit_points: if osc.is_live_editing() {
                osc.live_edit_points().to_vec()
            } else {
                Vec::new()
            },
            amplitude: osc.amplitude,
            detune: osc.detune,
            attack: osc.envelope.attack,
            decay: osc.envelope.decay,
            sustain: osc.envelope.sustain,
            release: osc.envelope.release,
            filter_cutoff: osc.filter_cutoff,
            filter_resonance: osc.filter_resonance,
            pan: osc.pan,
            eq_gains: osc.eq_gains.to_vec(),
        }
    }

    /// Build an oscillator; `fallback_name` is used when the snapshot has none.
    pub fn to_oscillator(&self, fallback_name: &str) -> Oscillator {
        let mut osc = Oscillator::new(self.name.as_deref().unwrap_or(fallback_name));
        osc.enabled = self.enabled;
        osc.waveform = self.waveform_selection.clone();
        osc.amplitude = self.amplitude;
        osc.detune = self.detune;
        osc.envelope = Envelope {
            attack: self.attack,
            decay: self.decay,
            sustain: self.sustain,
            release: self.release,
        };
        osc.filter_cutoff = self.filter_cutoff;
        osc.filter_resonance = self.filter_resonance;
        osc.pan = self.pan;
        for (band, &gain) in osc.eq_gains.iter_mut().zip(&self.eq_gains) {
            *band = gain;
        }
        if self.is_live_editing {
            osc.set_live_edit(Some(self.live_edit_points.clone()), true);
        }
        osc
    }
}

// ── Rack I/O ────────────────────────────────────────────────

/// Serialize the whole rack as pretty JSON, in rack order.
pub fn export_rack(generator: &ChordGenerator) -> Result<String, DefinitionError> {
    let presets: Vec<OscillatorPreset> = generator
        .iter()
        .map(|(_, osc)| OscillatorPreset::from_oscillator(osc))
        .collect();
    Ok(serde_json::to_string_pretty(&presets)?)
}

/// Replace the rack with the oscillators in `json`. Malformed input, a name
/// sequence text cannot refer to, or two entries sharing a name leave the
/// rack as it was; an empty list resets it to one default oscillator.
/// Unnamed entries are called `osc{position}`, or the next free default name
/// when that one is taken. Returns the number of oscillators now in the rack.
pub fn import_rack(generator: &mut ChordGenerator, json: &str) -> Result<usize, DefinitionError> {
    let presets: Vec<OscillatorPreset> = serde_json::from_str(json)?;
    if presets.is_empty() {
        tracing::info!("imported rack was empty, reset to one default oscillator");
    }

    let mut names: Vec<String> = Vec::with_capacity(presets.len());
    for name in presets.iter().filter_map(|p| p.name.as_deref()) {
        let checked = check_name(name).map_err(|e| invalid(name, e))?;
        if names.iter().any(|n| n == checked) {
            return Err(invalid(name, RackError::DuplicateName(checked.to_string())));
        }
        names.push(checked.to_string());
    }

    let mut oscillators = Vec::with_capacity(presets.len());
    for (i, preset) in presets.iter().enumerate() {
        let mut osc = preset.to_oscillator("");
        if preset.name.is_none() {
            let positional = format!("osc{}", i + 1);
            osc.name = if names.contains(&positional) {
                next_default_name(names.iter().map(String::as_str))
            } else {
                positional
            };
            names.push(osc.name.clone());
        } else {
            osc.name = osc.name.trim().to_string();
        }
        oscillators.push(osc);
    }
    generator.replace_rack(oscillators);
    Ok(generator.len())
}

fn invalid(name: &str, reason: RackError) -> DefinitionError {
    DefinitionError::Invalid {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_take_import_defaults() {
        let mut generator = ChordGenerator::new();
        import_rack(&mut generator, r#"[{"name": "Lead"}, {}]"#).unwrap();
        let oscs: Vec<&Oscillator> = generator.iter().map(|(_, o)| o).collect();
        assert_eq!(oscs.len(), 2);
        assert_eq!(oscs[0].name, "Lead");
        assert_eq!(oscs[1].name, "osc2", "unnamed entries are named by position");
        assert_eq!(oscs[0].amplitude, 0.7);
        assert_eq!(oscs[0].envelope.attack, 0.01);
        assert_eq!(oscs[0].envelope.sustain, 0.8);
        assert_eq!(oscs[0].envelope.release, 0.2);
        assert_eq!(oscs[0].waveform, "sine");
        assert!(oscs[0].enabled);
        assert_eq!(oscs[0].eq_gains, [0.0; 8]);
    }

    #[test]
    fn round_trip_preserves_settings() {
        let mut generator = ChordGenerator::new();
        let id = generator.add_oscillator();
        {
            let osc = generator.oscillator_mut(id).unwrap();
            osc.waveform = "triangle".into();
            osc.enabled = false;
            osc.detune = -12.5;
            osc.filter_cutoff = 0.3;
            osc.eq_gains[7] = -6.0;
            osc.set_live_edit(Some(vec![0.0, 1.0, -1.0]), true);
        }
        let json = export_rack(&generator).unwrap();

        let mut restored = ChordGenerator::new();
        assert_eq!(import_rack(&mut restored, &json).unwrap(), 2);
        let before: Vec<Oscillator> = generator.iter().map(|(_, o)| o.clone()).collect();
        let after: Vec<Oscillator> = restored.iter().map(|(_, o)| o.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn inactive_live_edit_points_are_not_exported() {
        let mut generator = ChordGenerator::new();
        let id = generator.ids()[0];
        generator
            .oscillator_mut(id)
            .unwrap()
            .set_live_edit(Some(vec![0.5, -0.5]), false);
        let json = export_rack(&generator).unwrap();
        let presets: Vec<OscillatorPreset> = serde_json::from_str(&json).unwrap();
        assert!(presets[0].live_edit_points.is_empty());
        assert!(json.contains("\"waveform_selection\": \"sine\""));
    }

    #[test]
    fn empty_list_resets_to_default() {
        let mut generator = ChordGenerator::new();
        generator.add_oscillator();
        generator.add_oscillator();
        assert_eq!(import_rack(&mut generator, "[]").unwrap(), 1);
        assert_eq!(generator.iter().next().unwrap().1.name, "osc1");
    }

    #[test]
    fn malformed_input_leaves_rack_unchanged() {
        let mut generator = ChordGenerator::new();
        let id = generator.add_oscillator();
        generator.rename_oscillator(id, "Keep").unwrap();
        assert!(import_rack(&mut generator, r#"{"name": "not a list"}"#).is_err());
        assert!(import_rack(&mut generator, r#"[{"amplitude": "loud"}]"#).is_err());
        assert_eq!(generator.len(), 2);
        assert_eq!(generator.find_by_name("Keep"), Some(id));
    }

    #[test]
    fn names_text_cannot_carry_are_refused() {
        for json in [
            r#"[{"name": "Lead"}, {"name": "Lead"}]"#,
            r#"[{"name": "Lead"}, {"name": " Lead "}]"#,
            r#"[{"name": "master"}]"#,
            r#"[{"name": "Pad]2"}]"#,
            r#"[{"name": "Pad\nTwo"}]"#,
            r#"[{"name": "  "}]"#,
        ] {
            let mut generator = ChordGenerator::new();
            let err = import_rack(&mut generator, json).unwrap_err();
            assert!(matches!(err, DefinitionError::Invalid { .. }), "{json}: {err:?}");
            assert_eq!(generator.len(), 1, "{json}: rack must be unchanged");
            assert_eq!(generator.iter().next().unwrap().1.name, "osc1");
        }
    }

    #[test]
    fn unnamed_entry_avoids_taken_default_name() {
        let mut generator = ChordGenerator::new();
        import_rack(&mut generator, r#"[{"name": "osc2"}, {}, {"name": " Bass "}]"#).unwrap();
        let names: Vec<&str> = generator.iter().map(|(_, o)| o.name.as_str()).collect();
        assert_eq!(names, vec!["osc2", "osc3", "Bass"]);
    }

    #[test]
    fn short_eq_list_fills_remaining_bands() {
        let mut generator = ChordGenerator::new();
        import_rack(&mut generator, r#"[{"eq_gains": [3.0, -3.0]}]"#).unwrap();
        let osc = generator.iter().next().unwrap().1;
        assert_eq!(osc.eq_gains, [3.0, -3.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }
}
