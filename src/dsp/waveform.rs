//! Waveform definitions table and the raw (pre-envelope) waveform
//! generators: closed-form basic shapes, harmonic sums, and single-cycle
//! point tables.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DefinitionError;

/// The four intrinsic waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicShape {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl BasicShape {
    pub fn from_name(name: &str) -> Option<BasicShape> {
        match name {
            "sine" => Some(BasicShape::Sine),
            "square" => Some(BasicShape::Square),
            "sawtooth" | "saw" => Some(BasicShape::Sawtooth),
            "triangle" => Some(BasicShape::Triangle),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BasicShape::Sine => "sine",
            BasicShape::Square => "square",
            BasicShape::Sawtooth => "sawtooth",
            BasicShape::Triangle => "triangle",
        }
    }

    /// Unit-amplitude value at time `t` seconds for frequency `freq`.
    ///
    /// Sine and square honour `phase` (radians); sawtooth and triangle are
    /// anchored at t = 0.
    pub fn value(self, freq: f64, t: f64, phase: f64) -> f64 {
        match self {
            BasicShape::Sine => (2.0 * PI * freq * t + phase).sin(),
            BasicShape::Square => sign((2.0 * PI * freq * t + phase).sin()),
            BasicShape::Sawtooth => {
                let ft = freq * t;
                2.0 * (ft - (0.5 + ft).floor())
            }
            BasicShape::Triangle => {
                let ft = freq * t;
                2.0 * (2.0 * (ft - (0.5 + ft).floor())).abs() - 1.0
            }
        }
    }
}

/// Sign with `sign(0) == 0`, so a square wave sampled exactly on a zero
/// crossing contributes nothing.
fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// One partial of a custom waveform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Harmonic {
    /// Multiple of the fundamental frequency.
    #[serde(rename = "frequency")]
    pub multiplier: f64,
    pub amplitude: f64,
}

/// A named waveform definition as stored in `waveform_definitions.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WaveformDefinition {
    /// Closed-form shape; the table key selects the formula.
    Basic {
        #[serde(default)]
        description: String,
    },
    Custom {
        #[serde(default)]
        description: String,
        #[serde(default)]
        harmonics: Vec<Harmonic>,
    },
    /// One cycle drawn as evenly spaced points.
    Sculpted {
        #[serde(default)]
        description: String,
        #[serde(default)]
        points: Vec<f64>,
    },
}

impl WaveformDefinition {
    pub fn description(&self) -> &str {
        match self {
            WaveformDefinition::Basic { description }
            | WaveformDefinition::Custom { description, .. }
            | WaveformDefinition::Sculpted { description, .. } => description,
        }
    }
}

/// Name → definition table shared by every oscillator in a rack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WaveformTable {
    definitions: BTreeMap<String, WaveformDefinition>,
}

impl Default for WaveformTable {
    fn default() -> Self {
        let basic = |description: &str| WaveformDefinition::Basic {
            description: description.to_string(),
        };
        let mut definitions = BTreeMap::new();
        definitions.insert("sine".to_string(), basic("Pure sine wave"));
        definitions.insert("square".to_string(), basic("Square wave"));
        definitions.insert("sawtooth".to_string(), basic("Sawtooth wave"));
        definitions.insert("triangle".to_string(), basic("Triangle wave"));
        WaveformTable { definitions }
    }
}

static SINE: WaveformDefinition = WaveformDefinition::Basic {
    description: String::new(),
};

impl WaveformTable {
    pub fn from_json(json: &str) -> Result<Self, DefinitionError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load the table from `path`; a missing or malformed file degrades to
    /// the built-in basic waveforms.
    pub fn load_or_default(path: &Path) -> Self {
        match fs::read_to_string(path)
            .map_err(DefinitionError::from)
            .and_then(|json| Self::from_json(&json))
        {
            Ok(table) => {
                tracing::info!(path = %path.display(), waveforms = table.len(), "loaded waveform definitions");
                table
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "using built-in waveform definitions");
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> Result<String, DefinitionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), DefinitionError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&WaveformDefinition> {
        self.definitions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Look up `name`, degrading to sine when it is missing.
    ///
    /// Returns the name actually resolved alongside the definition, since a
    /// basic definition's formula is chosen by name.
    pub fn resolve<'a>(&'a self, name: &'a str) -> (&'a str, &'a WaveformDefinition) {
        if let Some(definition) = self.get(name) {
            return (name, definition);
        }
        tracing::warn!(waveform = name, "unknown waveform, falling back to sine");
        match self.get("sine") {
            Some(definition) => ("sine", definition),
            None => ("sine", &SINE),
        }
    }

    /// Merge a sculpted single-cycle waveform into the table, replacing any
    /// existing entry of the same name.
    pub fn insert_sculpted(&mut self, name: &str, points: Vec<f64>, description: Option<&str>) -> Result<(), DefinitionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DefinitionError::Invalid {
                name: name.to_string(),
                reason: "waveform name cannot be empty".into(),
            });
        }
        if points.iter().any(|p| !p.is_finite()) {
            return Err(DefinitionError::Invalid {
                name: name.to_string(),
                reason: "sculpted points must be finite".into(),
            });
        }
        let description = description.map_or_else(|| format!("User-sculpted waveform: {name}"), str::to_string);
        self.definitions
            .insert(name.to_string(), WaveformDefinition::Sculpted { description, points });
        Ok(())
    }

    /// Sample `count` evenly spaced points of one unit-amplitude cycle of
    /// the named waveform. Used to seed a point editor from an existing
    /// waveform.
    pub fn cycle_points(&self, name: &str, count: usize) -> Vec<f64> {
        if count == 0 {
            return Vec::new();
        }
        let (resolved, definition) = self.resolve(name);
        let phases = (0..count).map(|i| i as f64 / count as f64);
        match definition {
            WaveformDefinition::Basic { .. } => {
                let shape = BasicShape::from_name(resolved).unwrap_or(BasicShape::Sine);
                phases.map(|p| shape.value(1.0, p, 0.0)).collect()
            }
            WaveformDefinition::Custom { harmonics, .. } => {
                let times: Vec<f64> = phases.collect();
                harmonic_sum(harmonics, 1.0, &times, 0.0, 1.0)
            }
            WaveformDefinition::Sculpted { points, .. } => {
                phases.map(|p| interpolate_cycle(points, p)).collect()
            }
        }
    }
}

/// Sum of sine partials, peak-normalized and scaled by `amplitude`.
/// No harmonics yields silence.
pub fn harmonic_sum(harmonics: &[Harmonic], freq: f64, times: &[f64], phase: f64, amplitude: f64) -> Vec<f64> {
    let mut samples = vec![0.0; times.len()];
    if harmonics.is_empty() {
        return samples;
    }
    for h in harmonics {
        let f = freq * h.multiplier;
        for (s, &t) in samples.iter_mut().zip(times) {
            *s += h.amplitude * (2.0 * PI * f * t + phase).sin();
        }
    }
    let peak = samples.iter().fold(0.0_f64, |m, s| m.max(s.abs()));
    if peak > 0.0 {
        for s in samples.iter_mut() {
            *s /= peak;
        }
    }
    for s in samples.iter_mut() {
        *s *= amplitude;
    }
    samples
}

/// Value of a closed single-cycle point table at `phase` ∈ [0, 1).
///
/// The first point is repeated at phase 1 so the cycle wraps seamlessly;
/// knots sit at k/N for N points.
pub fn interpolate_cycle(points: &[f64], phase: f64) -> f64 {
    match points.len() {
        0 => 0.0,
        1 => points[0],
        n => {
            let x = phase.rem_euclid(1.0) * n as f64;
            let i = (x.floor() as usize).min(n - 1);
            let frac = x - i as f64;
            let a = points[i];
            let b = if i + 1 == n { points[0] } else { points[i + 1] };
            a + (b - a) * frac
        }
    }
}

/// Render a point table at `freq` over `times`, scaled by `amplitude`.
pub fn cycle_samples(points: &[f64], freq: f64, times: &[f64], amplitude: f64) -> Vec<f64> {
    times
        .iter()
        .map(|&t| amplitude * interpolate_cycle(points, (t * freq).rem_euclid(1.0)))
        .collect()
}
