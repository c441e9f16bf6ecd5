//! Synth configuration: output format and where the definition tables live.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dsp::mixer::SoundMode;
use crate::dsp::DEFAULT_SAMPLE_RATE;
use crate::error::DefinitionError;

/// Settings read once when a [`ChordGenerator`](crate::dsp::engine::ChordGenerator)
/// is built. Every field is optional in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SynthConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Path of the waveform definitions file.
    pub waveform_definitions: PathBuf,
    /// Path of the chord definitions file.
    pub chord_definitions: PathBuf,
    pub sound_mode: SoundMode,
}

impl Default for SynthConfig {
    fn default() -> Self {
        SynthConfig {
            sample_rate: DEFAULT_SAMPLE_RATE,
            waveform_definitions: PathBuf::from("waveform_definitions.json"),
            chord_definitions: PathBuf::from("chord_definitions.json"),
            sound_mode: SoundMode::default(),
        }
    }
}

impl SynthConfig {
    pub fn from_json(json: &str) -> Result<Self, DefinitionError> {
        let config: SynthConfig = serde_json::from_str(json)?;
        if config.sample_rate == 0 {
            return Err(DefinitionError::Invalid {
                name: "sampleRate".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, DefinitionError> {
        let config = Self::from_json(&fs::read_to_string(path)?)?;
        tracing::info!(path = %path.display(), sample_rate = config.sample_rate, "loaded synth config");
        Ok(config)
    }

    /// Resolve relative table paths against `dir`.
    pub fn relative_to(mut self, dir: &Path) -> Self {
        if self.waveform_definitions.is_relative() {
            self.waveform_definitions = dir.join(&self.waveform_definitions);
        }
        if self.chord_definitions.is_relative() {
            self.chord_definitions = dir.join(&self.chord_definitions);
        }
        self
    }
}
