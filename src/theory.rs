//! Pitch classes, base frequencies, and chord interval definitions.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dsp::engine::{Note, NoteTarget};
use crate::error::DefinitionError;

/// One of the twelve equal-tempered pitch classes (sharp spelling).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PitchClass {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

/// All pitch classes in chromatic order starting at C.
pub const PITCH_CLASSES: [PitchClass; 12] = [
    PitchClass::C,
    PitchClass::CSharp,
    PitchClass::D,
    PitchClass::DSharp,
    PitchClass::E,
    PitchClass::F,
    PitchClass::FSharp,
    PitchClass::G,
    PitchClass::GSharp,
    PitchClass::A,
    PitchClass::ASharp,
    PitchClass::B,
];

/// Base frequencies at octave 4 (the reference octave), rounded to 0.01 Hz.
const BASE_FREQUENCIES: [f64; 12] = [
    261.63, 277.18, 293.66, 311.13, 329.63, 349.23, 369.99, 392.00, 415.30, 440.00, 466.16, 493.88,
];

/// Octave at which `BASE_FREQUENCIES` are stored.
pub const REFERENCE_OCTAVE: i32 = 4;

impl PitchClass {
    /// Semitone index within the octave, C = 0.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> PitchClass {
        PITCH_CLASSES[index % 12]
    }

    /// Canonical (sharp) spelling, e.g. `"C#"`.
    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }

    /// Parse a pitch-class name. Accepts sharp spellings and their flat
    /// enharmonic equivalents (`Db` → `C#`, `Cb` → `B`, `Fb` → `E`).
    pub fn from_name(name: &str) -> Option<PitchClass> {
        let bytes = name.as_bytes();
        let (&letter, accidental) = bytes.split_first()?;
        let natural: i32 = match letter {
            b'C' => 0,
            b'D' => 2,
            b'E' => 4,
            b'F' => 5,
            b'G' => 7,
            b'A' => 9,
            b'B' => 11,
            _ => return None,
        };
        let shift = match accidental {
            [] => 0,
            [b'#'] => 1,
            [b'b'] => -1,
            _ => return None,
        };
        // Only the five sharps of the chromatic scale are spelled with '#'.
        if shift == 1 && matches!(letter, b'E' | b'B') {
            return None;
        }
        Some(PitchClass::from_index((natural + shift).rem_euclid(12) as usize))
    }

    /// Base frequency of this pitch class at the reference octave.
    pub fn base_frequency(self) -> f64 {
        BASE_FREQUENCIES[self.index()]
    }

    /// Frequency at `REFERENCE_OCTAVE + octave_offset`.
    pub fn frequency(self, octave_offset: i32) -> f64 {
        self.base_frequency() * 2.0_f64.powi(octave_offset)
    }

    /// The pitch class `semitones` above this one, wrapping at the octave.
    pub fn transpose(self, semitones: i32) -> PitchClass {
        PitchClass::from_index((self.index() as i32 + semitones).rem_euclid(12) as usize)
    }
}

impl std::fmt::Display for PitchClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolve a note's frequency from its pitch name and octave placement.
///
/// Returns `None` when the pitch name is not a recognised pitch class, or
/// when the octave lies so far out that the frequency is not a finite number.
pub fn note_frequency(pitch: &str, master_octave: i32, octave_adjust: i32) -> Option<f64> {
    let pitch = PitchClass::from_name(pitch)?;
    let offset = master_octave
        .checked_sub(REFERENCE_OCTAVE)?
        .checked_add(octave_adjust)?;
    Some(pitch.frequency(offset)).filter(|f| f.is_finite())
}

// ── Chord Definitions ───────────────────────────────────────

/// A named chord shape: semitone intervals above the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordDefinition {
    pub intervals: Vec<i32>,
    #[serde(default)]
    pub description: String,
}

/// The chord interval dictionary (`name → definition`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChordLibrary {
    definitions: BTreeMap<String, ChordDefinition>,
}

impl Default for ChordLibrary {
    fn default() -> Self {
        let builtin: [(&str, &[i32], &str); 9] = [
            ("major", &[0, 4, 7], "Major triad (1, 3, 5)"),
            ("minor", &[0, 3, 7], "Minor triad (1, ♭3, 5)"),
            ("diminished", &[0, 3, 6], "Diminished triad (1, ♭3, ♭5)"),
            ("augmented", &[0, 4, 8], "Augmented triad (1, 3, #5)"),
            ("major7", &[0, 4, 7, 11], "Major seventh (1, 3, 5, 7)"),
            ("minor7", &[0, 3, 7, 10], "Minor seventh (1, ♭3, 5, ♭7)"),
            ("dominant7", &[0, 4, 7, 10], "Dominant seventh (1, 3, 5, ♭7)"),
            ("sus2", &[0, 2, 7], "Suspended 2nd (1, 2, 5)"),
            ("sus4", &[0, 5, 7], "Suspended 4th (1, 4, 5)"),
        ];
        let definitions = builtin
            .iter()
            .map(|(name, intervals, description)| {
                (
                    name.to_string(),
                    ChordDefinition {
                        intervals: intervals.to_vec(),
                        description: description.to_string(),
                    },
                )
            })
            .collect();
        ChordLibrary { definitions }
    }
}

impl ChordLibrary {
    /// Parse a chord table from JSON.
    pub fn from_json(json: &str) -> Result<Self, DefinitionError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load the chord table from `path`, falling back to the built-in
    /// defaults when the file is missing or malformed.
    pub fn load_or_default(path: &Path) -> Self {
        match fs::read_to_string(path)
            .map_err(DefinitionError::from)
            .and_then(|json| Self::from_json(&json))
        {
            Ok(library) => {
                tracing::info!(path = %path.display(), chords = library.len(), "loaded chord definitions");
                library
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "using built-in chord definitions");
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

    /// Add or replace a chord definition.
    pub fn add_definition(&mut self, name: &str, intervals: Vec<i32>, description: &str) {
        self.definitions.insert(
            name.to_string(),
            ChordDefinition {
                intervals,
                description: description.to_string(),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&ChordDefinition> {
        self.definitions.get(name)
    }

    /// Description of a chord type, empty if unknown.
    pub fn description(&self, name: &str) -> &str {
        self.get(name).map_or("", |d| d.description.as_str())
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

    /// Expand a named chord over `root` into master-routed notes.
    ///
    /// Returns `None` if the chord name is unknown.
    pub fn expand(&self, root: PitchClass, name: &str, beat_length: Option<f64>) -> Option<Vec<Note>> {
        let definition = self.get(name)?;
        Some(
            definition
                .intervals
                .iter()
                .map(|&interval| Note {
                    pitch: root.transpose(interval).name().to_string(),
                    octave_adjust: 0,
                    target: NoteTarget::Master,
                    beat_length,
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sharps_and_flats() {
        assert_eq!(PitchClass::from_name("C#"), Some(PitchClass::CSharp));
        assert_eq!(PitchClass::from_name("Db"), Some(PitchClass::CSharp));
        assert_eq!(PitchClass::from_name("Bb"), Some(PitchClass::ASharp));
        assert_eq!(PitchClass::from_name("Cb"), Some(PitchClass::B));
        assert_eq!(PitchClass::from_name("Fb"), Some(PitchClass::E));
        assert_eq!(PitchClass::from_name("A"), Some(PitchClass::A));
    }

    #[test]
    fn rejects_unknown_names() {
        assert_eq!(PitchClass::from_name(""), None);
        assert_eq!(PitchClass::from_name("H"), None);
        assert_eq!(PitchClass::from_name("E#"), None);
        assert_eq!(PitchClass::from_name("C##"), None);
        assert_eq!(PitchClass::from_name("c"), None);
    }

    #[test]
    fn octave_shifts_double_frequency() {
        assert_eq!(note_frequency("A", 4, 0), Some(440.0));
        assert_eq!(note_frequency("A", 5, 0), Some(880.0));
        assert_eq!(note_frequency("A", 4, -1), Some(220.0));
        assert_eq!(note_frequency("X", 4, 0), None);
    }

    #[test]
    fn extreme_octaves_have_no_frequency() {
        assert_eq!(note_frequency("C", i32::MAX, 10), None);
        assert_eq!(note_frequency("C", i32::MIN, 0), None);
        assert_eq!(note_frequency("C", 2000, 0), None, "2^1996 overflows f64");
    }

    #[test]
    fn transpose_wraps() {
        assert_eq!(PitchClass::A.transpose(3), PitchClass::C);
        assert_eq!(PitchClass::C.transpose(-1), PitchClass::B);
        assert_eq!(PitchClass::G.transpose(12), PitchClass::G);
    }

    #[test]
    fn expand_major_chord() {
        let library = ChordLibrary::default();
        let notes = library.expand(PitchClass::C, "major", None).unwrap();
        let pitches: Vec<_> = notes.iter().map(|n| n.pitch.as_str()).collect();
        assert_eq!(pitches, vec!["C", "E", "G"]);
        assert!(notes.iter().all(|n| n.octave_adjust == 0));
        assert!(library.expand(PitchClass::C, "no-such-chord", None).is_none());
    }

    #[test]
    fn expand_wraps_past_octave() {
        let library = ChordLibrary::default();
        let notes = library.expand(PitchClass::A, "minor7", Some(2.0)).unwrap();
        let pitches: Vec<_> = notes.iter().map(|n| n.pitch.as_str()).collect();
        assert_eq!(pitches, vec!["A", "C", "E", "G"]);
        assert!(notes.iter().all(|n| n.beat_length == Some(2.0)));
    }

    #[test]
    fn chord_library_json_round_trip() {
        let mut library = ChordLibrary::default();
        library.add_definition("power", vec![0, 7], "Power chord");
        let json = library.to_json().unwrap();
        let parsed = ChordLibrary::from_json(&json).unwrap();
        assert_eq!(parsed, library);
        assert_eq!(parsed.description("power"), "Power chord");
        assert_eq!(parsed.description("missing"), "");
    }

    #[test]
    fn malformed_chord_json_is_an_error() {
        assert!(ChordLibrary::from_json("{\"major\": {\"intervals\": \"oops\"}}").is_err());
    }

    #[test]
    fn missing_chord_file_falls_back_to_defaults() {
        let library = ChordLibrary::load_or_default(Path::new("/nonexistent/chords.json"));
        assert_eq!(library, ChordLibrary::default());
    }
}
