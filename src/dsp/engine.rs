//! Chord Engine — owns the oscillator rack and renders chords to stereo.
//!
//! A chord is a list of notes, each routed either to the master set (every
//! enabled oscillator, narrowed by solo) or to one oscillator by id. Every
//! routed oscillator renders the note independently; the results are summed,
//! normalized if they clip, faded out and spread to stereo.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::SynthConfig;
use crate::error::RackError;
use crate::theory::{note_frequency, ChordLibrary};

use super::mixer::{Mixer, SoundMode, StereoBuffer};
use super::oscillator::Oscillator;
use super::samples_for_ms;
use super::waveform::WaveformTable;
use super::DEFAULT_SAMPLE_RATE;

/// Stable handle for an oscillator within one rack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OscillatorId(pub u32);

impl fmt::Display for OscillatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a note is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoteTarget {
    /// Every enabled oscillator, or only the soloed one.
    #[default]
    Master,
    Oscillator(OscillatorId),
}

/// One note of a chord.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Pitch-class name, e.g. `"C#"`.
    pub pitch: String,
    #[serde(default)]
    pub octave_adjust: i32,
    #[serde(default)]
    pub target: NoteTarget,
    /// Length in beats; `None` sounds for the whole chord.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beat_length: Option<f64>,
}

impl Note {
    pub fn new(pitch: impl Into<String>) -> Self {
        Note {
            pitch: pitch.into(),
            octave_adjust: 0,
            target: NoteTarget::Master,
            beat_length: None,
        }
    }

    pub fn on(mut self, target: NoteTarget) -> Self {
        self.target = target;
        self
    }
}

/// Everything `generate_chord` needs besides the rack itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChordRequest {
    pub master_octave: i32,
    pub notes: Vec<Note>,
    pub duration_ms: f64,
    /// Extra tail appended after `duration_ms` and faded to silence.
    pub fade_out_ms: f64,
    pub master_volume: f64,
    pub master_mute: bool,
    pub solo: Option<OscillatorId>,
    pub bpm: f64,
}

impl Default for ChordRequest {
    fn default() -> Self {
        ChordRequest {
            master_octave: 4,
            notes: Vec::new(),
            duration_ms: 1000.0,
            fade_out_ms: 100.0,
            master_volume: 1.0,
            master_mute: false,
            solo: None,
            bpm: 120.0,
        }
    }
}

impl ChordRequest {
    pub fn new(master_octave: i32, notes: Vec<Note>, duration_ms: f64) -> Self {
        ChordRequest {
            master_octave,
            notes,
            duration_ms,
            ..ChordRequest::default()
        }
    }

    /// How long `note` sounds, in whole milliseconds (at least 1).
    pub fn note_ms(&self, note: &Note) -> f64 {
        let ms_per_beat = 60000.0 / self.bpm;
        let beats = note.beat_length.unwrap_or(self.duration_ms / ms_per_beat);
        (beats * ms_per_beat).min(self.duration_ms).floor().max(1.0)
    }
}

/// The next unused default oscillator name: `osc{n}` starting from one past
/// the current count.
pub fn next_default_name<'a>(existing: impl IntoIterator<Item = &'a str>) -> String {
    let existing: Vec<&str> = existing.into_iter().collect();
    (existing.len() + 1..)
        .map(|n| format!("osc{n}"))
        .find(|name| !existing.contains(&name.as_str()))
        .unwrap_or_default()
}

/// Trim `name` and check that sequence text can refer to it: non-empty,
/// not `master` in any case, and free of brackets and control characters.
pub fn check_name(name: &str) -> Result<&str, RackError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(RackError::EmptyName);
    }
    if name.eq_ignore_ascii_case("master") {
        return Err(RackError::ReservedName(name.to_string()));
    }
    if name.chars().any(|c| matches!(c, '[' | ']') || c.is_control()) {
        return Err(RackError::InvalidName(name.to_string()));
    }
    Ok(name)
}

/// The synthesizer: an oscillator rack plus the tables it renders from.
#[derive(Debug, Clone)]
pub struct ChordGenerator {
    rack: Vec<(OscillatorId, Oscillator)>,
    next_id: u32,
    pub chords: ChordLibrary,
    pub waveforms: WaveformTable,
    pub sample_rate: u32,
    pub sound_mode: SoundMode,
}

impl Default for ChordGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ChordGenerator {
    /// A generator with built-in tables and one default oscillator.
    pub fn new() -> Self {
        Self::with_tables(DEFAULT_SAMPLE_RATE, ChordLibrary::default(), WaveformTable::default())
    }

    pub fn with_tables(sample_rate: u32, chords: ChordLibrary, waveforms: WaveformTable) -> Self {
        let mut generator = ChordGenerator {
            rack: Vec::new(),
            next_id: 0,
            chords,
            waveforms,
            sample_rate,
            sound_mode: SoundMode::default(),
        };
        generator.add_oscillator();
        generator
    }

    /// Load definition tables named by `config`, falling back to the
    /// built-in ones for any file that is missing or malformed.
    pub fn from_config(config: &SynthConfig) -> Self {
        let chords = ChordLibrary::load_or_default(&config.chord_definitions);
        let waveforms = WaveformTable::load_or_default(&config.waveform_definitions);
        let mut generator = Self::with_tables(config.sample_rate, chords, waveforms);
        generator.sound_mode = config.sound_mode;
        generator
    }

    // ── Rack ────────────────────────────────────────────────

    /// Append a default oscillator with the next free `oscN` name.
    pub fn add_oscillator(&mut self) -> OscillatorId {
        let name = next_default_name(self.rack.iter().map(|(_, osc)| osc.name.as_str()));
        self.push_oscillator(Oscillator::new(name))
    }

    /// Append `oscillator` as-is.
    pub fn push_oscillator(&mut self, oscillator: Oscillator) -> OscillatorId {
        let id = OscillatorId(self.next_id);
        self.next_id += 1;
        self.rack.push((id, oscillator));
        id
    }

    /// Remove an oscillator. The last one in the rack cannot be removed.
    pub fn remove_oscillator(&mut self, id: OscillatorId) -> Result<Oscillator, RackError> {
        let index = self.position(id).ok_or(RackError::UnknownOscillator(id))?;
        if self.rack.len() == 1 {
            return Err(RackError::LastOscillator);
        }
        Ok(self.rack.remove(index).1)
    }

    /// Rename an oscillator. The name must pass [`check_name`] and not be
    /// used by any other oscillator.
    pub fn rename_oscillator(&mut self, id: OscillatorId, name: &str) -> Result<(), RackError> {
        let name = check_name(name)?;
        if self.rack.iter().any(|(other, osc)| *other != id && osc.name == name) {
            return Err(RackError::DuplicateName(name.to_string()));
        }
        let osc = self.oscillator_mut(id).ok_or(RackError::UnknownOscillator(id))?;
        osc.name = name.to_string();
        Ok(())
    }

    /// Replace the whole rack. Ids restart from zero in list order; an empty
    /// list leaves one default oscillator.
    pub fn replace_rack(&mut self, oscillators: Vec<Oscillator>) {
        self.rack.clear();
        self.next_id = 0;
        for osc in oscillators {
            self.push_oscillator(osc);
        }
        if self.rack.is_empty() {
            self.add_oscillator();
        }
    }

    pub fn oscillator(&self, id: OscillatorId) -> Option<&Oscillator> {
        self.rack.iter().find(|(i, _)| *i == id).map(|(_, osc)| osc)
    }

    pub fn oscillator_mut(&mut self, id: OscillatorId) -> Option<&mut Oscillator> {
        self.rack.iter_mut().find(|(i, _)| *i == id).map(|(_, osc)| osc)
    }

    /// Id of the first oscillator called `name`.
    pub fn find_by_name(&self, name: &str) -> Option<OscillatorId> {
        self.rack.iter().find(|(_, osc)| osc.name == name).map(|(id, _)| *id)
    }

    /// Index of `id` in rack order.
    pub fn position(&self, id: OscillatorId) -> Option<usize> {
        self.rack.iter().position(|(i, _)| *i == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (OscillatorId, &Oscillator)> {
        self.rack.iter().map(|(id, osc)| (*id, osc))
    }

    pub fn ids(&self) -> Vec<OscillatorId> {
        self.rack.iter().map(|(id, _)| *id).collect()
    }

    pub fn len(&self) -> usize {
        self.rack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rack.is_empty()
    }

    // ── Rendering ───────────────────────────────────────────

    /// Oscillators a master-routed note plays on.
    fn master_set(&self, solo: Option<OscillatorId>) -> Vec<&Oscillator> {
        if let Some(osc) = solo.and_then(|id| self.oscillator(id)).filter(|osc| osc.enabled) {
            return vec![osc];
        }
        self.rack.iter().map(|(_, osc)| osc).filter(|osc| osc.enabled).collect()
    }

    /// Oscillators `note` is routed to under the current solo.
    fn route(&self, note: &Note, solo: Option<OscillatorId>) -> Vec<&Oscillator> {
        match note.target {
            NoteTarget::Master => self.master_set(solo),
            NoteTarget::Oscillator(id) => match self.oscillator(id) {
                Some(osc) if osc.enabled && solo.is_none_or(|s| s == id) => vec![osc],
                Some(_) => Vec::new(),
                None => {
                    tracing::warn!(oscillator = %id, pitch = %note.pitch, "note targets a removed oscillator, routing to master");
                    self.master_set(solo)
                }
            },
        }
    }

    /// Render a chord to a stereo buffer of
    /// `duration_ms + fade_out_ms` worth of frames.
    pub fn generate_chord(&self, request: &ChordRequest) -> StereoBuffer {
        if request.notes.is_empty() {
            return StereoBuffer::default();
        }

        let sample_rate = self.sample_rate as f64;
        let total = samples_for_ms(request.duration_ms + request.fade_out_ms, sample_rate);
        let mut mix = Mixer::new(total);

        for note in &request.notes {
            let Some(frequency) = note_frequency(&note.pitch, request.master_octave, note.octave_adjust) else {
                tracing::warn!(pitch = %note.pitch, octave = request.master_octave, adjust = note.octave_adjust, "no frequency for note, skipped");
                continue;
            };
            let oscillators = self.route(note, request.solo);
            if oscillators.is_empty() {
                continue;
            }

            let note_ms = request.note_ms(note);
            let mut voice = Mixer::new(total);
            for osc in oscillators {
                voice.add(&osc.render(frequency, note_ms, sample_rate, &self.waveforms));
            }
            mix.add(voice.samples());
        }

        mix.normalize();
        mix.fade_out(samples_for_ms(request.fade_out_ms, sample_rate));

        let mut out = StereoBuffer::from_mono(mix.into_samples(), self.sound_mode, sample_rate);
        out.apply_master(request.master_volume, request.master_mute);
        tracing::debug!(frames = out.frames(), notes = request.notes.len(), "chord rendered");
        out
    }
}
