//! Step sequencer — plays a list of chord steps against a tempo.
//!
//! Playback is cooperative: the sequencer renders the current step, hands
//! it to the [`Transport`] and asks the transport for a one-shot timer. The
//! host calls [`Sequencer::tick`] when that timer fires. Each step is
//! rendered with a short fade-out tail and the next tick is scheduled
//! before the tail ends, so consecutive chords overlap by the crossfade.

use serde::{Deserialize, Serialize};

use crate::compiler;
use crate::dsp::engine::{ChordGenerator, ChordRequest, Note, OscillatorId};
use crate::dsp::mixer::StereoBuffer;
use crate::error::{SequencerError, ShallotError};

pub const MIN_BPM: u32 = 40;
pub const MAX_BPM: u32 = 300;
pub const DEFAULT_BPM: u32 = 120;

/// Upper bound on the overlap between consecutive steps, in milliseconds.
pub const MAX_CROSSFADE_MS: f64 = 100.0;

/// One chord of a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChordStep {
    pub master_octave: i32,
    /// Length in beats.
    pub duration: f64,
    pub notes: Vec<Note>,
}

/// Handle for a scheduled tick, issued by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// The host side of playback: an audio sink plus a one-shot timer.
pub trait Transport {
    /// Start playing `buffer` without waiting for it to finish.
    fn play(&mut self, buffer: StereoBuffer);
    /// Silence everything currently playing.
    fn stop_all(&mut self);
    /// Arrange for [`Sequencer::tick`] to be called after `delay_ms`.
    fn schedule_tick(&mut self, delay_ms: u64) -> TimerId;
    fn cancel_tick(&mut self, timer: TimerId);
}

/// Master-section settings applied to every rendered step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MasterMix {
    pub volume: f64,
    pub mute: bool,
    pub solo: Option<OscillatorId>,
}

impl Default for MasterMix {
    fn default() -> Self {
        MasterMix {
            volume: 1.0,
            mute: false,
            solo: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
}

/// Millisecond timing of one step at a given tempo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepTiming {
    pub step_ms: f64,
    pub crossfade_ms: f64,
    /// Delay before the following step starts.
    pub next_tick_ms: u64,
    /// Delay after a step with no notes: the whole step, nothing to overlap.
    pub rest_tick_ms: u64,
}

impl StepTiming {
    pub fn new(duration_beats: f64, bpm: u32) -> Self {
        let exact_ms = 60000.0 / bpm as f64 * duration_beats;
        let step_ms = exact_ms.round();
        let crossfade_ms = (step_ms / 4.0).min(MAX_CROSSFADE_MS);
        let next_tick_ms = (step_ms - crossfade_ms).max(1.0).round() as u64;
        StepTiming {
            step_ms,
            crossfade_ms,
            next_tick_ms,
            rest_tick_ms: exact_ms.floor().max(1.0) as u64,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sequencer {
    steps: Vec<ChordStep>,
    bpm: u32,
    current_step: usize,
    state: PlaybackState,
    pending: Option<TimerId>,
    pub master: MasterMix,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequencer {
    pub fn new() -> Self {
        Sequencer {
            steps: Vec::new(),
            bpm: DEFAULT_BPM,
            current_step: 0,
            state: PlaybackState::Idle,
            pending: None,
            master: MasterMix::default(),
        }
    }

    pub fn steps(&self) -> &[ChordStep] {
        &self.steps
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    // ── Editing ─────────────────────────────────────────────

    pub fn add_step(&mut self, step: ChordStep) -> Result<(), SequencerError> {
        check_duration(&step)?;
        self.steps.push(step);
        Ok(())
    }

    pub fn remove_step(&mut self, index: usize) -> Result<ChordStep, SequencerError> {
        if index >= self.steps.len() {
            return Err(SequencerError::StepOutOfRange(index));
        }
        Ok(self.steps.remove(index))
    }

    pub fn replace_step(&mut self, index: usize, step: ChordStep) -> Result<ChordStep, SequencerError> {
        check_duration(&step)?;
        let slot = self
            .steps
            .get_mut(index)
            .ok_or(SequencerError::StepOutOfRange(index))?;
        Ok(std::mem::replace(slot, step))
    }

    /// Stop playback and drop every step.
    pub fn clear_sequence(&mut self, transport: &mut impl Transport) {
        self.stop_sequence(transport);
        self.steps.clear();
        self.current_step = 0;
    }

    pub fn set_bpm(&mut self, bpm: u32) -> Result<(), SequencerError> {
        if !(MIN_BPM..=MAX_BPM).contains(&bpm) {
            return Err(SequencerError::TempoOutOfRange(bpm));
        }
        self.bpm = bpm;
        Ok(())
    }

    // ── Playback ────────────────────────────────────────────

    /// Start from the first step. Does nothing on an empty sequence.
    pub fn play_sequence(&mut self, generator: &ChordGenerator, transport: &mut impl Transport) {
        if self.steps.is_empty() {
            tracing::debug!("play requested on an empty sequence");
            return;
        }
        self.state = PlaybackState::Playing;
        self.current_step = 0;
        self.tick(generator, transport);
    }

    /// Advance by one step: render and play the current step, then schedule
    /// the next tick. Past the last step, playback returns to idle.
    pub fn tick(&mut self, generator: &ChordGenerator, transport: &mut impl Transport) {
        if !self.is_playing() || self.current_step >= self.steps.len() {
            self.current_step = 0;
            self.state = PlaybackState::Idle;
            self.cancel_pending(transport);
            tracing::debug!("sequence finished");
            return;
        }

        let step = &self.steps[self.current_step];
        let timing = StepTiming::new(step.duration, self.bpm);

        let delay_ms = if step.notes.is_empty() {
            tracing::debug!(step = self.current_step + 1, "step has no notes, skipping audio");
            timing.rest_tick_ms
        } else {
            let request = ChordRequest {
                master_octave: step.master_octave,
                notes: step.notes.clone(),
                duration_ms: timing.step_ms,
                fade_out_ms: timing.crossfade_ms,
                master_volume: self.master.volume,
                master_mute: self.master.mute,
                solo: self.master.solo,
                bpm: self.bpm as f64,
            };
            transport.play(generator.generate_chord(&request));
            timing.next_tick_ms
        };

        tracing::debug!(step = self.current_step + 1, next_ms = delay_ms, "step played");
        self.current_step += 1;
        self.cancel_pending(transport);
        self.pending = Some(transport.schedule_tick(delay_ms));
    }

    pub fn stop_sequence(&mut self, transport: &mut impl Transport) {
        self.cancel_pending(transport);
        self.state = PlaybackState::Idle;
        transport.stop_all();
    }

    fn cancel_pending(&mut self, transport: &mut impl Transport) {
        if let Some(timer) = self.pending.take() {
            transport.cancel_tick(timer);
        }
    }

    // ── Text ────────────────────────────────────────────────

    /// Replace the step list with the steps in `text`. On any error the
    /// current steps are left untouched.
    pub fn import_text(&mut self, text: &str, generator: &ChordGenerator) -> Result<(), ShallotError> {
        let steps = compiler::compile_source(text, generator)?;
        tracing::debug!(steps = steps.len(), "sequence imported");
        self.steps = steps;
        self.current_step = 0;
        Ok(())
    }

    pub fn export_text(&self, generator: &ChordGenerator) -> String {
        compiler::serialize(&self.steps, generator)
    }
}

fn check_duration(step: &ChordStep) -> Result<(), SequencerError> {
    if step.duration > 0.0 && step.duration.is_finite() {
        Ok(())
    } else {
        Err(SequencerError::InvalidDuration(step.duration))
    }
}
