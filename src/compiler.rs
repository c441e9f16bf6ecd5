//! Sequence text compiler: resolves a parsed document against an oscillator
//! rack into chord steps, and writes chord steps back out as text.

use crate::ast::*;
use crate::dsp::engine::{ChordGenerator, Note, NoteTarget};
use crate::error::{CompileError, ShallotError};
use crate::sequencer::ChordStep;
use crate::theory::PitchClass;
use crate::token::Span;

/// Written in place of a note list for an empty step.
pub const NO_NOTES: &str = "(No notes)";

/// Parse and compile sequence text in one go.
pub fn compile_source(source: &str, rack: &ChordGenerator) -> Result<Vec<ChordStep>, ShallotError> {
    let doc = crate::parse(source)?;
    Ok(compile(&doc, rack)?)
}

/// Resolve every step of `doc`. Oscillator names are looked up in `rack`;
/// a name the rack does not know is routed to master with a warning.
pub fn compile(doc: &SequenceText, rack: &ChordGenerator) -> Result<Vec<ChordStep>, CompileError> {
    doc.steps.iter().map(|step| compile_step(step, rack)).collect()
}

fn compile_step(step: &StepLine, rack: &ChordGenerator) -> Result<ChordStep, CompileError> {
    let master_octave = whole_number("octave", step.master_octave, step.octave_span)?;
    if !(step.duration > 0.0 && step.duration.is_finite()) {
        return Err(CompileError::InvalidDuration {
            value: step.duration,
            span: step.duration_span,
        });
    }

    let notes = step
        .notes
        .iter()
        .map(|note| compile_note(note, rack))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ChordStep {
        master_octave,
        duration: step.duration,
        notes,
    })
}

fn compile_note(note: &NoteLine, rack: &ChordGenerator) -> Result<Note, CompileError> {
    let pitch = PitchClass::from_name(&note.pitch).ok_or_else(|| CompileError::UnknownPitch {
        pitch: note.pitch.clone(),
        span: note.span,
    })?;
    let octave_adjust = whole_number("octave adjustment", note.octave_adjust, note.adjust_span)?;

    if let Some(beats) = note.beat_length {
        if !(beats > 0.0 && beats.is_finite()) {
            return Err(CompileError::InvalidBeatLength {
                value: beats,
                span: note.beat_length_span.unwrap_or(note.span),
            });
        }
    }

    let target = match &note.target {
        TargetRef::Master => NoteTarget::Master,
        TargetRef::Named(name) => match rack.find_by_name(name) {
            Some(id) => NoteTarget::Oscillator(id),
            None => {
                tracing::warn!(oscillator = %name, line = note.span.line, "unknown oscillator, routing note to master");
                NoteTarget::Master
            }
        },
    };

    Ok(Note {
        pitch: pitch.name().to_string(),
        octave_adjust,
        target,
        beat_length: note.beat_length,
    })
}

fn whole_number(what: &'static str, value: f64, span: Span) -> Result<i32, CompileError> {
    if value.fract() != 0.0 || !value.is_finite() || value.abs() > i32::MAX as f64 {
        return Err(CompileError::NotAnInteger { what, value, span });
    }
    Ok(value as i32)
}

// ── Serialization ───────────────────────────────────────────

/// Write steps in the sequence text format, one line per step, numbered
/// from 1. Oscillator targets are written by their current rack name.
pub fn serialize(steps: &[ChordStep], rack: &ChordGenerator) -> String {
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| serialize_step(i + 1, step, rack))
        .collect::<Vec<_>>()
        .join("\n")
}

fn serialize_step(number: usize, step: &ChordStep, rack: &ChordGenerator) -> String {
    let notes = if step.notes.is_empty() {
        NO_NOTES.to_string()
    } else {
        step.notes
            .iter()
            .map(|note| serialize_note(note, rack))
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "{number}. Oct:{} | Dur:{} beats | Notes: {notes}",
        step.master_octave, step.duration
    )
}

fn serialize_note(note: &Note, rack: &ChordGenerator) -> String {
    let target = match note.target {
        NoteTarget::Master => "Master",
        NoteTarget::Oscillator(id) => match rack.oscillator(id) {
            Some(osc) => osc.name.as_str(),
            None => {
                tracing::warn!(oscillator = %id, "note targets a removed oscillator, writing as master");
                "Master"
            }
        },
    };
    let mut out = format!("{}{:+}[{target}]", note.pitch, note.octave_adjust);
    if let Some(beats) = note.beat_length {
        out.push_str(&format!("@{beats}"));
    }
    out
}
