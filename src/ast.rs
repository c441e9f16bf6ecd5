//! Syntax tree for the sequence text format.
//!
//! One `StepLine` per non-blank line:
//! `<n>. Oct:<octave> | Dur:<beats> beats | Notes: <note>, <note>, ...`

use crate::token::Span;

/// A parsed sequence document.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceText {
    pub steps: Vec<StepLine>,
}

/// One chord step as written.
#[derive(Debug, Clone, PartialEq)]
pub struct StepLine {
    /// The leading step number (`<n>.`). Informational only.
    pub number: f64,
    pub master_octave: f64,
    pub duration: f64,
    pub notes: Vec<NoteLine>,
    pub span: Span,
    pub octave_span: Span,
    pub duration_span: Span,
}

/// `<Pitch><+|-><adjust>[<target>]` with an optional `@<beats>` suffix.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteLine {
    pub pitch: String,
    pub octave_adjust: f64,
    pub target: TargetRef,
    pub beat_length: Option<f64>,
    pub span: Span,
    pub adjust_span: Span,
    pub beat_length_span: Option<Span>,
}

/// Oscillator reference inside the brackets.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetRef {
    Master,
    Named(String),
}

impl TargetRef {
    /// `master` (any case) routes to all oscillators.
    pub fn from_name(name: &str) -> TargetRef {
        if name.eq_ignore_ascii_case("master") {
            TargetRef::Master
        } else {
            TargetRef::Named(name.to_string())
        }
    }
}
