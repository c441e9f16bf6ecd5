use ariadne::{Config, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::dsp::engine::OscillatorId;
use crate::token::{Span, Token};

#[derive(Debug, Error)]
pub enum ShallotError {
    #[error("Lexer error: {0}")]
    Lex(#[from] LexError),
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Sequence error: {0}")]
    Compile(#[from] CompileError),
    #[error("Definition error: {0}")]
    Definition(#[from] DefinitionError),
    #[error("Rack error: {0}")]
    Rack(#[from] RackError),
    #[error("Sequencer error: {0}")]
    Sequencer(#[from] SequencerError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("unexpected char '{ch}' at line {}, column {}", span.line, span.column)]
    UnexpectedChar { ch: char, span: Span },
    #[error("unterminated oscillator name at line {}, column {}", span.line, span.column)]
    UnterminatedName { span: Span },
    #[error("invalid number '{text}' at line {}, column {}", span.line, span.column)]
    InvalidNumber { text: String, span: Span },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("expected {expected}, found {found:?} at line {}, column {}", span.line, span.column)]
    UnexpectedToken {
        expected: String,
        found: Token,
        span: Span,
    },
}

/// Errors raised while resolving a parsed sequence into chord steps.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("unknown pitch '{pitch}' at line {}, column {}", span.line, span.column)]
    UnknownPitch { pitch: String, span: Span },
    #[error("duration must be positive, got {value} at line {}, column {}", span.line, span.column)]
    InvalidDuration { value: f64, span: Span },
    #[error("beat length must be positive, got {value} at line {}, column {}", span.line, span.column)]
    InvalidBeatLength { value: f64, span: Span },
    #[error("{what} {value} is not a whole number at line {}, column {}", span.line, span.column)]
    NotAnInteger {
        what: &'static str,
        value: f64,
        span: Span,
    },
}

/// Errors loading or saving waveform/chord definition tables and racks.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid definition '{name}': {reason}")]
    Invalid { name: String, reason: String },
}

/// Refused oscillator rack operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RackError {
    #[error("cannot remove the last oscillator")]
    LastOscillator,
    #[error("no oscillator with id {0}")]
    UnknownOscillator(OscillatorId),
    #[error("oscillator name cannot be empty")]
    EmptyName,
    #[error("an oscillator named '{0}' already exists")]
    DuplicateName(String),
    #[error("'{0}' is reserved for the master target")]
    ReservedName(String),
    #[error("oscillator name '{0}' cannot contain brackets or control characters")]
    InvalidName(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SequencerError {
    #[error("tempo {0} BPM is outside 40..=300")]
    TempoOutOfRange(u32),
    #[error("no step at index {0}")]
    StepOutOfRange(usize),
    #[error("step duration must be positive, got {0}")]
    InvalidDuration(f64),
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedChar { span, .. }
            | LexError::UnterminatedName { span }
            | LexError::InvalidNumber { span, .. } => *span,
        }
    }
}

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedToken { span, .. } => *span,
        }
    }
}

impl CompileError {
    pub fn span(&self) -> Span {
        match self {
            CompileError::UnknownPitch { span, .. }
            | CompileError::InvalidDuration { span, .. }
            | CompileError::InvalidBeatLength { span, .. }
            | CompileError::NotAnInteger { span, .. } => *span,
        }
    }
}

impl ShallotError {
    /// Source location of a sequence-text error, if this error has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            ShallotError::Lex(e) => Some(e.span()),
            ShallotError::Parse(e) => Some(e.span()),
            ShallotError::Compile(e) => Some(e.span()),
            _ => None,
        }
    }

    /// 1-based line number of a sequence-text error.
    pub fn line(&self) -> Option<usize> {
        self.span().map(|s| s.line)
    }
}

/// Render an error against the text it came from as a plain-text,
/// line-annotated report. Errors without a location fall back to their
/// `Display` form.
pub fn render_report(source: &str, error: &ShallotError) -> String {
    let Some(span) = error.span() else {
        return error.to_string();
    };
    let end = span.end.max(span.start + 1);
    let mut out = Vec::new();
    let written = Report::build(ReportKind::Error, span.start..end)
        .with_config(Config::default().with_color(false))
        .with_message(error.to_string())
        .with_label(Label::new(span.start..end).with_message(label_for(error)))
        .finish()
        .write(Source::from(source), &mut out);
    match written {
        Ok(()) => String::from_utf8_lossy(&out).into_owned(),
        Err(_) => error.to_string(),
    }
}

fn label_for(error: &ShallotError) -> &'static str {
    match error {
        ShallotError::Lex(_) => "unexpected input",
        ShallotError::Parse(_) => "does not fit the step grammar",
        ShallotError::Compile(_) => "invalid value",
        _ => "here",
    }
}
