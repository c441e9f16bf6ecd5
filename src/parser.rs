use crate::ast::*;
use crate::error::ParseError;
use crate::token::{token_to_string, Span, Spanned, Token};

pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Spanned>) -> Self {
        Parser { tokens, pos: 0 }
    }

    // ── Helpers ──────────────────────────────────────────────

    fn peek(&self) -> Token {
        self.tokens[self.pos].token.clone()
    }

    fn span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn prev_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].span
    }

    fn advance(&mut self) -> Spanned {
        let s = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        s
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::EOF)
    }

    fn check(&self, expected: &Token) -> bool {
        std::mem::discriminant(&self.tokens[self.pos].token) == std::mem::discriminant(expected)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: impl Into<String>) -> ParseError {
        ParseError::UnexpectedToken {
            expected: expected.into(),
            found: self.peek(),
            span: self.span(),
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<Spanned, ParseError> {
        if self.check(expected) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(format!("'{}'", token_to_string(expected))))
        }
    }

    fn expect_number(&mut self) -> Result<(f64, Span), ParseError> {
        match self.peek() {
            Token::Number(n) => Ok((n, self.advance().span)),
            _ => Err(self.unexpected("number")),
        }
    }

    /// A number with an optional leading sign.
    fn expect_signed_number(&mut self) -> Result<(f64, Span), ParseError> {
        let start = self.span();
        let sign = if self.eat(&Token::Minus) {
            -1.0
        } else {
            self.eat(&Token::Plus);
            1.0
        };
        let (value, end) = self.expect_number()?;
        Ok((sign * value, join(start, end)))
    }

    fn expect_ident(&mut self) -> Result<(String, Span), ParseError> {
        match self.peek() {
            Token::Ident(name) => Ok((name, self.advance().span)),
            _ => Err(self.unexpected("pitch name")),
        }
    }

    /// Keywords are matched case-insensitively so hand-edited files with
    /// `oct:` or `NOTES:` still load.
    fn expect_keyword(&mut self, keyword: &str) -> Result<Span, ParseError> {
        match self.peek() {
            Token::Ident(word) if word.eq_ignore_ascii_case(keyword) => Ok(self.advance().span),
            _ => Err(self.unexpected(format!("'{keyword}'"))),
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek(), Token::Newline) {
            self.advance();
        }
    }

    // ── Document ─────────────────────────────────────────────

    pub fn parse_sequence(&mut self) -> Result<SequenceText, ParseError> {
        let mut steps = Vec::new();
        self.skip_newlines();

        while !self.is_at_end() {
            steps.push(self.parse_step_line()?);
            if !self.is_at_end() {
                self.expect(&Token::Newline)?;
            }
            self.skip_newlines();
        }
        Ok(SequenceText { steps })
    }

    // ── Step Line ────────────────────────────────────────────

    fn parse_step_line(&mut self) -> Result<StepLine, ParseError> {
        let start = self.span();
        let (number, _) = self.expect_number()?;
        self.expect(&Token::Dot)?;

        self.expect_keyword("Oct")?;
        self.expect(&Token::Colon)?;
        let (master_octave, octave_span) = self.expect_signed_number()?;
        self.expect(&Token::Pipe)?;

        self.expect_keyword("Dur")?;
        self.expect(&Token::Colon)?;
        let (duration, duration_span) = self.expect_signed_number()?;
        self.expect_keyword("beats")?;
        self.expect(&Token::Pipe)?;

        self.expect_keyword("Notes")?;
        self.expect(&Token::Colon)?;
        let notes = self.parse_note_list()?;

        Ok(StepLine {
            number,
            master_octave,
            duration,
            notes,
            span: join(start, self.prev_span()),
            octave_span,
            duration_span,
        })
    }

    fn parse_note_list(&mut self) -> Result<Vec<NoteLine>, ParseError> {
        if self.eat(&Token::LParen) {
            self.expect_keyword("No")?;
            self.expect_keyword("notes")?;
            self.expect(&Token::RParen)?;
            return Ok(Vec::new());
        }

        let mut notes = vec![self.parse_note()?];
        while self.eat(&Token::Comma) {
            notes.push(self.parse_note()?);
        }
        Ok(notes)
    }

    fn parse_note(&mut self) -> Result<NoteLine, ParseError> {
        let (pitch, start) = self.expect_ident()?;

        let sign_span = self.span();
        let sign = match self.peek() {
            Token::Plus => 1.0,
            Token::Minus => -1.0,
            _ => return Err(self.unexpected("'+' or '-' octave adjustment")),
        };
        self.advance();
        let (magnitude, magnitude_span) = self.expect_number()?;

        let target = match self.peek() {
            Token::Bracketed(name) => {
                self.advance();
                TargetRef::from_name(&name)
            }
            _ => return Err(self.unexpected("'[oscillator]' or '[master]'")),
        };

        let (beat_length, beat_length_span) = if self.eat(&Token::At) {
            let (beats, span) = self.expect_number()?;
            (Some(beats), Some(span))
        } else {
            (None, None)
        };

        Ok(NoteLine {
            pitch,
            octave_adjust: sign * magnitude,
            target,
            beat_length,
            span: join(start, self.prev_span()),
            adjust_span: join(sign_span, magnitude_span),
            beat_length_span,
        })
    }
}

/// Span covering `a` through `b`, located at `a`.
fn join(a: Span, b: Span) -> Span {
    Span {
        start: a.start,
        end: b.end.max(a.end),
        line: a.line,
        column: a.column,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn test_parse_single_step() {
        let doc = parse("1. Oct:4 | Dur:1 beats | Notes: C+0[osc1], E+0[master], G-1[master]\n").unwrap();
        assert_eq!(doc.steps.len(), 1);
        let step = &doc.steps[0];
        assert_eq!(step.number, 1.0);
        assert_eq!(step.master_octave, 4.0);
        assert_eq!(step.duration, 1.0);
        assert_eq!(step.notes.len(), 3);
        assert_eq!(step.notes[0].pitch, "C");
        assert_eq!(step.notes[0].target, TargetRef::Named("osc1".into()));
        assert_eq!(step.notes[1].target, TargetRef::Master);
        assert_eq!(step.notes[2].octave_adjust, -1.0);
        assert_eq!(step.notes[2].beat_length, None);
    }

    #[test]
    fn test_parse_no_notes_and_blank_lines() {
        let doc = parse("\n1. Oct:3 | Dur:2 beats | Notes: (No notes)\n\n\n2. Oct:-1 | Dur:0.5 beats | Notes: A#+2[Bass]@0.25").unwrap();
        assert_eq!(doc.steps.len(), 2);
        assert!(doc.steps[0].notes.is_empty());
        assert_eq!(doc.steps[1].master_octave, -1.0);
        assert_eq!(doc.steps[1].duration, 0.5);
        assert_eq!(doc.steps[1].notes[0].beat_length, Some(0.25));
        assert_eq!(doc.steps[1].notes[0].target, TargetRef::Named("Bass".into()));
    }

    #[test]
    fn test_keywords_case_insensitive() {
        let doc = parse("1. oct:4 | DUR:1 Beats | notes: C+0[MASTER]").unwrap();
        assert_eq!(doc.steps[0].notes[0].target, TargetRef::Master);
    }

    #[test]
    fn test_missing_sign_reports_line_and_column() {
        let err = parse("1. Oct:4 | Dur:1 beats | Notes: C+0[osc1]\n2. Oct:4 | Dur:1 beats | Notes: D0[osc1]").unwrap_err();
        assert_eq!(err.line(), Some(2));
        let span = err.span().unwrap();
        assert_eq!(span.column, 35);
    }

    #[test]
    fn test_missing_field_is_error() {
        let err = parse("1. Oct:4 | Notes: C+0[osc1]").unwrap_err();
        assert_eq!(err.line(), Some(1));
        assert!(err.to_string().contains("'Dur'"), "got: {err}");
    }

    #[test]
    fn test_trailing_garbage_is_error() {
        let err = parse("1. Oct:4 | Dur:1 beats | Notes: C+0[osc1] extra").unwrap_err();
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    fn test_empty_document() {
        let doc = parse("\n\n").unwrap();
        assert!(doc.steps.is_empty());
    }
}
