use crate::error::LexError;
use crate::token::{Span, Spanned, Token};

pub struct Lexer {
    chars: Vec<char>,
    /// Precomputed byte offset for each char index.
    /// `byte_offsets[i]` = byte offset of `chars[i]` in the original `&str`.
    /// `byte_offsets[chars.len()]` = total byte length (sentinel for EOF).
    byte_offsets: Vec<usize>,
    pos: usize,
    line: usize,
    /// Char index where the current line begins.
    line_start: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let mut byte_offsets = Vec::with_capacity(chars.len() + 1);
        let mut offset = 0;
        for ch in &chars {
            byte_offsets.push(offset);
            offset += ch.len_utf8();
        }
        byte_offsets.push(offset);
        Lexer {
            chars,
            byte_offsets,
            pos: 0,
            line: 1,
            line_start: 0,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Spanned>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let spanned = self.next_token()?;
            let is_eof = spanned.token == Token::EOF;
            let is_newline = spanned.token == Token::Newline;
            tokens.push(spanned);
            if is_newline {
                self.line += 1;
                self.line_start = self.pos;
            }
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.chars.len() {
            let ch = self.chars[self.pos];
            if ch == ' ' || ch == '\t' || ch == '\r' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn byte_pos_of(&self, char_idx: usize) -> usize {
        self.byte_offsets[char_idx.min(self.chars.len())]
    }

    fn span_from(&self, start: usize) -> Span {
        Span {
            start: self.byte_pos_of(start),
            end: self.byte_pos_of(self.pos),
            line: self.line,
            column: start - self.line_start + 1,
        }
    }

    fn spanned(&self, token: Token, start: usize) -> Spanned {
        Spanned {
            token,
            span: self.span_from(start),
        }
    }

    fn single(&mut self, token: Token, start: usize) -> Result<Spanned, LexError> {
        self.advance();
        Ok(self.spanned(token, start))
    }

    fn next_token(&mut self) -> Result<Spanned, LexError> {
        self.skip_whitespace();

        let start = self.pos;
        let Some(ch) = self.peek_at(0) else {
            return Ok(self.spanned(Token::EOF, start));
        };

        match ch {
            '\n' => self.single(Token::Newline, start),
            '.' => self.single(Token::Dot, start),
            ':' => self.single(Token::Colon, start),
            '|' => self.single(Token::Pipe, start),
            ',' => self.single(Token::Comma, start),
            '+' => self.single(Token::Plus, start),
            '-' => self.single(Token::Minus, start),
            '@' => self.single(Token::At, start),
            '(' => self.single(Token::LParen, start),
            ')' => self.single(Token::RParen, start),
            '[' => self.lex_bracketed(start),
            c if c.is_ascii_digit() => self.lex_number(start),
            c if c.is_ascii_alphabetic() || c == '_' => self.lex_ident(start),
            _ => Err(LexError::UnexpectedChar {
                ch,
                span: Span {
                    end: self.byte_pos_of(start + 1),
                    ..self.span_from(start)
                },
            }),
        }
    }

    /// Oscillator names may contain spaces and punctuation, so everything
    /// up to the closing bracket on the same line is taken verbatim.
    fn lex_bracketed(&mut self, start: usize) -> Result<Spanned, LexError> {
        self.advance(); // consume [
        let mut name = String::new();
        loop {
            match self.peek_at(0) {
                Some(']') => {
                    self.advance();
                    break;
                }
                Some('\n') | None => return Err(LexError::UnterminatedName { span: self.span_from(start) }),
                Some(c) => {
                    name.push(c);
                    self.advance();
                }
            }
        }
        Ok(self.spanned(Token::Bracketed(name.trim().to_string()), start))
    }

    fn lex_number(&mut self, start: usize) -> Result<Spanned, LexError> {
        while self.pos < self.chars.len() {
            let ch = self.chars[self.pos];
            if ch.is_ascii_digit() {
                self.pos += 1;
            } else if ch == '.' {
                // Only consume dot as decimal if followed by a digit
                if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                } else {
                    break;
                }
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        let num: f64 = text.parse().map_err(|_| LexError::InvalidNumber {
            text: text.clone(),
            span: self.span_from(start),
        })?;
        Ok(self.spanned(Token::Number(num), start))
    }

    /// Identifiers cover keywords (`Oct`, `Dur`, `beats`, `Notes`) and pitch
    /// names, so `#` is allowed after the first character.
    fn lex_ident(&mut self, start: usize) -> Result<Spanned, LexError> {
        while self.pos < self.chars.len() {
            let ch = self.chars[self.pos];
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '#' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        Ok(self.spanned(Token::Ident(text), start))
    }
}
