#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Number(f64),
    Ident(String),
    /// `[name]` — raw oscillator reference, brackets stripped.
    Bracketed(String),

    // Punctuation
    Dot,    // .
    Colon,  // :
    Pipe,   // |
    Comma,  // ,
    Plus,   // +
    Minus,  // -
    At,     // @
    LParen, // (
    RParen, // )

    // Structural
    Newline,
    EOF,
}

/// Source location: byte offsets plus the 1-based line/column of `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub span: Span,
}

/// Convert a token back to its approximate source representation.
pub fn token_to_string(token: &Token) -> String {
    match token {
        Token::Number(n) => format!("{n}"),
        Token::Ident(s) => s.clone(),
        Token::Bracketed(s) => format!("[{s}]"),
        Token::Dot => ".".into(),
        Token::Colon => ":".into(),
        Token::Pipe => "|".into(),
        Token::Comma => ",".into(),
        Token::Plus => "+".into(),
        Token::Minus => "-".into(),
        Token::At => "@".into(),
        Token::LParen => "(".into(),
        Token::RParen => ")".into(),
        Token::Newline => "end of line".into(),
        Token::EOF => "end of input".into(),
    }
}
