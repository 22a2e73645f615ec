//! HUNT lexer.
//!
//! Tokenizes HUNT source into a flat stream with source spans attached.
//! The lexer is deliberately context-free (spec.md §4.3): it does not know
//! about CBHS bracket tiers or column-alignment rules, it only records
//! each token's column so the parser — which does understand tiers — can
//! enforce alignment itself. This split keeps the lexer reusable if the
//! grammar ever grows a fifth tier.
//!
//! Failure handling follows the same "keep going" philosophy as the rest
//! of the pipeline: an unterminated literal or unknown punctuation
//! produces a [`LexError`] token and scanning resumes at the next
//! newline, rather than aborting the whole file.

use std::fmt;

use crate::ast::Span;
use crate::error::LexError;

/// Case classification attached to identifier tokens. Computed eagerly so
/// the parser's per-tier naming checks are a simple enum compare rather
/// than a second character scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentCase {
    /// `PascalCase`.
    Pascal,
    /// `SCREAMING_SNAKE_CASE`.
    ScreamingSnake,
    /// `camelCase`.
    Camel,
    /// `snake_case`.
    Snake,
    /// Does not cleanly fit any of the above (e.g. `Mixed_Case1`).
    Other,
}

impl IdentCase {
    /// Classify `ident`'s case shape.
    pub fn classify(ident: &str) -> Self {
        if crate::ast::NamingCase::Pascal.matches(ident) {
            IdentCase::Pascal
        } else if crate::ast::NamingCase::ScreamingSnake.matches(ident) {
            IdentCase::ScreamingSnake
        } else if crate::ast::NamingCase::Snake.matches(ident) {
            IdentCase::Snake
        } else if crate::ast::NamingCase::Camel.matches(ident) {
            IdentCase::Camel
        } else {
            IdentCase::Other
        }
    }
}

/// Recognized keywords. `Gather` and `GET` both lex to [`Keyword::Gather`]
/// (spec.md §9 open question); `spelling` records which one the source
/// actually used so a caller can audit divergence without the parser
/// treating it as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// `true`.
    True,
    /// `false`.
    False,
    /// `EXEC`.
    Exec,
    /// `INIT`.
    Init,
    /// `req`.
    Req,
    /// `prohib`.
    Prohib,
    /// `floop`.
    Floop,
    /// `Gather` or its alias `GET`.
    Gather,
}

impl Keyword {
    fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "true" => Keyword::True,
            "false" => Keyword::False,
            "EXEC" => Keyword::Exec,
            "INIT" => Keyword::Init,
            "req" => Keyword::Req,
            "prohib" => Keyword::Prohib,
            "floop" => Keyword::Floop,
            "Gather" | "GET" => Keyword::Gather,
            _ => return None,
        })
    }
}

/// One lexical token kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `<`
    LAngle,
    /// `>`
    RAngle,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `:`
    Colon,
    /// `@@`
    Chain,
    /// `&`
    Link,
    /// `=`
    Assign,
    /// `,`
    Comma,
    /// An identifier, with the raw spelling and its classified case.
    Ident {
        /// Raw identifier text as it appeared in source.
        text: String,
        /// Case classification.
        case: IdentCase,
    },
    /// A recognized keyword. `spelling` preserves the exact source text
    /// (relevant for the `Gather`/`GET` alias).
    Keyword {
        /// The keyword.
        keyword: Keyword,
        /// Exact source spelling.
        spelling: String,
    },
    /// A double-quoted string literal with escapes already resolved.
    String(String),
    /// An integer literal.
    Int(i64),
    /// A single-line `#`-to-end-of-line comment (text excludes the `#`).
    Comment(String),
    /// A `##--#` … `#--##` docstring, with interior text preserved verbatim.
    Docstring(String),
    /// A lexical error; scanning resumes after this token.
    Error(LexError),
}

/// One token with its source span.
#[derive(Debug, Clone)]
pub struct Token {
    /// The token's kind.
    pub kind: TokenKind,
    /// Source span.
    pub span: Span,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} @ {}", self.kind, self.span)
    }
}

/// Tokenizes `source` in full, returning every token including error
/// tokens. The lexer never stops early — a malformed literal produces an
/// [`TokenKind::Error`] token and scanning continues on the next line.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self { source, bytes: source.as_bytes(), pos: 0, line: 1, column: 1 }
    }

    fn run(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            tokens.push(token);
        }
        tokens
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(b)
    }

    fn here(&self) -> Span {
        Span::point(self.line, self.column, self.pos)
    }

    fn skip_to_newline(&mut self) {
        while let Some(b) = self.peek() {
            if b == b'\n' {
                break;
            }
            self.advance();
        }
    }

    fn next_token(&mut self) -> Option<Token> {
        self.skip_whitespace();
        let start = self.here();
        let b = self.peek()?;

        let kind = match b {
            b'<' => {
                self.advance();
                TokenKind::LAngle
            }
            b'>' => {
                self.advance();
                TokenKind::RAngle
            }
            b'[' => {
                self.advance();
                TokenKind::LBracket
            }
            b']' => {
                self.advance();
                TokenKind::RBracket
            }
            b'{' => {
                self.advance();
                TokenKind::LBrace
            }
            b'}' => {
                self.advance();
                TokenKind::RBrace
            }
            b'(' => {
                self.advance();
                TokenKind::LParen
            }
            b')' => {
                self.advance();
                TokenKind::RParen
            }
            b',' => {
                self.advance();
                TokenKind::Comma
            }
            b'=' => {
                self.advance();
                TokenKind::Assign
            }
            b'&' => {
                self.advance();
                TokenKind::Link
            }
            b'@' if self.peek_at(1) == Some(b'@') => {
                self.advance();
                self.advance();
                TokenKind::Chain
            }
            b':' => {
                self.advance();
                TokenKind::Colon
            }
            b'#' if self.peek_at(1) == Some(b'#') && self.source[self.pos..].starts_with("##--#") => {
                self.lex_docstring()
            }
            b'#' => {
                self.advance();
                let text_start = self.pos;
                self.skip_to_newline();
                TokenKind::Comment(self.source[text_start..self.pos].to_string())
            }
            b'"' => self.lex_string(start),
            b'-' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.lex_int(),
            b if b.is_ascii_digit() => self.lex_int(),
            b if b.is_ascii_alphabetic() || b == b'_' => self.lex_ident_or_keyword(),
            _ => {
                self.advance();
                TokenKind::Error(LexError::UnexpectedChar(start))
            }
        };

        let end = self.here();
        Some(Token { kind, span: Span { line: start.line, column: start.column, start: start.start, end: end.start } })
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn lex_docstring(&mut self) -> TokenKind {
        // Consume the opening `##--#`.
        for _ in 0..5 {
            self.advance();
        }
        let text_start = self.pos;
        loop {
            if self.source[self.pos..].starts_with("#--##") {
                let text = self.source[text_start..self.pos].to_string();
                for _ in 0..5 {
                    self.advance();
                }
                return TokenKind::Docstring(text);
            }
            if self.advance().is_none() {
                let span = Span::new(self.line, self.column, text_start, self.pos);
                return TokenKind::Error(LexError::UnterminatedLiteral(span));
            }
        }
    }

    fn lex_string(&mut self, start: Span) -> TokenKind {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                None => return TokenKind::Error(LexError::UnterminatedLiteral(start)),
                Some(b'"') => {
                    self.advance();
                    return TokenKind::String(value);
                }
                Some(b'\\') => {
                    self.advance();
                    match self.advance() {
                        Some(b'n') => value.push('\n'),
                        Some(b'"') => value.push('"'),
                        Some(b'\\') => value.push('\\'),
                        Some(other) => value.push(other as char),
                        None => return TokenKind::Error(LexError::UnterminatedLiteral(start)),
                    }
                }
                Some(_) => {
                    // Re-decode as UTF-8 scalar rather than raw byte so
                    // multi-byte characters survive intact.
                    let rest = &self.source[self.pos..];
                    let ch = rest.chars().next().unwrap_or('\u{FFFD}');
                    for _ in 0..ch.len_utf8() {
                        self.advance();
                    }
                    value.push(ch);
                }
            }
        }
    }

    fn lex_int(&mut self) -> TokenKind {
        let start_pos = self.pos;
        if self.peek() == Some(b'-') {
            self.advance();
        }
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.advance();
        }
        let text = &self.source[start_pos..self.pos];
        match text.parse::<i64>() {
            Ok(v) => TokenKind::Int(v),
            Err(_) => TokenKind::Error(LexError::UnexpectedChar(self.here())),
        }
    }

    fn lex_ident_or_keyword(&mut self) -> TokenKind {
        let start_pos = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_') {
            self.advance();
        }
        let text = self.source[start_pos..self.pos].to_string();
        if let Some(keyword) = Keyword::from_str(&text) {
            TokenKind::Keyword { keyword, spelling: text }
        } else {
            let case = IdentCase::classify(&text);
            TokenKind::Ident { text, case }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tokenizes_brackets_and_idents() {
        let tokens = kinds("<Track: [INIT = {param x = (val 1)}]>");
        assert!(matches!(tokens[0], TokenKind::LAngle));
        assert!(matches!(&tokens[1], TokenKind::Ident { text, .. } if text == "Track"));
        assert!(matches!(tokens[2], TokenKind::Colon));
    }

    #[test]
    fn classifies_keyword_aliases() {
        let a = kinds("Gather");
        let b = kinds("GET");
        assert!(matches!(&a[0], TokenKind::Keyword { keyword: Keyword::Gather, spelling } if spelling == "Gather"));
        assert!(matches!(&b[0], TokenKind::Keyword { keyword: Keyword::Gather, spelling } if spelling == "GET"));
    }

    #[test]
    fn unterminated_string_is_an_error_token_not_a_panic() {
        let tokens = kinds("\"unterminated");
        assert!(matches!(tokens[0], TokenKind::Error(LexError::UnterminatedLiteral(_))));
    }

    #[test]
    fn docstring_round_trips_interior_text() {
        let tokens = kinds("##--# hello\nworld #--##");
        match &tokens[0] {
            TokenKind::Docstring(text) => assert_eq!(text.trim(), "hello\nworld"),
            other => panic!("expected docstring, got {other:?}"),
        }
    }

    #[test]
    fn comment_runs_to_end_of_line() {
        let tokens = kinds("# a comment\n<");
        assert!(matches!(&tokens[0], TokenKind::Comment(text) if text == " a comment"));
        assert!(matches!(tokens[1], TokenKind::LAngle));
    }

    #[test]
    fn unknown_punctuation_is_an_error_token() {
        let tokens = kinds("^");
        assert!(matches!(tokens[0], TokenKind::Error(LexError::UnexpectedChar(_))));
    }
}
