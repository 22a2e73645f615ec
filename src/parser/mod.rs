//! CBHS recursive-descent parser.
//!
//! Mirrors the grammar of spec.md §4.4 directly, one function per
//! production:
//!
//! ```text
//! program        := { alpha_block }
//! alpha_block    := "<" ident_pascal [":"] { beta_block } ">" [ exec_clause ]
//! exec_clause    := "<" "EXEC" [ ":" modifier_chain ] ">"
//! modifier_chain := modifier { ( "&" | "@@" ) modifier }
//! modifier       := ident_camel [ ":" value ]
//! beta_block     := "[" ident_screaming "=" { gamma_block } "]"
//! gamma_block    := "{" "param" ident_camel [ ":" ident_camel ] "=" delta_block "}"
//! delta_block    := "(" "val" value { "," value } ")"
//! value          := literal | ident_snake [ ":" delta_block ]
//! ```
//!
//! The philosophy is "continuous code" (spec.md §4.4): every error except
//! [`ParseError::UnbalancedBrackets`] is recovered from in place so that
//! one malformed block never prevents the rest of the file from
//! compiling into patterns. Recovery is two strategies, applied at the
//! point of failure:
//!
//! - a missing close bracket is synthesized at the column the opener
//!   demands, and parsing continues as if it had been there;
//! - a token that cannot start the expected production is skipped,
//!   advancing to the next bracket opener at the current tier.

use crate::ast::{AlphaBlock, BetaBlock, DeltaBlock, ExecClause, GammaBlock, Modifier, NamingCase, Program, Span, Value};
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::error::ParseError;
use crate::lexer::{Keyword, Token, TokenKind, tokenize};

/// Parse `source` into a [`Program`], recording every recoverable error as
/// a diagnostic in `sink`. Returns `Err` only for the one unrecoverable
/// case: a bracket stream so broken no resynchronization point exists.
///
/// Bracket-column misalignment (tier 1/2) is always reported, but
/// `strict_alignment` controls the severity it's reported at:
/// [`crate::diagnostics::Severity::Error`] when `true`, the usual
/// [`crate::diagnostics::Severity::Warn`] otherwise (spec.md §6's
/// `strict_alignment` option).
pub fn parse(source: &str, strict_alignment: bool, sink: &mut DiagnosticSink) -> Result<Program, ParseError> {
    let tokens: Vec<Token> = tokenize(source)
        .into_iter()
        .filter(|t| !matches!(t.kind, TokenKind::Comment(_) | TokenKind::Docstring(_)))
        .collect();
    let mut parser = Parser { tokens, pos: 0, strict_alignment, sink };
    parser.parse_program()
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    strict_alignment: bool,
    sink: &'a mut DiagnosticSink,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn span_here(&self) -> Span {
        self.peek().map(|t| t.span).unwrap_or_else(|| {
            self.tokens.last().map(|t| Span::point(t.span.line, t.span.column, t.span.end)).unwrap_or_default()
        })
    }

    fn report(&mut self, kind: DiagnosticKind, message: impl Into<String>, span: Span) {
        let mut diagnostic = Diagnostic::new(kind, message).with_span(span);
        if self.strict_alignment && kind == DiagnosticKind::BracketUnaligned {
            diagnostic = diagnostic.with_severity(crate::diagnostics::Severity::Error);
        }
        self.sink.push(diagnostic);
    }

    /// Consume a token of an exact kind, or synthesize it and report
    /// [`ParseError::MissingClose`]-equivalent diagnostic, per tier.
    fn eat(&mut self, want: &TokenKind) -> Option<Span> {
        if self.peek_kind() == Some(want) {
            return self.bump().map(|t| t.span);
        }
        None
    }

    fn is_opener(kind: &TokenKind) -> bool {
        matches!(kind, TokenKind::LAngle | TokenKind::LBracket | TokenKind::LBrace | TokenKind::LParen)
    }

    /// Error recovery: advance until the next bracket opener (any tier) or
    /// end of input. Used when a token cannot start the expected
    /// production.
    fn skip_to_next_opener(&mut self) {
        while let Some(kind) = self.peek_kind() {
            if Self::is_opener(kind) {
                break;
            }
            self.bump();
        }
    }

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::default();
        let mut consecutive_stray = 0usize;
        while self.peek().is_some() {
            match self.peek_kind() {
                Some(TokenKind::LAngle) => {
                    consecutive_stray = 0;
                    match self.parse_alpha_block() {
                        Ok(block) => program.alpha_blocks.push(block),
                        Err(ParseError::UnbalancedBrackets(span)) => return Err(ParseError::UnbalancedBrackets(span)),
                        Err(_) => {}
                    }
                }
                Some(_) => {
                    let span = self.span_here();
                    self.report(DiagnosticKind::UnexpectedToken, "stray token at top level", span);
                    self.bump();
                    consecutive_stray += 1;
                    if consecutive_stray > self.tokens.len().max(1) {
                        return Err(ParseError::UnbalancedBrackets(span));
                    }
                }
                None => break,
            }
        }
        Ok(program)
    }

    fn parse_alpha_block(&mut self) -> Result<AlphaBlock, ParseError> {
        let open_tok = self.bump().expect("caller checked LAngle");
        let open_span = open_tok.span;
        let open_column = open_span.column;

        let (name, name_case_ok, name_span) = self.parse_ident_checked(NamingCase::Pascal)?;
        let _ = name_span;

        self.eat(&TokenKind::Colon);

        let mut beta_blocks = Vec::new();
        loop {
            match self.peek_kind() {
                Some(TokenKind::LBracket) => match self.parse_beta_block(open_column) {
                    Ok(block) => beta_blocks.push(block),
                    Err(ParseError::UnbalancedBrackets(span)) => return Err(ParseError::UnbalancedBrackets(span)),
                    Err(_) => {}
                },
                Some(TokenKind::RAngle) => break,
                Some(_) => {
                    let span = self.span_here();
                    self.report(DiagnosticKind::UnexpectedToken, "expected '[' or '>' in alpha block", span);
                    self.skip_to_next_opener();
                    if matches!(self.peek_kind(), Some(TokenKind::LBracket) | Some(TokenKind::RAngle)) {
                        continue;
                    }
                    return Err(ParseError::UnbalancedBrackets(span));
                }
                None => {
                    let span = self.span_here();
                    return Err(ParseError::UnbalancedBrackets(span));
                }
            }
        }

        let close_span = self.expect_tier_close(&TokenKind::RAngle, "'>'", open_span)?;
        if close_span.column != open_column {
            self.report(
                DiagnosticKind::BracketUnaligned,
                format!("'>' at column {} does not align with '<' at column {open_column}", close_span.column),
                close_span,
            );
        }

        let exec_clause = if matches!(self.peek_kind(), Some(TokenKind::LAngle)) {
            // Only treat as an exec clause if the next keyword is EXEC;
            // otherwise this is the start of the next alpha_block.
            if matches!(self.tokens.get(self.pos + 1).map(|t| &t.kind), Some(TokenKind::Keyword { keyword: Keyword::Exec, .. })) {
                Some(self.parse_exec_clause()?)
            } else {
                None
            }
        } else {
            None
        };

        let span = open_span.merge(close_span);
        Ok(AlphaBlock { name, name_case_ok, beta_blocks, exec_clause, span, open_column })
    }

    fn parse_exec_clause(&mut self) -> Result<ExecClause, ParseError> {
        let open_tok = self.bump().expect("caller checked LAngle");
        let open_span = open_tok.span;
        self.bump(); // EXEC keyword, already checked by caller

        let mut modifiers = Vec::new();
        if self.eat(&TokenKind::Colon).is_some() {
            modifiers = self.parse_modifier_chain();
        }

        let close_span = self.expect_tier_close(&TokenKind::RAngle, "'>'", open_span)?;
        if close_span.column != open_span.column {
            self.report(
                DiagnosticKind::BracketUnaligned,
                format!("EXEC '>' at column {} does not align with '<' at column {}", close_span.column, open_span.column),
                close_span,
            );
        }
        Ok(ExecClause { modifiers, span: open_span.merge(close_span) })
    }

    fn parse_modifier_chain(&mut self) -> Vec<Modifier> {
        let mut modifiers = Vec::new();
        loop {
            match self.parse_modifier() {
                Some(m) => modifiers.push(m),
                None => break,
            }
            match self.peek_kind() {
                Some(TokenKind::Link) | Some(TokenKind::Chain) => {
                    self.bump();
                }
                _ => break,
            }
        }
        modifiers
    }

    fn parse_modifier(&mut self) -> Option<Modifier> {
        let (name, span) = match self.peek_kind()?.clone() {
            TokenKind::Ident { text, .. } => {
                let span = self.bump().unwrap().span;
                (text, span)
            }
            TokenKind::Keyword { spelling, .. } => {
                let span = self.bump().unwrap().span;
                (spelling, span)
            }
            _ => return None,
        };
        let value = if self.eat(&TokenKind::Colon).is_some() { self.parse_value() } else { None };
        Some(Modifier { name, value, span })
    }

    fn parse_beta_block(&mut self, alpha_open_column: u32) -> Result<BetaBlock, ParseError> {
        let open_tok = self.bump().expect("caller checked LBracket");
        let open_span = open_tok.span;
        let open_column = open_span.column;

        if open_column <= alpha_open_column {
            self.report(
                DiagnosticKind::BracketUnaligned,
                format!("'[' at column {open_column} must be to the right of its enclosing '<' at column {alpha_open_column}"),
                open_span,
            );
        }

        let (name, name_case_ok, _) = self.parse_ident_checked(NamingCase::ScreamingSnake)?;

        self.expect_soft(&TokenKind::Assign, "'='");

        let mut gamma_blocks = Vec::new();
        loop {
            match self.peek_kind() {
                Some(TokenKind::LBrace) => match self.parse_gamma_block() {
                    Ok(block) => gamma_blocks.push(block),
                    Err(ParseError::UnbalancedBrackets(span)) => return Err(ParseError::UnbalancedBrackets(span)),
                    Err(_) => {}
                },
                Some(TokenKind::RBracket) => break,
                Some(_) => {
                    let span = self.span_here();
                    self.report(DiagnosticKind::UnexpectedToken, "expected '{' or ']' in beta block", span);
                    self.skip_to_next_opener();
                    if matches!(self.peek_kind(), Some(TokenKind::LBrace) | Some(TokenKind::RBracket)) {
                        continue;
                    }
                    return Err(ParseError::UnbalancedBrackets(span));
                }
                None => return Err(ParseError::UnbalancedBrackets(self.span_here())),
            }
        }

        let close_span = self.expect_tier_close(&TokenKind::RBracket, "']'", open_span)?;
        if close_span.column != open_column {
            self.report(
                DiagnosticKind::BracketUnaligned,
                format!("']' at column {} does not align with '[' at column {open_column}", close_span.column),
                close_span,
            );
        }

        Ok(BetaBlock { name, name_case_ok, gamma_blocks, span: open_span.merge(close_span), open_column })
    }

    fn parse_gamma_block(&mut self) -> Result<GammaBlock, ParseError> {
        let open_tok = self.bump().expect("caller checked LBrace");
        let open_span = open_tok.span;

        // Literal keyword "param".
        self.expect_soft_ident("param");

        let (key, key_case_ok, _) = self.parse_ident_checked(NamingCase::Camel)?;

        let qualifier = if self.eat(&TokenKind::Colon).is_some() {
            self.parse_ident_checked(NamingCase::Camel).ok().map(|(q, _, _)| q)
        } else {
            None
        };

        self.expect_soft(&TokenKind::Assign, "'='");

        let value = self.parse_delta_block()?;

        let close_span = self.expect_tier_close(&TokenKind::RBrace, "'}'", open_span)?;
        Ok(GammaBlock { key, key_case_ok, qualifier, value, span: open_span.merge(close_span) })
    }

    fn parse_delta_block(&mut self) -> Result<DeltaBlock, ParseError> {
        let open_span = match self.eat(&TokenKind::LParen) {
            Some(span) => span,
            None => {
                let span = self.span_here();
                self.report(DiagnosticKind::UnexpectedToken, "expected '(' to start delta block", span);
                return Ok(DeltaBlock { values: Vec::new(), span });
            }
        };

        self.expect_soft_ident("val");

        let mut values = Vec::new();
        if let Some(v) = self.parse_value() {
            values.push(v);
        }
        while self.eat(&TokenKind::Comma).is_some() {
            if let Some(v) = self.parse_value() {
                values.push(v);
            }
        }

        let close_span = self.expect_tier_close(&TokenKind::RParen, "')'", open_span)?;
        Ok(DeltaBlock { values, span: open_span.merge(close_span) })
    }

    fn parse_value(&mut self) -> Option<Value> {
        match self.peek_kind()?.clone() {
            TokenKind::String(s) => {
                self.bump();
                Some(Value::String(s))
            }
            TokenKind::Int(i) => {
                self.bump();
                Some(Value::Int(i))
            }
            TokenKind::Keyword { keyword: Keyword::True, .. } => {
                self.bump();
                Some(Value::Bool(true))
            }
            TokenKind::Keyword { keyword: Keyword::False, .. } => {
                self.bump();
                Some(Value::Bool(false))
            }
            TokenKind::Ident { text, .. } => {
                self.bump();
                let name_case_ok = NamingCase::Snake.matches(&text);
                let nested = if self.eat(&TokenKind::Colon).is_some() { self.parse_delta_block().ok().map(Box::new) } else { None };
                Some(Value::Ident { name: text, name_case_ok, nested })
            }
            _ => None,
        }
    }

    /// Parse an identifier token (or keyword spelled like one), checking
    /// it against `case`. Per spec.md §4.4, a case mismatch is reported
    /// but never blocks parsing.
    fn parse_ident_checked(&mut self, case: NamingCase) -> Result<(String, bool, Span), ParseError> {
        let (text, span) = match self.peek_kind().cloned() {
            Some(TokenKind::Ident { text, .. }) => {
                let span = self.bump().unwrap().span;
                (text, span)
            }
            Some(TokenKind::Keyword { spelling, .. }) => {
                let span = self.bump().unwrap().span;
                (spelling, span)
            }
            _ => {
                let span = self.span_here();
                self.report(DiagnosticKind::UnexpectedToken, "expected an identifier", span);
                return Ok((String::new(), false, span));
            }
        };
        let ok = case.matches(&text);
        if !ok {
            self.report(DiagnosticKind::NamingCase, format!("identifier {text:?} does not satisfy the expected naming case"), span);
        }
        Ok((text, ok, span))
    }

    fn expect_soft(&mut self, want: &TokenKind, label: &str) {
        if self.eat(want).is_none() {
            let span = self.span_here();
            self.report(DiagnosticKind::UnexpectedToken, format!("expected {label}"), span);
        }
    }

    fn expect_soft_ident(&mut self, literal: &str) {
        if let Some(TokenKind::Ident { text, .. }) = self.peek_kind() {
            if text == literal {
                self.bump();
                return;
            }
        }
        let span = self.span_here();
        self.report(DiagnosticKind::UnexpectedToken, format!("expected keyword {literal:?}"), span);
    }

    /// Consume a close bracket, or synthesize one at the column the
    /// opener demands and emit [`ParseError::MissingClose`] as a
    /// diagnostic (recoverable).
    fn expect_tier_close(&mut self, want: &TokenKind, label: &'static str, opener: Span) -> Result<Span, ParseError> {
        if let Some(span) = self.eat(want) {
            return Ok(span);
        }
        // Bracket truly missing from the stream: synthesize at the
        // opener's column and keep going.
        let span = Span::point(opener.line, opener.column, self.span_here().start);
        self.report(DiagnosticKind::MissingClose, format!("missing {label}, synthesized"), span);
        Ok(span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> (Program, DiagnosticSink) {
        let mut sink = DiagnosticSink::new();
        let program = parse(source, false, &mut sink).expect("should not be fatal");
        (program, sink)
    }

    #[test]
    fn parses_minimal_aligned_block() {
        let (program, sink) = parse_ok("<Track>");
        assert_eq!(program.alpha_blocks.len(), 1);
        assert!(sink.as_slice().iter().all(|d| d.kind != DiagnosticKind::BracketUnaligned));
    }

    #[test]
    fn flags_misaligned_close_bracket() {
        let source = "<Track\n >";
        let (_program, sink) = parse_ok(source);
        let diagnostic = sink.as_slice().iter().find(|d| d.kind == DiagnosticKind::BracketUnaligned).unwrap();
        assert_eq!(diagnostic.severity, crate::diagnostics::Severity::Warn);
    }

    #[test]
    fn strict_alignment_escalates_unaligned_bracket_to_error() {
        let source = "<Track\n >";
        let mut sink = DiagnosticSink::new();
        parse(source, true, &mut sink).expect("should not be fatal");
        let diagnostic = sink.as_slice().iter().find(|d| d.kind == DiagnosticKind::BracketUnaligned).unwrap();
        assert_eq!(diagnostic.severity, crate::diagnostics::Severity::Error);
    }

    #[test]
    fn well_aligned_program_has_no_alignment_diagnostics() {
        let source = "<Track\n [INIT =\n  {param tag = (val \"x\")}\n ]\n>";
        let (program, sink) = parse_ok(source);
        assert_eq!(program.alpha_blocks.len(), 1);
        assert!(sink.as_slice().iter().all(|d| d.kind != DiagnosticKind::BracketUnaligned));
    }

    #[test]
    fn parses_full_rule_and_compiles_values() {
        let source = r#"<Button
 [INIT =
  {param tag = (val "[", "]")}
  {param pluck = (val "button_text")}
 ]
>"#;
        let (program, _sink) = parse_ok(source);
        let alpha = &program.alpha_blocks[0];
        assert_eq!(alpha.name, "Button");
        assert_eq!(alpha.beta_blocks.len(), 1);
        assert_eq!(alpha.beta_blocks[0].gamma_blocks.len(), 2);
    }

    #[test]
    fn naming_case_violation_is_reported_but_not_fatal() {
        let (_program, sink) = parse_ok("<lower_case>");
        assert!(sink.as_slice().iter().any(|d| d.kind == DiagnosticKind::NamingCase));
    }
}
