//! Crate-wide error taxonomy.
//!
//! HUNT's error handling follows a narrowest-scope-first policy: a `Lex`
//! error is scoped to a token, a `Compile` error is scoped to a single
//! pattern, a `Model` error is scoped to an edge. None of these abort a run
//! on their own — they are recorded as [`crate::diagnostics::Diagnostic`]s
//! and bubbled up only by explicit promotion. [`HuntError`] exists for the
//! handful of places that truly cannot proceed at all (a stage with no
//! registered recovery handler, a user-declared `Snare` firing).
//!
//! Each per-kind enum below mirrors one row of the error taxonomy in
//! spec.md §7. They are plain [`thiserror`] enums in the style used
//! throughout the example pack (see `DESIGN.md`), not a single flat enum,
//! so that a caller handling (say) parse errors never has to match on
//! generator-back-end variants.

use thiserror::Error;

use crate::ast::Span;

/// Crate-wide result alias.
pub type Result<T, E = HuntError> = std::result::Result<T, E>;

/// Top-level error for operations that cannot recover at a narrower scope.
#[derive(Debug, Error)]
pub enum HuntError {
    /// A parse failure that was not recoverable by tier resynchronization
    /// (only [`ParseError::UnbalancedBrackets`] is fatal; everything else
    /// is recorded as a diagnostic instead of reaching this variant).
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A pipeline stage failed with no registered recovery handler.
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// A generator back-end failed.
    #[error("generator error: {0}")]
    Generator(#[from] GeneratorError),
}

/// Lexical errors. Always recoverable by skipping to the next newline; the
/// lexer itself never stops early, but callers that want a hard failure on
/// malformed input can check the returned diagnostics for these kinds.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    /// A string or docstring literal was never closed before end of input.
    #[error("unterminated literal starting at {0:?}")]
    UnterminatedLiteral(Span),

    /// A character did not begin any recognized token.
    #[error("unexpected character at {0:?}")]
    UnexpectedChar(Span),
}

/// Structural/grammar errors raised while parsing CBHS source.
///
/// All variants except [`ParseError::UnbalancedBrackets`] are recoverable:
/// the parser resynchronizes and keeps producing an AST ("continuous
/// code", spec.md §4.4).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A tier-1 or tier-2 close bracket's column did not match its open
    /// bracket's column, or a nested open bracket was not strictly to the
    /// right of its enclosing open bracket.
    #[error("bracket at {span:?} is not vertically aligned with its opener at {opener:?}")]
    UnalignedBracket {
        /// Span of the misaligned bracket.
        span: Span,
        /// Span of the bracket it should align with.
        opener: Span,
    },

    /// An identifier's case did not match the naming convention required
    /// by its tier (PascalCase / SCREAMING_SNAKE_CASE / camelCase /
    /// snake_case).
    #[error("identifier {ident:?} at {span:?} does not satisfy the naming case required by its tier")]
    WrongNamingCase {
        /// The offending identifier text.
        ident: String,
        /// Span of the identifier.
        span: Span,
    },

    /// A token appeared where the grammar did not expect one; the parser
    /// skipped forward to the next bracket opener at the current tier.
    #[error("unexpected token at {0:?}")]
    UnexpectedToken(Span),

    /// A close bracket was missing; the parser synthesized one at the
    /// expected column.
    #[error("missing {expected_kind} close bracket, synthesized at {span:?}")]
    MissingClose {
        /// Human-readable name of the bracket kind that was expected.
        expected_kind: &'static str,
        /// Span at which the synthetic close was inserted.
        span: Span,
    },

    /// The bracket stream was structurally impossible to recover from
    /// (e.g. a close bracket with no matching opener anywhere in scope).
    /// This is the only fatal parse error.
    #[error("unbalanced brackets at {0:?}")]
    UnbalancedBrackets(Span),
}

/// Errors raised while lowering an AST into compiled [`crate::pattern::Pattern`]s.
/// Scoped to the offending pattern; the registry continues compiling the rest.
#[derive(Debug, Error, Clone)]
pub enum CompileError {
    /// A regex literal inside a `delta_block` failed to compile.
    #[error("pattern {pattern:?} has an invalid regex at {span:?}: {source}")]
    BadRegex {
        /// Name of the pattern being compiled.
        pattern: String,
        /// Span of the offending regex literal.
        span: Span,
        /// Underlying regex compiler error, rendered to a string since
        /// `regex::Error` is not `Clone`.
        source: String,
    },

    /// Two patterns were registered under the same qualified name without
    /// the replacing pattern declaring the `prohib` modifier.
    #[error("pattern name {0:?} is already registered")]
    Duplicate(String),
}

/// Errors raised while evaluating a rule against a candidate. Scoped to the
/// `(candidate, pattern)` pair that produced them.
#[derive(Debug, Error, Clone)]
pub enum MatchError {
    /// A `Pluck` or `Tag` regex failed at evaluation time (distinct from a
    /// [`CompileError::BadRegex`], which is a compile-time failure).
    #[error("regex evaluation failed for pattern {pattern:?}: {message}")]
    RegexRuntime {
        /// Name of the pattern whose rule failed.
        pattern: String,
        /// Description of the failure.
        message: String,
    },
}

/// Invariant violations discovered after the [`crate::model::Model`] is
/// built. The offending edges are dropped and a warning is recorded; the
/// model as a whole is still returned.
#[derive(Debug, Error, Clone)]
pub enum ModelError {
    /// A cycle was found in the `contains` subgraph (should be impossible
    /// given the strict-inside containment rule, but is checked).
    #[error("containment cycle among components: {0:?}")]
    Cycle(Vec<u64>),

    /// A relationship referenced a component id that does not exist in
    /// the model.
    #[error("relationship endpoint {0} is not a live component")]
    DanglingEndpoint(u64),
}

/// Stage-level and run-level pipeline errors.
#[derive(Debug, Error, Clone)]
pub enum PipelineError {
    /// A stage returned an error with no registered recovery handler.
    #[error("stage {stage:?} failed with no recovery handler: {message}")]
    Unhandled {
        /// Name of the failing stage.
        stage: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// A user-declared `Snare` rule's predicate failed; this is fatal to
    /// the run and aborts at the next stage boundary.
    #[error("snare triggered: {0}")]
    SnareTriggered(String),

    /// The run observed a cancellation request between candidates or
    /// between rules.
    #[error("run cancelled")]
    Cancelled,
}

/// Errors returned by a [`crate::generator::Generator`] back-end.
#[derive(Debug, Error, Clone)]
pub enum GeneratorError {
    /// The requested back-end name was not registered.
    #[error("no generator registered under name {0:?}")]
    UnknownBackend(String),

    /// The back-end failed to produce an artifact.
    #[error("generator {backend:?} failed: {message}")]
    BackendFailed {
        /// Name of the failing back-end.
        backend: String,
        /// Description of the failure.
        message: String,
    },
}
