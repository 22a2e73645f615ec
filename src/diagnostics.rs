//! Diagnostics and run outcomes.
//!
//! Every stage of the pipeline (lexer through generator) reports problems
//! as [`Diagnostic`] values rather than failing outright — spec.md §7 is
//! explicit that "the diagnostics list always reflects every issue
//! encountered (including recovered ones)". The crate-wide errors in
//! [`crate::error`] are reserved for the small set of situations that
//! cannot be represented as a recorded-and-continue diagnostic.
//!
//! `kind` is the stable, test-facing contract (spec.md §6): string codes
//! like `E_BRACKET_UNALIGNED` are what scenario tests and host
//! applications match against, not the `Display` message.

use crate::ast::Span;

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Purely informational; does not affect [`Outcome`].
    Info,
    /// Something unexpected happened but recognition proceeded normally.
    Warn,
    /// Recognition proceeded but the result should be treated as
    /// degraded (e.g. a rule's regex failed at runtime).
    Error,
    /// The run could not continue past this point.
    Fatal,
}

/// Stable kind code for a diagnostic. New variants are additive; never
/// rename an existing one, since hosts and tests match on these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DiagnosticKind {
    /// `E_BRACKET_UNALIGNED` — tier-1/tier-2 bracket column mismatch.
    BracketUnaligned,
    /// `W_NAMING_CASE` — identifier case does not match its tier.
    NamingCase,
    /// `E_UNEXPECTED_TOKEN` — stray token, parser resynchronized.
    UnexpectedToken,
    /// `E_MISSING_CLOSE` — close bracket synthesized.
    MissingClose,
    /// `F_UNBALANCED_BRACKETS` — fatal, file could not be parsed at all.
    UnbalancedBrackets,
    /// `E_BAD_REGEX` — a regex literal in a pattern failed to compile.
    BadRegex,
    /// `E_PATTERN_DUPLICATE` — duplicate pattern registration.
    PatternDuplicate,
    /// `E_MATCH_REGEX_RUNTIME` — a regex failed during evaluation.
    MatchRegexRuntime,
    /// `W_BOUNDARY_INCOMPLETE` — extractor repaired or flagged a gap in a
    /// candidate's boundary.
    BoundaryIncomplete,
    /// `W_MODEL_CYCLE` — a containment cycle was detected and broken.
    ModelCycle,
    /// `E_MODEL_DANGLING_EDGE` — relationship endpoint missing.
    ModelDanglingEdge,
    /// `F_SNARE_TRIGGERED` — a `Snare` rule's predicate failed.
    SnareTriggered,
    /// `W_TRAP_FAILED` — a `Trap` rule's predicate failed (soft).
    TrapFailed,
    /// `I_SCENT` — a `Scent` rule's advisory fired.
    Scent,
    /// `E_STAGE_UNHANDLED` — a pipeline stage failed with no handler.
    StageUnhandled,
    /// `F_CANCELLED` — the run observed a cancellation request.
    Cancelled,
    /// `W_KEYWORD_ALIAS` — `Gather`/`GET` spelling divergence noted.
    KeywordAlias,
}

impl DiagnosticKind {
    /// The stable string code, as printed in CLI reports and matched on by
    /// scenario tests (spec.md §6).
    pub fn code(self) -> &'static str {
        use DiagnosticKind::*;
        match self {
            BracketUnaligned => "E_BRACKET_UNALIGNED",
            NamingCase => "W_NAMING_CASE",
            UnexpectedToken => "E_UNEXPECTED_TOKEN",
            MissingClose => "E_MISSING_CLOSE",
            UnbalancedBrackets => "F_UNBALANCED_BRACKETS",
            BadRegex => "E_BAD_REGEX",
            PatternDuplicate => "E_PATTERN_DUPLICATE",
            MatchRegexRuntime => "E_MATCH_REGEX_RUNTIME",
            BoundaryIncomplete => "W_BOUNDARY_INCOMPLETE",
            ModelCycle => "W_MODEL_CYCLE",
            ModelDanglingEdge => "E_MODEL_DANGLING_EDGE",
            SnareTriggered => "F_SNARE_TRIGGERED",
            TrapFailed => "W_TRAP_FAILED",
            Scent => "I_SCENT",
            StageUnhandled => "E_STAGE_UNHANDLED",
            Cancelled => "F_CANCELLED",
            KeywordAlias => "W_KEYWORD_ALIAS",
        }
    }

    /// The severity a diagnostic of this kind is normally reported at.
    /// Call sites may still downgrade/upgrade (e.g. a `Trap` always
    /// reports at [`Severity::Warn`] regardless of this default).
    pub fn default_severity(self) -> Severity {
        use DiagnosticKind::*;
        match self {
            UnbalancedBrackets | SnareTriggered | Cancelled => Severity::Fatal,
            BadRegex | UnexpectedToken | MissingClose | PatternDuplicate | MatchRegexRuntime
            | ModelDanglingEdge | StageUnhandled => Severity::Error,
            NamingCase | BoundaryIncomplete | ModelCycle | TrapFailed | KeywordAlias => Severity::Warn,
            Scent => Severity::Info,
        }
    }
}

/// A single diagnostic emitted anywhere in the pipeline.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Stable kind code.
    pub kind: DiagnosticKind,
    /// Severity at which this particular instance is reported.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Source span, when the diagnostic originates from lexing/parsing/
    /// compiling HUNT source.
    pub span: Option<Span>,
    /// Component id, when the diagnostic concerns a specific component.
    pub component_id: Option<u64>,
}

impl Diagnostic {
    /// Build a diagnostic at its kind's default severity.
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self { kind, severity: kind.default_severity(), message: message.into(), span: None, component_id: None }
    }

    /// Attach a source span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Attach a component id.
    pub fn with_component(mut self, id: u64) -> Self {
        self.component_id = Some(id);
        self
    }

    /// Override the default severity (e.g. a `Trap` failure is always
    /// `Warn`, never escalated by context).
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

/// Overall outcome of a pipeline run (spec.md §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No diagnostic of severity `Error` or `Fatal` was recorded.
    Ok,
    /// Useful output was produced, but diagnostics contain `Error` entries.
    Degraded,
    /// The run aborted; no generated-code artifact is available.
    Fatal,
}

impl Outcome {
    /// Derive the outcome from a diagnostics list.
    pub fn from_diagnostics(diagnostics: &[Diagnostic]) -> Self {
        if diagnostics.iter().any(|d| d.severity == Severity::Fatal) {
            Outcome::Fatal
        } else if diagnostics.iter().any(|d| d.severity == Severity::Error) {
            Outcome::Degraded
        } else {
            Outcome::Ok
        }
    }
}

/// Collects diagnostics during a run. A thin wrapper rather than a bare
/// `Vec` so call sites read as intent ("record this") instead of vector
/// plumbing, mirroring how the teacher threads a single `RunMetrics`
/// accumulator through a run.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity >= Severity::Warn {
            tracing::warn!(kind = diagnostic.kind.code(), message = %diagnostic.message, "diagnostic");
        } else {
            tracing::info!(kind = diagnostic.kind.code(), message = %diagnostic.message, "diagnostic");
        }
        self.diagnostics.push(diagnostic);
    }

    /// True if any diagnostic is at [`Severity::Fatal`].
    pub fn has_fatal(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Fatal)
    }

    /// Consume the sink, returning the collected diagnostics.
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Borrow the collected diagnostics so far.
    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}
