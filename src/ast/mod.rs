//! CBHS abstract syntax tree.
//!
//! The tree shape mirrors the grammar in spec.md §4.4 exactly:
//!
//! ```text
//! Program ──▶ AlphaBlock ──▶ BetaBlock ──▶ GammaBlock ──▶ DeltaBlock ──▶ Value
//!   <…>          <…>           […]           {…}            (…)
//! ```
//!
//! Every node carries its [`Span`] so diagnostics emitted downstream
//! (compiler, matching engine) can still point back at the original
//! source, the same way the teacher crate threads a `Range` through
//! `Node`/`ResolvedToken` for evidence and debugging.

use std::fmt;

/// A half-open span in HUNT source text, with line/column for
/// human-readable diagnostics and byte offsets for exact slicing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// 1-based line of the first character.
    pub line: u32,
    /// 1-based column of the first character.
    pub column: u32,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
}

impl Span {
    /// Construct a span covering `[start, end)` at `line`/`column`.
    pub fn new(line: u32, column: u32, start: usize, end: usize) -> Self {
        Self { line, column, start, end }
    }

    /// A zero-width span useful for synthesized nodes (e.g. a
    /// parser-repaired close bracket).
    pub fn point(line: u32, column: u32, at: usize) -> Self {
        Self { line, column, start: at, end: at }
    }

    /// Merge two spans into the smallest span covering both.
    pub fn merge(self, other: Span) -> Span {
        let (first, second) = if self.start <= other.start { (self, other) } else { (other, self) };
        Span { line: first.line, column: first.column, start: first.start, end: second.end.max(first.end) }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Naming-case convention enforced per CBHS tier (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamingCase {
    /// `PascalCase` — tier 1.
    Pascal,
    /// `SCREAMING_SNAKE_CASE` — tier 2.
    ScreamingSnake,
    /// `camelCase` — tier 3.
    Camel,
    /// `snake_case` — tier 4.
    Snake,
}

impl NamingCase {
    /// Check whether `ident` satisfies this naming convention.
    pub fn matches(self, ident: &str) -> bool {
        if ident.is_empty() {
            return false;
        }
        match self {
            NamingCase::Pascal => {
                ident.chars().next().is_some_and(|c| c.is_ascii_uppercase())
                    && ident.chars().all(|c| c.is_ascii_alphanumeric())
                    && !ident.contains('_')
            }
            NamingCase::ScreamingSnake => {
                ident.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
                    && ident.chars().any(|c| c.is_ascii_uppercase())
            }
            NamingCase::Camel => {
                ident.chars().next().is_some_and(|c| c.is_ascii_lowercase())
                    && ident.chars().all(|c| c.is_ascii_alphanumeric())
            }
            NamingCase::Snake => {
                ident.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
                    && ident.chars().next().is_some_and(|c| !c.is_ascii_digit())
            }
        }
    }
}

/// The whole compiled source: an ordered list of tier-1 blocks, in
/// declaration order (pattern registration order is a matching tie-break,
/// spec.md §5).
#[derive(Debug, Clone, Default)]
pub struct Program {
    /// Top-level `<Name: …>` blocks, in source order.
    pub alpha_blocks: Vec<AlphaBlock>,
}

/// Tier 1: `<` ident_pascal [":"] { beta_block } `>` [ exec_clause ].
#[derive(Debug, Clone)]
pub struct AlphaBlock {
    /// The pattern-kind identifier (`Track`, `Gather`, `Harvest`, `Cook`,
    /// `Validate`, …). PascalCase is enforced; violations are recorded,
    /// not rejected.
    pub name: String,
    /// Whether `name` satisfies PascalCase.
    pub name_case_ok: bool,
    /// The nested `[INIT = …]`-style blocks.
    pub beta_blocks: Vec<BetaBlock>,
    /// An optional trailing `<EXEC: …>` clause.
    pub exec_clause: Option<ExecClause>,
    /// Span of the whole block, open bracket to close bracket.
    pub span: Span,
    /// Column of the opening `<`, used for alignment checks against the
    /// closing `>` and against nested tier-2 openers.
    pub open_column: u32,
}

/// `<EXEC [":" modifier_chain] >`.
#[derive(Debug, Clone)]
pub struct ExecClause {
    /// Chained modifiers, e.g. `prohib & floop`.
    pub modifiers: Vec<Modifier>,
    /// Span of the clause.
    pub span: Span,
}

/// One modifier in a `modifier_chain`, joined by `&` or `@@`.
#[derive(Debug, Clone)]
pub struct Modifier {
    /// camelCase modifier name (or a bare keyword like `prohib`/`floop`).
    pub name: String,
    /// Optional attached value.
    pub value: Option<Value>,
    /// Span of the modifier.
    pub span: Span,
}

/// Tier 2: `[` ident_screaming "=" { gamma_block } `]`.
#[derive(Debug, Clone)]
pub struct BetaBlock {
    /// The SCREAMING_SNAKE_CASE section identifier (`INIT`, `GATHER`, …).
    pub name: String,
    /// Whether `name` satisfies SCREAMING_SNAKE_CASE.
    pub name_case_ok: bool,
    /// The rule parameter blocks contained in this section.
    pub gamma_blocks: Vec<GammaBlock>,
    /// Span of the whole block.
    pub span: Span,
    /// Column of the opening `[`.
    pub open_column: u32,
}

/// Tier 3: `{` "param" ident_camel [":" ident_camel] "=" delta_block `}`.
#[derive(Debug, Clone)]
pub struct GammaBlock {
    /// The rule parameter key (`tag`, `pluck`, `trap`, `snare`, `scent`,
    /// `boil`, `cook`, `from`, `format`, …).
    pub key: String,
    /// Whether `key` satisfies camelCase.
    pub key_case_ok: bool,
    /// Optional secondary camelCase qualifier (`ident_camel ":" ident_camel`).
    pub qualifier: Option<String>,
    /// The value payload.
    pub value: DeltaBlock,
    /// Span of the whole block.
    pub span: Span,
}

/// Tier 4: `(` "val" value { "," value } `)`.
#[derive(Debug, Clone)]
pub struct DeltaBlock {
    /// One or more comma-separated values.
    pub values: Vec<Value>,
    /// Span of the whole block.
    pub span: Span,
}

/// A leaf value: a literal, or a snake_case identifier optionally carrying
/// a nested `delta_block`.
#[derive(Debug, Clone)]
pub enum Value {
    /// A string literal (used for `Tag` literals, `Pluck`/`Tag` source
    /// text, and — by the generator's convention only — regex patterns).
    String(String),
    /// A regex literal: syntactically identical to a string literal, but
    /// the compiler has determined this value occupies a position where
    /// it is used as a pattern rather than literal text.
    Regex(String),
    /// An integer literal.
    Int(i64),
    /// A boolean literal (`true`/`false`).
    Bool(bool),
    /// A bare snake_case identifier, optionally with a nested delta block
    /// (`ident_snake [":" delta_block]`).
    Ident {
        /// The identifier text.
        name: String,
        /// Whether `name` satisfies snake_case.
        name_case_ok: bool,
        /// An optional nested delta block.
        nested: Option<Box<DeltaBlock>>,
    },
}

impl Value {
    /// Span-free convenience: render a value as a string for diagnostics
    /// or for rules that accept either a literal or an identifier.
    pub fn as_text(&self) -> String {
        match self {
            Value::String(s) | Value::Regex(s) => s.clone(),
            Value::Int(i) => i.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Ident { name, .. } => name.clone(),
        }
    }
}
