//! Compiled pattern data model (spec.md §3, §4.5, §4.6).
//!
//! A [`Pattern`] is the compiled form of one `alpha_block`: an ordered
//! list of [`Rule`]s plus a confidence threshold. Rules are a tagged
//! variant with an `evaluate` method (spec.md §9 design notes) rather
//! than a trait-object hierarchy — the same choice the teacher crate
//! makes for its own `Pattern`/`Rule` kinds.

pub mod compiler;
pub mod predicate;
pub mod registry;

use std::collections::HashMap;

use regex::Regex;

pub use registry::PatternRegistry;

use self::predicate::PredicateInput;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Severity};

/// One of the five pattern-kind identifiers named in spec.md §3/§4.5.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternKind {
    Track,
    Gather,
    Harvest,
    Cook,
    Validate,
    /// Any other PascalCase head identifier; kept rather than rejected so
    /// vocabularies beyond the five named kinds still compile.
    Other(String),
}

impl PatternKind {
    /// Classify an `alpha_block`'s head identifier into a pattern kind.
    pub fn from_head(name: &str) -> Self {
        match name {
            "Track" => PatternKind::Track,
            "Gather" => PatternKind::Gather,
            "Harvest" => PatternKind::Harvest,
            "Cook" => PatternKind::Cook,
            "Validate" => PatternKind::Validate,
            other => PatternKind::Other(other.to_string()),
        }
    }
}

/// How a pattern's per-rule confidences combine into one aggregate
/// (spec.md §3: "product (or min, configurable per pattern)"), set via
/// an `<EXEC: confidenceMode: min>` modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfidenceMode {
    #[default]
    Product,
    Min,
}

/// Where a `Pluck` rule reads its source text from, set by a `from`
/// gamma_block attached to the preceding `pluck` rule (defaults to the
/// candidate's full joined interior text).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PluckSource {
    #[default]
    Joined,
    Boundary,
}

/// A property value attached to a [`Match`] or, once selected, to a
/// [`crate::model::Component`].
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Int(i64),
    Bool(bool),
    Map(HashMap<String, PropertyValue>),
}

/// A compiled regular expression plus the source text it was compiled
/// from (kept so a runtime failure can still name the offending pattern).
#[derive(Debug, Clone)]
pub struct CompiledRegex {
    pub source: String,
    pub regex: Regex,
}

/// A reference to a builtin structural predicate, with positional
/// argument values.
///
/// spec.md §9 notes the source's predicate grammar is unspecified;
/// `DESIGN.md` records the resolution used here: a `trap`/`snare`/`scent`
/// gamma_block's camelCase qualifier names the predicate (see
/// [`predicate`]), its `delta_block`'s first string value is the
/// diagnostic message, and any remaining values are the predicate's
/// positional arguments.
#[derive(Debug, Clone)]
pub struct Predicate {
    pub name: String,
    pub args: Vec<crate::ast::Value>,
}

/// One atomic rule inside a [`Pattern`] (spec.md §3).
#[derive(Debug, Clone)]
pub enum Rule {
    /// Classify if any `literals` entry appears in the candidate (spec.md
    /// §4.6); `name` becomes the component's type tag when this rule
    /// contributes to a match.
    Tag { name: String, literals: Vec<String> },
    /// Extract the first matching regex's capture (or whole match) into
    /// property `target`.
    Pluck { target: String, regex_patterns: Vec<CompiledRegex>, source: PluckSource },
    /// Assert a structural precondition; failure is non-fatal.
    Trap { predicate: Predicate, message: String },
    /// Assert a structural precondition; failure is pipeline-fatal.
    Snare { predicate: Predicate, message: String },
    /// Advisory-only assertion; never changes confidence.
    Scent { predicate: Predicate, message: String },
    /// Simplify previously extracted data. Not interpreted by the core;
    /// carried through to the generator as an opaque annotation.
    Boil { reduction: String },
    /// Emit a code-generation directive. Not interpreted by the core.
    Cook { target_spec: String, format: Option<String> },
}

impl Rule {
    /// Evaluate this rule. `input.candidate` is `None` only during the
    /// pipeline's pre-match "gate" pass (see [`crate::engine`]), in which
    /// only `Trap`/`Snare`/`Scent` produce a meaningful result — `Tag`
    /// and `Pluck` have nothing to read and report a neutral match.
    pub fn evaluate(&self, input: &PredicateInput<'_>) -> Match {
        match self {
            Rule::Tag { name, literals } => evaluate_tag(name, literals, input),
            Rule::Pluck { target, regex_patterns, source } => evaluate_pluck(target, regex_patterns, *source, input),
            Rule::Trap { predicate, message } => evaluate_guard(predicate, message, input, false),
            Rule::Snare { predicate, message } => evaluate_guard(predicate, message, input, true),
            Rule::Scent { predicate, message } => evaluate_scent(predicate, message, input),
            Rule::Boil { .. } | Rule::Cook { .. } => Match::neutral(),
        }
    }
}

fn evaluate_tag(name: &str, literals: &[String], input: &PredicateInput<'_>) -> Match {
    let Some(candidate) = input.candidate else { return Match::neutral() };
    if literals.is_empty() {
        return Match::neutral();
    }
    let found = literals.iter().filter(|literal| candidate.contains_literal(literal, input.grid)).count();
    let confidence = found as f64 / literals.len() as f64;
    let mut properties = HashMap::new();
    if confidence > 0.0 {
        properties.insert("__tag".to_string(), PropertyValue::String(name.to_string()));
    }
    Match { matched: confidence > 0.0, confidence, properties, diagnostic: None, fatal: false }
}

fn evaluate_pluck(target: &str, regexes: &[CompiledRegex], source: PluckSource, input: &PredicateInput<'_>) -> Match {
    let Some(candidate) = input.candidate else { return Match::neutral() };
    let text = match source {
        PluckSource::Joined => candidate.joined_text(),
        PluckSource::Boundary => {
            candidate.boundary.iter().map(|&(x, y)| input.grid.char_at(x, y)).collect()
        }
    };
    for compiled in regexes {
        if let Some(captures) = compiled.regex.captures(&text) {
            let value = captures
                .get(1)
                .or_else(|| captures.get(0))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            let mut properties = HashMap::new();
            properties.insert(target.to_string(), PropertyValue::String(value));
            return Match { matched: true, confidence: 1.0, properties, diagnostic: None, fatal: false };
        }
    }
    Match { matched: false, confidence: 0.5, properties: HashMap::new(), diagnostic: None, fatal: false }
}

fn evaluate_guard(predicate: &Predicate, message: &str, input: &PredicateInput<'_>, is_snare: bool) -> Match {
    if predicate::evaluate(&predicate.name, &predicate.args, input) {
        return Match::neutral();
    }
    let kind = if is_snare { DiagnosticKind::SnareTriggered } else { DiagnosticKind::TrapFailed };
    let severity = if is_snare { Severity::Fatal } else { Severity::Warn };
    let diagnostic = Diagnostic::new(kind, message.to_string()).with_severity(severity);
    let confidence = if is_snare { 0.0 } else { 0.5 };
    Match { matched: false, confidence, properties: HashMap::new(), diagnostic: Some(diagnostic), fatal: is_snare }
}

fn evaluate_scent(predicate: &Predicate, message: &str, input: &PredicateInput<'_>) -> Match {
    let mut result = Match::neutral();
    if !predicate::evaluate(&predicate.name, &predicate.args, input) {
        result.diagnostic = Some(Diagnostic::new(DiagnosticKind::Scent, message.to_string()));
    }
    result
}

/// The result of applying one rule (or, aggregated, one whole pattern) to
/// one candidate (spec.md §3).
#[derive(Debug, Clone)]
pub struct Match {
    pub matched: bool,
    pub confidence: f64,
    pub properties: HashMap<String, PropertyValue>,
    pub diagnostic: Option<Diagnostic>,
    pub fatal: bool,
}

impl Match {
    /// Multiplicative identity: a rule kind (`Scent`, `Boil`, `Cook`, or
    /// any rule with nothing to evaluate against) that does not affect
    /// the pattern's aggregate confidence.
    pub fn neutral() -> Self {
        Self { matched: true, confidence: 1.0, properties: HashMap::new(), diagnostic: None, fatal: false }
    }

    /// No match at all.
    pub fn none() -> Self {
        Self { matched: false, confidence: 0.0, properties: HashMap::new(), diagnostic: None, fatal: false }
    }
}

/// A named, compiled pattern: a kind, an ordered rule list, and a
/// confidence threshold (spec.md §3).
#[derive(Debug, Clone)]
pub struct Pattern {
    /// Fully-qualified registry name (the `alpha_block`'s head identifier).
    pub name: String,
    pub kind: PatternKind,
    pub rules: Vec<Rule>,
    /// Overrides [`crate::api::Options::confidence_threshold_default`]
    /// when set. The grammar has no float literal, so this is currently
    /// always `None`; kept as a field so a future literal addition does
    /// not require a type change (see `DESIGN.md`).
    pub threshold: Option<f64>,
    pub confidence_mode: ConfidenceMode,
    /// Position among all patterns compiled in this run, in source order;
    /// used as the final matching tie-break (spec.md §4.6).
    pub registration_order: usize,
}

impl Pattern {
    /// Evaluate every rule against `input`, in declaration order with
    /// `Trap`/`Snare` moved first for early exit (spec.md §4.6), and
    /// combine their confidences via `confidence_mode`.
    pub fn evaluate(&self, input: &PredicateInput<'_>) -> (Match, Vec<Diagnostic>) {
        let (guards, rest): (Vec<&Rule>, Vec<&Rule>) =
            self.rules.iter().partition(|rule| matches!(rule, Rule::Trap { .. } | Rule::Snare { .. }));

        let mut confidence = 1.0f64;
        let mut matched = true;
        let mut properties = HashMap::new();
        let mut diagnostics = Vec::new();
        let mut fatal = false;

        for rule in guards.into_iter().chain(rest) {
            let outcome = rule.evaluate(input);
            if let Some(diagnostic) = outcome.diagnostic {
                diagnostics.push(diagnostic);
            }
            fatal |= outcome.fatal;
            matched &= outcome.matched;
            properties.extend(outcome.properties);
            confidence = match self.confidence_mode {
                ConfidenceMode::Product => confidence * outcome.confidence,
                ConfidenceMode::Min => confidence.min(outcome.confidence),
            };
            if confidence == 0.0 {
                break;
            }
        }

        (Match { matched, confidence, properties, diagnostic: None, fatal }, diagnostics)
    }

    /// The type tag this pattern assigns on a successful match: the name
    /// carried by its first matched `Tag` rule if any, else the pattern's
    /// own registry name.
    pub fn type_tag(&self, m: &Match) -> String {
        match m.properties.get("__tag") {
            Some(PropertyValue::String(name)) => name.clone(),
            _ => self.name.clone(),
        }
    }
}
