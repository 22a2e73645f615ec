//! Pattern-matching engine (spec.md §4.6).
//!
//! Split the way the teacher crate splits its own `engine/` module: a gate
//! pass that evaluates grid-level guards before any candidate exists to
//! attach them to (mirrors `engine/trigger.rs`'s coarse pre-filtering), a
//! per-candidate evaluation pass (mirrors `engine/parser.rs`'s saturation
//! loop, degenerated to one deterministic pass since HUNT rules need no
//! fixpoint), and resolution from the winning [`crate::pattern::Match`]
//! into a [`crate::model::Component`] (mirrors `engine/resolve.rs`).

use crate::api::Options;
use crate::candidate::Candidate;
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink, Severity};
use crate::grid::Grid;
use crate::model::Component;
use crate::pattern::predicate::PredicateInput;
use crate::pattern::{Pattern, PatternRegistry, PropertyValue};

/// Outcome of the gate pass: whether any `Snare` fired before a single
/// candidate was matched (spec.md §8 scenario 5).
pub struct GateResult {
    pub fatal: bool,
}

/// Evaluate every pattern's guard rules (`Trap`/`Snare`/`Scent`) with no
/// candidate attached, against the grid as a whole. This is what lets a
/// pattern author assert something like "the grid must contain a window"
/// and have it fire even when zero candidates were ever extracted.
pub fn gate(grid: &Grid, registry: &PatternRegistry, candidate_count: usize, sink: &mut DiagnosticSink) -> GateResult {
    let input = PredicateInput { grid, candidate: None, candidate_count };
    let mut fatal = false;
    for pattern in registry.patterns() {
        for rule in &pattern.rules {
            if !matches!(rule, crate::pattern::Rule::Trap { .. } | crate::pattern::Rule::Snare { .. } | crate::pattern::Rule::Scent { .. }) {
                continue;
            }
            let outcome = rule.evaluate(&input);
            if let Some(diagnostic) = outcome.diagnostic {
                sink.push(diagnostic);
            }
            fatal |= outcome.fatal;
        }
    }
    GateResult { fatal }
}

/// Match every candidate against every registered pattern and resolve the
/// winner into a [`Component`] (spec.md §4.6). Candidates are processed in
/// the order they were given — callers are expected to have already
/// applied the deterministic bbox-area-descending order (spec.md §5).
///
/// Returns the resulting components plus whether any `Snare` fired during
/// per-candidate evaluation.
pub fn match_all(
    grid: &Grid,
    registry: &PatternRegistry,
    candidates: &[Candidate],
    options: &Options,
    sink: &mut DiagnosticSink,
) -> (Vec<Component>, bool) {
    let mut components = Vec::with_capacity(candidates.len());
    let mut snare_fired = false;

    for candidate in candidates {
        if options.should_cancel() {
            sink.push(Diagnostic::new(DiagnosticKind::Cancelled, "run cancelled during matching").with_severity(Severity::Fatal));
            snare_fired = true;
            break;
        }
        let (component, fired) = match_one(grid, registry, candidate, options, sink);
        snare_fired |= fired;
        components.push(component);
    }

    (components, snare_fired)
}

pub(crate) fn match_one(
    grid: &Grid,
    registry: &PatternRegistry,
    candidate: &Candidate,
    options: &Options,
    sink: &mut DiagnosticSink,
) -> (Component, bool) {
    let input = PredicateInput { grid, candidate: Some(candidate), candidate_count: 1 };

    let mut best: Option<(&Pattern, crate::pattern::Match)> = None;
    let mut snare_fired = false;

    for pattern in registry.patterns() {
        let (m, diagnostics) = pattern.evaluate(&input);
        for diagnostic in diagnostics {
            snare_fired |= diagnostic.severity == Severity::Fatal;
            sink.push(diagnostic.with_component(candidate.id));
        }
        let threshold = pattern.threshold.unwrap_or(options.confidence_threshold_default);
        if m.confidence < threshold {
            continue;
        }
        best = Some(match best {
            None => (pattern, m),
            Some((best_pattern, best_match)) => {
                if is_better(pattern, &m, best_pattern, &best_match) {
                    (pattern, m)
                } else {
                    (best_pattern, best_match)
                }
            }
        });
    }

    if candidate.boundary_incomplete {
        sink.push(
            Diagnostic::new(DiagnosticKind::BoundaryIncomplete, "candidate boundary was incomplete").with_component(candidate.id),
        );
    }

    let component = match best {
        Some((pattern, m)) => {
            let mut properties: std::collections::HashMap<String, PropertyValue> =
                m.properties.into_iter().filter(|(k, _)| k != "__tag").collect();
            properties.entry("confidence".to_string()).or_insert(PropertyValue::String(format!("{:.3}", m.confidence)));
            Component {
                id: candidate.id,
                type_tag: pattern.type_tag(&m),
                properties,
                bbox: candidate.bbox,
                confidence: m.confidence,
                boundary_incomplete: candidate.boundary_incomplete,
            }
        }
        None => Component {
            id: candidate.id,
            type_tag: "unknown".to_string(),
            properties: std::collections::HashMap::new(),
            bbox: candidate.bbox,
            confidence: 0.0,
            boundary_incomplete: candidate.boundary_incomplete,
        },
    };

    (component, snare_fired)
}

/// Selection tie-break (spec.md §4.6): higher confidence wins; on a tie,
/// more rules wins; on a further tie, earlier registration order wins.
fn is_better(candidate: &Pattern, candidate_match: &crate::pattern::Match, current: &Pattern, current_match: &crate::pattern::Match) -> bool {
    if candidate_match.confidence != current_match.confidence {
        return candidate_match.confidence > current_match.confidence;
    }
    if candidate.rules.len() != current.rules.len() {
        return candidate.rules.len() > current.rules.len();
    }
    candidate.registration_order < current.registration_order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticSink;
    use crate::pattern::compiler::compile_program;
    use crate::{candidate, parser};

    fn registry_for(source: &str) -> PatternRegistry {
        let mut sink = DiagnosticSink::new();
        let program = parser::parse(source, false, &mut sink).unwrap();
        compile_program(&program, &mut sink)
    }

    #[test]
    fn button_scenario_matches_with_full_confidence() {
        let grid = Grid::from_lines(["  [Submit]  "]);
        let candidates = candidate::extract(&grid);
        let source = r#"<Button
 [INIT =
  {param tag = (val "[", "]")}
  {param pluck:button_text = (val "\\[(.+?)\\]")}
 ]
>"#;
        let registry = registry_for(source);
        let options = Options::default();
        let mut sink = DiagnosticSink::new();
        let (components, fatal) = match_all(&grid, &registry, &candidates, &options, &mut sink);

        assert!(!fatal);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].type_tag, "Button");
        assert_eq!(components[0].confidence, 1.0);
        assert!(matches!(
            components[0].properties.get("button_text"),
            Some(PropertyValue::String(s)) if s == "Submit"
        ));
    }

    #[test]
    fn unmatched_candidate_is_tagged_unknown() {
        let grid = Grid::from_lines(["  [Submit]  "]);
        let candidates = candidate::extract(&grid);
        let registry = PatternRegistry::new();
        let options = Options::default();
        let mut sink = DiagnosticSink::new();
        let (components, _) = match_all(&grid, &registry, &candidates, &options, &mut sink);
        assert_eq!(components[0].type_tag, "unknown");
        assert_eq!(components[0].confidence, 0.0);
    }

    #[test]
    fn snare_over_empty_grid_fires_during_gate() {
        let grid = Grid::from_lines(["no boundary at all"]);
        let source = r#"<Track
 [INIT =
  {param snare:hasBoundary = (val "grid must contain a window")}
 ]
>"#;
        let registry = registry_for(source);
        let mut sink = DiagnosticSink::new();
        let result = gate(&grid, &registry, 0, &mut sink);
        assert!(result.fatal);
        assert!(sink.as_slice().iter().any(|d| d.kind == DiagnosticKind::SnareTriggered));
    }
}
