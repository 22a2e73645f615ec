//! Crate-level entry point.
//!
//! Grounded on the teacher crate's `api.rs`: a small `Options`/`Context`-
//! shaped configuration surface plus `parse`/`parse_with` functions that
//! most callers should use instead of driving the engine by hand. Here
//! the equivalent pair is [`run`] (defaults) and [`run_with`] (explicit
//! pattern source + grid + options), wired through [`crate::pipeline`].

use std::sync::Arc;

use crate::diagnostics::{Diagnostic, Outcome};
use crate::generator::GeneratedArtifact;
use crate::grid::Grid;
use crate::model::Model;
use crate::pipeline::Orchestrator;

/// Options that affect a pipeline run (spec.md §6).
#[derive(Clone)]
pub struct Options {
    /// When set, any bracket-column misalignment is treated the same as
    /// every other run (spec.md's alignment rule is unconditional); this
    /// flag instead controls whether [`DiagnosticKind::BracketUnaligned`]
    /// is reported at [`crate::diagnostics::Severity::Error`] (strict) or
    /// its usual [`crate::diagnostics::Severity::Warn`] (lenient).
    ///
    /// [`DiagnosticKind::BracketUnaligned`]: crate::diagnostics::DiagnosticKind::BracketUnaligned
    pub strict_alignment: bool,
    /// Default confidence threshold for a pattern that does not set its
    /// own (spec.md §3: pattern thresholds are in `[0, 1]`).
    pub confidence_threshold_default: f64,
    /// Cell size for the spatial index (spec.md §4.1: "default 4-8 cells
    /// on a side").
    pub spatial_cell_size: i64,
    /// Whether [`crate::pipeline::incremental_apply`] is allowed to take
    /// its incremental path (spec.md §5). When `false`, every
    /// [`crate::pipeline::ChangeDelta`] — including `Cell`/`Region` — is
    /// treated as `Full`, forcing a clean from-scratch re-evaluation.
    /// `Orchestrator::run` ignores this field: a fresh `run`/`run_with`
    /// call has no previous output to incrementalize against in the
    /// first place.
    pub incremental: bool,
    /// Cooperative cancellation hook, consulted between candidates and
    /// between rules (spec.md §5). `None` means the run is never
    /// cancelled from the core's perspective.
    pub cancel_token: Option<Arc<dyn Fn() -> bool + Send + Sync>>,
    /// Name of a registered [`crate::generator::Generator`] back-end to
    /// invoke after the model is built, if any.
    pub generator: Option<String>,
}

impl Options {
    /// Has the caller's cancellation hook fired?
    pub fn should_cancel(&self) -> bool {
        self.cancel_token.as_ref().is_some_and(|f| f())
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            strict_alignment: false,
            confidence_threshold_default: 0.5,
            spatial_cell_size: 6,
            incremental: false,
            cancel_token: None,
            generator: None,
        }
    }
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("strict_alignment", &self.strict_alignment)
            .field("confidence_threshold_default", &self.confidence_threshold_default)
            .field("spatial_cell_size", &self.spatial_cell_size)
            .field("incremental", &self.incremental)
            .field("cancel_token", &self.cancel_token.as_ref().map(|_| "<fn>"))
            .field("generator", &self.generator)
            .finish()
    }
}

/// The full result of one pipeline run (spec.md §6).
#[derive(Debug, Clone)]
pub struct RunResult {
    pub model: Model,
    pub diagnostics: Vec<Diagnostic>,
    pub outcome: Outcome,
    pub artifact: Option<GeneratedArtifact>,
}

/// Run the pipeline with default [`Options`].
///
/// `pattern_source` is one or more `.hunt` files concatenated in
/// declaration order (spec.md §6).
pub fn run(pattern_source: &str, grid: &Grid) -> RunResult {
    run_with(pattern_source, grid, &Options::default())
}

/// Run the pipeline with explicit `options`.
pub fn run_with(pattern_source: &str, grid: &Grid, options: &Options) -> RunResult {
    let orchestrator = Orchestrator::new();
    orchestrator.run(pattern_source, grid, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_scenario_produces_one_component() {
        let grid = Grid::from_lines(["  [Submit]  "]);
        let source = r#"<Button
 [INIT =
  {param tag = (val "[", "]")}
  {param pluck:button_text = (val "\\[(.+?)\\]")}
 ]
>"#;
        let result = run(source, &grid);
        assert_eq!(result.outcome, Outcome::Ok);
        assert_eq!(result.model.len(), 1);
        let component = result.model.components().next().unwrap();
        assert_eq!(component.type_tag, "Button");
    }

    #[test]
    fn snare_over_boundaryless_grid_is_fatal_with_no_artifact() {
        let grid = Grid::from_lines(["just text, no boxes"]);
        let source = r#"<Track
 [INIT =
  {param snare:hasBoundary = (val "grid must contain a window")}
 ]
>"#;
        let options = Options { generator: Some("demo".to_string()), ..Options::default() };
        let result = run_with(source, &grid, &options);
        assert_eq!(result.outcome, Outcome::Fatal);
        assert!(result.artifact.is_none());
    }
}
