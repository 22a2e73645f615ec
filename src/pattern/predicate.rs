//! Builtin structural predicates referenced by `trap`/`snare`/`scent`
//! rules.
//!
//! spec.md §9 leaves the source's predicate grammar unspecified; the
//! resolution recorded in `DESIGN.md` is: the predicate name is a plain
//! identifier (no expression language), looked up here by name. Unknown
//! names are treated as vacuously true rather than a compile error,
//! since there is no fixed vocabulary to validate a pattern author's
//! spelling against.

use crate::ast::Value;
use crate::candidate::Candidate;
use crate::grid::Grid;

/// Everything a predicate call can see. `candidate` is `None` during the
/// pipeline's pre-match gate pass (spec.md §8 scenario 5: a `Snare`
/// asserting something about the grid as a whole, evaluated before any
/// candidate exists to attach it to).
pub struct PredicateInput<'a> {
    pub grid: &'a Grid,
    pub candidate: Option<&'a Candidate>,
    pub candidate_count: usize,
}

/// Evaluate builtin predicate `name` with `args` against `input`.
pub fn evaluate(name: &str, args: &[Value], input: &PredicateInput<'_>) -> bool {
    match name {
        "hasBoundary" => grid_has_any_boundary(input.grid),
        "hasCandidates" => input.candidate_count > 0,
        "minWidth" => {
            let min = args.first().and_then(as_int).unwrap_or(0);
            input.candidate.map(|c| c.bbox.width() >= min).unwrap_or(true)
        }
        "minHeight" => {
            let min = args.first().and_then(as_int).unwrap_or(0);
            input.candidate.map(|c| c.bbox.height() >= min).unwrap_or(true)
        }
        "boundaryComplete" => input.candidate.map(|c| !c.boundary_incomplete).unwrap_or(true),
        "hasInteriorText" => input.candidate.map(|c| !c.joined_text().trim().is_empty()).unwrap_or(false),
        _ => true,
    }
}

fn grid_has_any_boundary(grid: &Grid) -> bool {
    for y in 0..grid.height() as i64 {
        for x in 0..grid.width() as i64 {
            if grid.is_boundary(x, y) {
                return true;
            }
        }
    }
    false
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate;

    #[test]
    fn has_boundary_detects_box_drawing_characters() {
        let grid = Grid::from_lines(["no boundary here"]);
        let input = PredicateInput { grid: &grid, candidate: None, candidate_count: 0 };
        assert!(!evaluate("hasBoundary", &[], &input));

        let grid = Grid::from_lines(["  [Submit]  "]);
        let input = PredicateInput { grid: &grid, candidate: None, candidate_count: 0 };
        assert!(evaluate("hasBoundary", &[], &input));
    }

    #[test]
    fn min_width_reads_first_int_arg() {
        let grid = Grid::from_lines(["  [Submit]  "]);
        let candidates = candidate::extract(&grid);
        let input = PredicateInput { grid: &grid, candidate: candidates.first(), candidate_count: candidates.len() };
        assert!(evaluate("minWidth", &[Value::Int(3)], &input));
        assert!(!evaluate("minWidth", &[Value::Int(1000)], &input));
    }

    #[test]
    fn unknown_predicate_defaults_to_true() {
        let grid = Grid::empty();
        let input = PredicateInput { grid: &grid, candidate: None, candidate_count: 0 };
        assert!(evaluate("somethingNotDefined", &[], &input));
    }
}
