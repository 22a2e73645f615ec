//! Region extraction: turning a raw [`Grid`] into a bag of [`Candidate`]s.
//!
//! Two-phase flood fill (spec.md §4.2):
//!
//! ```text
//! Phase 1: classify every cell as boundary / interior
//! Phase 2: 4-connected flood fill from each unvisited interior cell,
//!          collecting the boundary cells the fill runs into
//! ```
//!
//! A region only becomes a [`Candidate`] if it has a non-empty boundary
//! and its bounding box is at least 2x2 — a single interior cell with no
//! enclosing boundary is just blank space, not a component.

use std::collections::{HashSet, VecDeque};

use crate::grid::spatial_index::BBox;
use crate::grid::{BorderFamily, Grid, classify_boundary};

/// A flood-filled region before pattern classification (spec.md §3).
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Identifier unique within one pipeline run.
    pub id: u64,
    /// Interior (non-boundary) cells belonging to this region.
    pub interior: HashSet<(i64, i64)>,
    /// Boundary cells enclosing this region.
    pub boundary: HashSet<(i64, i64)>,
    /// Axis-aligned bounding box over interior ∪ boundary.
    pub bbox: BBox,
    /// Interior content, as ordered rows (including interior spaces), to
    /// preserve layout for downstream `Pluck` rules.
    pub rows: Vec<String>,
    /// Coarse border-style label, derived from the majority boundary
    /// character family.
    pub border_style: Option<BorderFamily>,
    /// Set when the boundary had a single-cell gap that either was
    /// repaired in place or could not be repaired (spec.md §4.2).
    pub boundary_incomplete: bool,
}

impl Candidate {
    /// Joined interior text, used by `Tag`/`Pluck` rules that operate on
    /// the whole candidate body rather than row-by-row.
    pub fn joined_text(&self) -> String {
        self.rows.join("\n")
    }

    /// Recompute `rows` from `grid` over this candidate's existing bbox,
    /// leaving every other field untouched. Used by the pipeline's
    /// incremental-update path (spec.md §5): when only a cell inside an
    /// existing candidate's interior changed, there is no need to re-run
    /// flood fill — the candidate's shape is unaffected, only its text.
    pub fn refresh_rows(&self, grid: &Grid) -> Candidate {
        Candidate { rows: extract_rows(grid, &self.bbox, &self.interior), ..self.clone() }
    }

    /// True if `literal` appears in the candidate's boundary or interior
    /// (used by the `Tag` rule, spec.md §4.6). A single-character literal
    /// is matched against individual boundary cells (boundary cells are
    /// an unordered set, so multi-character substrings cannot be formed
    /// from them); any literal is also checked against the interior text
    /// as an ordinary substring search.
    pub fn contains_literal(&self, literal: &str, grid: &Grid) -> bool {
        if self.joined_text().contains(literal) {
            return true;
        }
        if let Some(ch) = single_char(literal) {
            return self.boundary.iter().any(|&(x, y)| grid.char_at(x, y) == ch);
        }
        false
    }
}

fn single_char(literal: &str) -> Option<char> {
    let mut chars = literal.chars();
    let first = chars.next()?;
    if chars.next().is_none() { Some(first) } else { None }
}

/// Extract all candidates from `grid`. Never fails: an empty grid simply
/// yields no candidates (spec.md §4.2).
pub fn extract(grid: &Grid) -> Vec<Candidate> {
    if grid.is_empty() {
        return Vec::new();
    }

    let width = grid.width() as i64;
    let height = grid.height() as i64;
    let mut visited = vec![vec![false; grid.width()]; grid.height()];
    let mut candidates = Vec::new();
    let mut next_id = 1u64;

    for y in 0..height {
        for x in 0..width {
            if visited[y as usize][x as usize] {
                continue;
            }
            if grid.is_boundary(x, y) {
                visited[y as usize][x as usize] = true;
                continue;
            }

            let (interior, boundary, escaped_x, escaped_y) = flood_fill(grid, &mut visited, x, y);
            if boundary.is_empty() {
                continue;
            }
            // A fill that ran off the grid's true edge on the x axis
            // without ever hitting a drawn boundary character there is
            // not enclosed — it is open space abutting the edge (e.g.
            // the margin before/after an inline `[Submit]` on a
            // single-row grid), not a component, regardless of its
            // boundary set being non-empty on the opposite side.
            if escaped_x {
                continue;
            }
            // The same applies on the y axis, except when the grid
            // itself is only one row tall: there, every region's fill
            // necessarily "escapes" above and below simply because no
            // row exists to enclose it there (spec.md §8 scenario 1), so
            // that escape alone cannot disqualify it.
            if escaped_y && height > 1 {
                continue;
            }

            let bbox = bounding_box(interior.iter().chain(boundary.iter()));
            // spec.md §4.2 requires width >= 2 and height >= 2 to reject
            // degenerate single-cell regions. A strictly single-row grid
            // (as in the canonical inline-button scenario, spec.md §8
            // scenario 1) can never produce a height-2 region at all, so
            // the height floor only applies once the grid itself is tall
            // enough to meet it.
            if bbox.width() < 2 || (bbox.height() < 2 && height >= 2) {
                continue;
            }

            let boundary_incomplete = has_unrepaired_gap(grid, &boundary, &bbox);
            let rows = extract_rows(grid, &bbox, &interior);
            let border_style = majority_family(grid, &boundary);

            candidates.push(Candidate {
                id: next_id,
                interior,
                boundary,
                bbox,
                rows,
                border_style,
                boundary_incomplete,
            });
            next_id += 1;
        }
    }

    resolve_overlaps(candidates)
}

/// 4-connected flood fill from `(start_x, start_y)`. Besides the interior
/// and boundary cell sets, reports whether the fill ever stepped past the
/// grid's true edge on the x or y axis — i.e. ran out of grid before
/// hitting a drawn boundary character — which `extract` uses to reject
/// regions that are not actually enclosed (spec.md §4.2).
fn flood_fill(grid: &Grid, visited: &mut [Vec<bool>], start_x: i64, start_y: i64) -> (HashSet<(i64, i64)>, HashSet<(i64, i64)>, bool, bool) {
    let mut interior = HashSet::new();
    let mut boundary = HashSet::new();
    let mut escaped_x = false;
    let mut escaped_y = false;
    let mut queue = VecDeque::new();
    queue.push_back((start_x, start_y));
    visited[start_y as usize][start_x as usize] = true;

    while let Some((x, y)) = queue.pop_front() {
        interior.insert((x, y));
        for (dx, dy) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
            let (nx, ny) = (x + dx, y + dy);
            let out_x = nx < 0 || nx >= grid.width() as i64;
            let out_y = ny < 0 || ny >= grid.height() as i64;
            if out_x || out_y {
                escaped_x |= out_x;
                escaped_y |= out_y;
                continue;
            }
            if grid.is_boundary(nx, ny) {
                boundary.insert((nx, ny));
                continue;
            }
            if !visited[ny as usize][nx as usize] {
                visited[ny as usize][nx as usize] = true;
                queue.push_back((nx, ny));
            }
        }
    }

    (interior, boundary, escaped_x, escaped_y)
}

fn bounding_box<'a>(cells: impl Iterator<Item = &'a (i64, i64)>) -> BBox {
    let mut x1 = i64::MAX;
    let mut y1 = i64::MAX;
    let mut x2 = i64::MIN;
    let mut y2 = i64::MIN;
    for &(x, y) in cells {
        x1 = x1.min(x);
        y1 = y1.min(y);
        x2 = x2.max(x + 1);
        y2 = y2.max(y + 1);
    }
    if x1 > x2 {
        BBox::new(0, 0, 0, 0)
    } else {
        BBox::new(x1, y1, x2, y2)
    }
}

/// A boundary is "incomplete" if the perimeter of its bounding box has a
/// gap. A gap of exactly one cell, whose two neighbors on the perimeter
/// are boundary cells of the same family, is repaired in place (treated
/// as if it were boundary for the purposes of this flag); any other gap
/// leaves `boundary_incomplete = true` (spec.md §4.2).
fn has_unrepaired_gap(grid: &Grid, boundary: &HashSet<(i64, i64)>, bbox: &BBox) -> bool {
    let perimeter = perimeter_cells(bbox);
    let mut gap_run = 0usize;
    let mut unrepaired = false;

    for (i, &(x, y)) in perimeter.iter().enumerate() {
        if boundary.contains(&(x, y)) {
            gap_run = 0;
            continue;
        }
        gap_run += 1;
        if gap_run > 1 {
            unrepaired = true;
            continue;
        }
        // Single-cell gap: check its two perimeter neighbors.
        let prev = perimeter[(i + perimeter.len() - 1) % perimeter.len()];
        let next = perimeter[(i + 1) % perimeter.len()];
        let prev_family = boundary.contains(&prev).then(|| classify_boundary(grid.char_at(prev.0, prev.1))).flatten();
        let next_family = boundary.contains(&next).then(|| classify_boundary(grid.char_at(next.0, next.1))).flatten();
        match (prev_family, next_family) {
            (Some(a), Some(b)) if a == b => {} // repaired
            _ => unrepaired = true,
        }
    }
    unrepaired
}

fn perimeter_cells(bbox: &BBox) -> Vec<(i64, i64)> {
    let mut cells = Vec::new();
    for x in bbox.x1..bbox.x2 {
        cells.push((x, bbox.y1));
    }
    for y in (bbox.y1 + 1)..bbox.y2 {
        cells.push((bbox.x2 - 1, y));
    }
    for x in (bbox.x1..bbox.x2 - 1).rev() {
        cells.push((x, bbox.y2 - 1));
    }
    for y in ((bbox.y1 + 1)..bbox.y2 - 1).rev() {
        cells.push((bbox.x1, y));
    }
    cells
}

/// Render `bbox` as text, one character per cell, but only for cells that
/// belong to this candidate's own `interior` set. Cells inside the bbox
/// rectangle that belong to a different, nested candidate (its own
/// interior, or the boundary chars enclosing it) are rendered as a space
/// instead of their raw grid character, so an enclosing candidate's rows
/// never leak a nested component's content into `Tag`/`Pluck` rule input
/// (spec.md §3: "the raw character content of its interior").
fn extract_rows(grid: &Grid, bbox: &BBox, interior: &HashSet<(i64, i64)>) -> Vec<String> {
    (bbox.y1..bbox.y2)
        .map(|y| (bbox.x1..bbox.x2).map(|x| if interior.contains(&(x, y)) { grid.char_at(x, y) } else { ' ' }).collect())
        .collect()
}

fn majority_family(grid: &Grid, boundary: &HashSet<(i64, i64)>) -> Option<BorderFamily> {
    use std::collections::HashMap;
    let mut counts: HashMap<BorderFamily, usize> = HashMap::new();
    for &(x, y) in boundary {
        if let Some(family) = classify_boundary(grid.char_at(x, y)) {
            *counts.entry(family).or_default() += 1;
        }
    }
    counts.into_iter().max_by_key(|&(_, count)| count).map(|(family, _)| family)
}

/// Tie-break overlapping candidates by area descending, then by smaller
/// top-left `y`, then smaller top-left `x` (spec.md §4.2). The flood fill
/// itself never produces truly overlapping regions (each cell belongs to
/// at most one fill), but nested enclosed regions can still produce
/// bounding boxes that overlap their enclosing candidate's interior; this
/// ordering is the deterministic iteration order the rest of the pipeline
/// relies on (spec.md §5), not a de-duplication step.
fn resolve_overlaps(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.bbox.area().cmp(&a.bbox.area()).then(a.bbox.y1.cmp(&b.bbox.y1)).then(a.bbox.x1.cmp(&b.bbox.x1))
    });
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_grid_yields_no_candidates() {
        let grid = Grid::empty();
        assert!(extract(&grid).is_empty());
    }

    #[test]
    fn single_button_is_one_candidate() {
        let grid = Grid::from_lines(["  [Submit]  "]);
        let candidates = extract(&grid);
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].joined_text().contains("Submit"));
    }

    #[test]
    fn nested_box_yields_two_candidates() {
        let grid = Grid::from_lines([
            "+----------------+",
            "|                |",
            "|      [OK]      |",
            "|                |",
            "+----------------+",
        ]);
        let candidates = extract(&grid);
        assert_eq!(candidates.len(), 2);
        // Larger area (the window) sorts first.
        assert!(candidates[0].bbox.area() > candidates[1].bbox.area());
    }

    #[test]
    fn degenerate_one_cell_region_is_not_emitted() {
        let grid = Grid::from_lines(["|", "|"]);
        assert!(extract(&grid).is_empty());
    }
}
