//! Uniform-grid spatial index over component bounding boxes.
//!
//! Implements the strategy named in spec.md §4.1: a uniform cell grid
//! with a user-chosen cell size (default 4-8 cells on a side), where each
//! component registers into every index cell its bounding box overlaps.
//! A point or rectangle query then only has to visit the handful of
//! index cells the query touches, rather than every component —
//! `query_point`/`query_rect` run in time proportional to the number of
//! matching cells, not the total component count.

use std::collections::{HashMap, HashSet};

/// An axis-aligned, half-open bounding box `[x1, x2) x [y1, y2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BBox {
    /// Left edge (inclusive).
    pub x1: i64,
    /// Top edge (inclusive).
    pub y1: i64,
    /// Right edge (exclusive).
    pub x2: i64,
    /// Bottom edge (exclusive).
    pub y2: i64,
}

impl BBox {
    /// Construct a bbox from two corners, normalizing ordering.
    pub fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self { x1: x1.min(x2), y1: y1.min(y2), x2: x1.max(x2), y2: y1.max(y2) }
    }

    /// Width in cells.
    pub fn width(&self) -> i64 {
        (self.x2 - self.x1).max(0)
    }

    /// Height in cells.
    pub fn height(&self) -> i64 {
        (self.y2 - self.y1).max(0)
    }

    /// Area in cells.
    pub fn area(&self) -> i64 {
        self.width() * self.height()
    }

    /// Shrink every edge inward by `margin` cells (used by the hierarchy
    /// builder's containment check, spec.md §4.7). Can produce a
    /// degenerate (empty) box if the box is smaller than the margin.
    pub fn shrink(&self, margin: i64) -> BBox {
        BBox::new(self.x1 + margin, self.y1 + margin, self.x2 - margin, self.y2 - margin)
    }

    /// Does this box strictly contain `other` (every edge of `other`
    /// strictly inside this box)?
    pub fn strictly_contains(&self, other: &BBox) -> bool {
        self.x1 < other.x1 && self.y1 < other.y1 && self.x2 > other.x2 && self.y2 > other.y2
    }

    /// Does this box contain the point `(x, y)`?
    pub fn contains_point(&self, x: i64, y: i64) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }

    /// Does this box overlap `other` at all?
    pub fn overlaps(&self, other: &BBox) -> bool {
        self.x1 < other.x2 && other.x1 < self.x2 && self.y1 < other.y2 && other.y1 < self.y2
    }
}

type CellKey = (i64, i64);

/// A uniform-grid spatial index keyed by component id.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: i64,
    cells: HashMap<CellKey, Vec<u64>>,
    boxes: HashMap<u64, BBox>,
}

impl SpatialIndex {
    /// Build an index with the given cell size (clamped to at least 1).
    pub fn new(cell_size: i64) -> Self {
        Self { cell_size: cell_size.max(1), cells: HashMap::new(), boxes: HashMap::new() }
    }

    /// Register `id`'s bounding box, inserting it into every cell the box
    /// overlaps.
    pub fn insert(&mut self, id: u64, bbox: BBox) {
        self.remove(id);
        for key in self.cell_keys(&bbox) {
            self.cells.entry(key).or_default().push(id);
        }
        self.boxes.insert(id, bbox);
    }

    /// Remove `id` from the index, if present.
    pub fn remove(&mut self, id: u64) {
        if let Some(bbox) = self.boxes.remove(&id) {
            for key in self.cell_keys(&bbox) {
                if let Some(bucket) = self.cells.get_mut(&key) {
                    bucket.retain(|&existing| existing != id);
                }
            }
        }
    }

    /// All component ids whose bbox contains `(x, y)`.
    pub fn query_point(&self, x: i64, y: i64) -> HashSet<u64> {
        let key = self.cell_of(x, y);
        self.cells
            .get(&key)
            .into_iter()
            .flatten()
            .copied()
            .filter(|id| self.boxes.get(id).is_some_and(|b| b.contains_point(x, y)))
            .collect()
    }

    /// All component ids whose bbox overlaps the query rectangle.
    pub fn query_rect(&self, query: BBox) -> HashSet<u64> {
        let mut result = HashSet::new();
        for key in self.cell_keys(&query) {
            if let Some(bucket) = self.cells.get(&key) {
                for &id in bucket {
                    if self.boxes.get(&id).is_some_and(|b| b.overlaps(&query)) {
                        result.insert(id);
                    }
                }
            }
        }
        result
    }

    fn cell_of(&self, x: i64, y: i64) -> CellKey {
        (x.div_euclid(self.cell_size), y.div_euclid(self.cell_size))
    }

    fn cell_keys(&self, bbox: &BBox) -> Vec<CellKey> {
        if bbox.width() <= 0 || bbox.height() <= 0 {
            return vec![self.cell_of(bbox.x1, bbox.y1)];
        }
        let (cx1, cy1) = self.cell_of(bbox.x1, bbox.y1);
        let (cx2, cy2) = self.cell_of(bbox.x2 - 1, bbox.y2 - 1);
        let mut keys = Vec::with_capacity(((cx2 - cx1 + 1) * (cy2 - cy1 + 1)).max(1) as usize);
        for cy in cy1..=cy2 {
            for cx in cx1..=cx2 {
                keys.push((cx, cy));
            }
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_point_finds_overlapping_box() {
        let mut index = SpatialIndex::new(4);
        index.insert(1, BBox::new(0, 0, 10, 10));
        assert!(index.query_point(5, 5).contains(&1));
        assert!(!index.query_point(20, 20).contains(&1));
    }

    #[test]
    fn query_rect_is_limited_to_touched_cells() {
        let mut index = SpatialIndex::new(4);
        index.insert(1, BBox::new(0, 0, 2, 2));
        index.insert(2, BBox::new(100, 100, 102, 102));
        let hits = index.query_rect(BBox::new(0, 0, 3, 3));
        assert!(hits.contains(&1));
        assert!(!hits.contains(&2));
    }

    #[test]
    fn remove_clears_stale_entries() {
        let mut index = SpatialIndex::new(4);
        index.insert(1, BBox::new(0, 0, 2, 2));
        index.remove(1);
        assert!(index.query_point(0, 0).is_empty());
    }

    #[test]
    fn strictly_contains_requires_a_margin() {
        let outer = BBox::new(0, 0, 10, 10);
        let flush_inner = BBox::new(0, 0, 10, 10);
        let margined_inner = BBox::new(1, 1, 9, 9);
        assert!(!outer.strictly_contains(&flush_inner));
        assert!(outer.strictly_contains(&margined_inner));
    }
}
