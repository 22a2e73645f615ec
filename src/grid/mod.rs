//! The ASCII grid and its boundary-character classification.
//!
//! A [`Grid`] is a rectangular, immutable buffer of Unicode scalar values
//! (spec.md §3). It never fails on out-of-bounds access — [`Grid::char_at`]
//! returns the empty sentinel — so the region extractor and matching
//! engine can probe freely without bounds-checking ceremony at every call
//! site.

pub mod spatial_index;

pub use spatial_index::SpatialIndex;

/// Sentinel returned for any out-of-bounds read.
pub const EMPTY: char = '\0';

/// Coarse family a boundary character belongs to (spec.md §4.1). Used to
/// pick a border-style label for a candidate and to detect whether a
/// repaired gap's neighbors are "the same family".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BorderFamily {
    /// `-|+` and similar ASCII-only single-line box drawing.
    SingleLine,
    /// `═ ║ ╔ ╗ ╚ ╝` double-line box drawing.
    DoubleLine,
    /// `━ ┃ ┏ ┓ ┗ ┛` heavy box drawing.
    Heavy,
    /// `╭ ╮ ╰ ╯` rounded corners (combined with single-line edges).
    Rounded,
    /// Any other character explicitly classified as a boundary by a
    /// caller-supplied table extension.
    Custom,
}

/// Classify `ch` as a boundary character, returning its family if it is
/// one. The table covers the five families named in spec.md §4.1: ASCII
/// single-line, Unicode double-line, heavy, rounded, and a small "custom"
/// set of additional marks seen in ASCII-art mockups.
pub fn classify_boundary(ch: char) -> Option<BorderFamily> {
    match ch {
        '-' | '|' | '+' | '─' | '│' | '┌' | '┐' | '└' | '┘' | '┬' | '┴' | '├' | '┤' | '┼' => {
            Some(BorderFamily::SingleLine)
        }
        '═' | '║' | '╔' | '╗' | '╚' | '╝' | '╦' | '╩' | '╠' | '╣' | '╬' => Some(BorderFamily::DoubleLine),
        '━' | '┃' | '┏' | '┓' | '┗' | '┛' | '┳' | '┻' | '┣' | '┫' | '╋' => Some(BorderFamily::Heavy),
        '╭' | '╮' | '╰' | '╯' => Some(BorderFamily::Rounded),
        '*' | '#' | '%' | '~' | '[' | ']' | '(' | ')' => Some(BorderFamily::Custom),
        _ => None,
    }
}

/// Is `ch` a recognized boundary character under any family?
pub fn is_boundary(ch: char) -> bool {
    classify_boundary(ch).is_some()
}

/// A rectangular, immutable buffer of characters.
///
/// Grids are immutable once constructed for a run (spec.md §3); any edit
/// (e.g. an incremental-update delta, §5) produces a new `Grid` rather
/// than mutating this one in place.
#[derive(Debug, Clone)]
pub struct Grid {
    width: usize,
    height: usize,
    rows: Vec<Vec<char>>,
}

impl Grid {
    /// Build a grid from `lines`, padding every row out to the width of
    /// the longest line with spaces so `width`/`height` are rectangular.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rows: Vec<Vec<char>> = lines.into_iter().map(|l| l.as_ref().chars().collect()).collect();
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, ' ');
                row
            })
            .collect::<Vec<_>>();
        let height = rows.len();
        Self { width, height, rows }
    }

    /// Build an empty (zero-dimension) grid.
    pub fn empty() -> Self {
        Self { width: 0, height: 0, rows: Vec::new() }
    }

    /// Grid width in columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Read the character at `(x, y)`. Always succeeds: out-of-bounds
    /// reads return [`EMPTY`] rather than failing (spec.md §4.1).
    pub fn char_at(&self, x: i64, y: i64) -> char {
        if x < 0 || y < 0 {
            return EMPTY;
        }
        let (x, y) = (x as usize, y as usize);
        self.rows.get(y).and_then(|row| row.get(x)).copied().unwrap_or(EMPTY)
    }

    /// Is `(x, y)` a classified boundary cell?
    pub fn is_boundary(&self, x: i64, y: i64) -> bool {
        is_boundary(self.char_at(x, y))
    }

    /// Borrow row `y` as a character slice. Out-of-range rows return an
    /// empty slice.
    pub fn row(&self, y: usize) -> &[char] {
        self.rows.get(y).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Extract the rectangular sub-region `[x1, x2) x [y1, y2)` as owned
    /// rows of characters, padding out-of-bounds reads with [`EMPTY`].
    pub fn region(&self, x1: i64, y1: i64, x2: i64, y2: i64) -> Vec<Vec<char>> {
        (y1..y2).map(|y| (x1..x2).map(|x| self.char_at(x, y)).collect()).collect()
    }

    /// True if the grid has no cells at all.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_reads_return_sentinel_not_panic() {
        let grid = Grid::from_lines(["ab", "cd"]);
        assert_eq!(grid.char_at(-1, 0), EMPTY);
        assert_eq!(grid.char_at(100, 100), EMPTY);
        assert_eq!(grid.char_at(0, 0), 'a');
    }

    #[test]
    fn rows_are_padded_to_rectangle() {
        let grid = Grid::from_lines(["short", "a much longer row"]);
        assert_eq!(grid.width(), "a much longer row".len());
        assert_eq!(grid.row(0).len(), grid.width());
    }

    #[test]
    fn classifies_box_drawing_families() {
        assert_eq!(classify_boundary('-'), Some(BorderFamily::SingleLine));
        assert_eq!(classify_boundary('═'), Some(BorderFamily::DoubleLine));
        assert_eq!(classify_boundary('┏'), Some(BorderFamily::Heavy));
        assert_eq!(classify_boundary('╭'), Some(BorderFamily::Rounded));
        assert_eq!(classify_boundary('a'), None);
    }
}
