use std::fmt;

/// A 0-based line/column position in a document.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Default,
    serde::Serialize,
    serde::Deserialize,
    Hash,
)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    /// Create a new position at the given 0-based line and column.
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.line, self.col)
    }
}

/// A range between two positions, guaranteed `start <= end`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Default,
    serde::Serialize,
    serde::Deserialize,
    Hash,
)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    /// Create a range, ensuring `start <= end`.
    pub fn new(a: Position, b: Position) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    /// Returns `true` if start == end.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns `true` if `pos` is inside the range (start inclusive,
    /// end exclusive).
    pub fn contains(&self, pos: Position) -> bool {
        pos >= self.start && pos < self.end
    }

    /// Returns `true` if the two ranges share at least one position.
    pub fn overlaps(&self, other: &Range) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The smallest range covering both `self` and `other`.
    pub fn union(&self, other: &Range) -> Range {
        Range {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_new_creates_correct_values() {
        let p = Position::new(3, 7);
        assert_eq!(p.line, 3);
        assert_eq!(p.col, 7);
    }

    #[test]
    fn position_default_is_zero_zero() {
        let p = Position::default();
        assert_eq!(p, Position::new(0, 0));
    }

    #[test]
    fn position_display_format() {
        let p = Position::new(1, 2);
        assert_eq!(format!("{p}"), "(1, 2)");
    }

    #[test]
    fn position_ordering_line_first() {
        let a = Position::new(1, 5);
        let b = Position::new(2, 0);
        assert!(a < b);
    }

    #[test]
    fn position_ordering_col_within_same_line() {
        let a = Position::new(1, 3);
        let b = Position::new(1, 5);
        assert!(a < b);
    }

    #[test]
    fn range_new_orders_positions() {
        let a = Position::new(5, 0);
        let b = Position::new(2, 3);
        let r = Range::new(a, b);
        assert_eq!(r.start, b);
        assert_eq!(r.end, a);
    }

    #[test]
    fn range_is_empty_when_start_equals_end() {
        let p = Position::new(1, 1);
        let r = Range::new(p, p);
        assert!(r.is_empty());
    }

    #[test]
    fn range_contains_start_inclusive_end_exclusive() {
        let r = Range::new(Position::new(1, 0), Position::new(1, 5));
        assert!(r.contains(Position::new(1, 0)));
        assert!(!r.contains(Position::new(1, 5)));
    }

    #[test]
    fn range_overlaps_detects_shared_span() {
        let a = Range::new(Position::new(0, 0), Position::new(0, 5));
        let b = Range::new(Position::new(0, 3), Position::new(0, 8));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn range_overlaps_false_for_adjacent() {
        let a = Range::new(Position::new(0, 0), Position::new(0, 5));
        let b = Range::new(Position::new(0, 5), Position::new(0, 8));
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn range_union_covers_both() {
        let a = Range::new(Position::new(0, 2), Position::new(1, 0));
        let b = Range::new(Position::new(0, 7), Position::new(2, 4));
        let u = a.union(&b);
        assert_eq!(u.start, Position::new(0, 2));
        assert_eq!(u.end, Position::new(2, 4));
    }
}
