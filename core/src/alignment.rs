//! Word-alignment parsing and bounding-box algebra.
//!
//! An alignment is a set of `(source, target)` token index pairs, read from
//! the textual `"i-j i-j …"` format produced by word aligners. A `Rect` is
//! the inclusive bounding box of a point set on both axes; phrase extraction
//! works entirely in terms of rectangles and the *straddle* predicate (a
//! point inside exactly one of the two axis intervals).

use crate::error::{PhraseError, Result};
use std::collections::HashSet;

/// One word-alignment link: `(source index, target index)`.
pub type AlignPoint = (usize, usize);

/// Parse one alignment line (`"0-0 1-2 …"`) into a point set.
///
/// Duplicate pairs are silently absorbed. Tokens without a `-` separator or
/// with non-integer halves fail with `MalformedAlignment`; negative indices
/// fail with `OutOfRange`. An empty line yields the empty set.
pub fn parse_alignments(line: &str) -> Result<HashSet<AlignPoint>> {
    let mut points = HashSet::new();
    for tok in line.split_whitespace() {
        let (a, b) = tok.split_once('-').ok_or_else(|| PhraseError::MalformedAlignment {
            token: tok.to_string(),
            line: 0,
        })?;
        let parse = |s: &str| -> Result<i64> {
            s.parse::<i64>().map_err(|_| PhraseError::MalformedAlignment {
                token: tok.to_string(),
                line: 0,
            })
        };
        let (i, j) = (parse(a)?, parse(b)?);
        for idx in [i, j] {
            if idx < 0 {
                return Err(PhraseError::OutOfRange { index: idx, len: 0, line: 0 });
            }
        }
        points.insert((i as usize, j as usize));
    }
    Ok(points)
}

/// Serialize a point set back to the textual format, sorted for stable output.
pub fn format_alignments(points: &HashSet<AlignPoint>) -> String {
    let mut sorted: Vec<_> = points.iter().copied().collect();
    sorted.sort_unstable();
    let toks: Vec<String> = sorted.iter().map(|(i, j)| format!("{}-{}", i, j)).collect();
    toks.join(" ")
}

/// Inclusive bounding box over a source span and a target span.
///
/// Field order follows the `(i_min, j_min, i_max, j_max)` convention of the
/// phrase table literature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rect {
    pub src_min: usize,
    pub tgt_min: usize,
    pub src_max: usize,
    pub tgt_max: usize,
}

impl Rect {
    pub fn new(src_min: usize, tgt_min: usize, src_max: usize, tgt_max: usize) -> Self {
        debug_assert!(src_min <= src_max && tgt_min <= tgt_max);
        Self { src_min, tgt_min, src_max, tgt_max }
    }

    /// Degenerate rectangle covering a single alignment point.
    pub fn from_point(p: AlignPoint) -> Self {
        Self::new(p.0, p.1, p.0, p.1)
    }

    /// Bounding box of a non-empty point set; `None` on empty input.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a AlignPoint>,
    {
        let mut it = points.into_iter();
        let first = *it.next()?;
        let mut r = Self::from_point(first);
        for &p in it {
            r = r.include(p);
        }
        Some(r)
    }

    pub fn contains_src(&self, i: usize) -> bool {
        self.src_min <= i && i <= self.src_max
    }

    pub fn contains_tgt(&self, j: usize) -> bool {
        self.tgt_min <= j && j <= self.tgt_max
    }

    /// Point inside both axis intervals.
    pub fn covers(&self, p: AlignPoint) -> bool {
        self.contains_src(p.0) && self.contains_tgt(p.1)
    }

    /// Point inside exactly one axis interval: it crosses the rectangle
    /// border and makes the rectangle inconsistent.
    pub fn straddles(&self, p: AlignPoint) -> bool {
        self.contains_src(p.0) != self.contains_tgt(p.1)
    }

    /// Grow the bounding box to cover `p`.
    pub fn include(&self, p: AlignPoint) -> Self {
        Self {
            src_min: self.src_min.min(p.0),
            tgt_min: self.tgt_min.min(p.1),
            src_max: self.src_max.max(p.0),
            tgt_max: self.tgt_max.max(p.1),
        }
    }

    /// Minimum bounding rectangle of two rectangles.
    pub fn combine(&self, other: &Rect) -> Self {
        Self {
            src_min: self.src_min.min(other.src_min),
            tgt_min: self.tgt_min.min(other.tgt_min),
            src_max: self.src_max.max(other.src_max),
            tgt_max: self.tgt_max.max(other.tgt_max),
        }
    }

    /// Number of source tokens covered.
    pub fn src_len(&self) -> usize {
        self.src_max - self.src_min + 1
    }

    /// Number of target tokens covered.
    pub fn tgt_len(&self) -> usize {
        self.tgt_max - self.tgt_min + 1
    }

    /// Both spans inside the phrase length bound.
    pub fn within(&self, max_len: usize) -> bool {
        self.src_len() <= max_len && self.tgt_len() <= max_len
    }

    /// Rectangle fits inside sentences of the given lengths.
    pub fn in_bounds(&self, src_len: usize, tgt_len: usize) -> bool {
        self.src_max < src_len && self.tgt_max < tgt_len
    }

    /// No point of `points` crosses this rectangle's border.
    pub fn consistent_with<'a, I>(&self, points: I) -> bool
    where
        I: IntoIterator<Item = &'a AlignPoint>,
    {
        !points.into_iter().any(|&p| self.straddles(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(pairs: &[(usize, usize)]) -> HashSet<AlignPoint> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn parse_basic_line() {
        let a = parse_alignments("0-0 1-2 1-2 3-1").unwrap();
        // duplicate 1-2 absorbed
        assert_eq!(a, set(&[(0, 0), (1, 2), (3, 1)]));
    }

    #[test]
    fn parse_empty_line_is_empty_set() {
        assert!(parse_alignments("").unwrap().is_empty());
        assert!(parse_alignments("   \t ").unwrap().is_empty());
    }

    #[test]
    fn parse_rejects_missing_separator() {
        let err = parse_alignments("3").unwrap_err();
        assert!(matches!(err, PhraseError::MalformedAlignment { .. }));
        let err = parse_alignments("0-0 x").unwrap_err();
        assert!(matches!(err, PhraseError::MalformedAlignment { .. }));
    }

    #[test]
    fn parse_rejects_non_integer_halves() {
        for bad in ["a-1", "1-b", "1-", "-1", "1-2-3"] {
            let err = parse_alignments(bad).unwrap_err();
            assert!(
                matches!(err, PhraseError::MalformedAlignment { .. }),
                "token {:?} should be malformed",
                bad
            );
        }
    }

    #[test]
    fn parse_rejects_negative_index_as_out_of_range() {
        let err = parse_alignments("3--4").unwrap_err();
        assert!(matches!(err, PhraseError::OutOfRange { index: -4, .. }));
    }

    #[test]
    fn parse_format_round_trip() {
        let original = set(&[(9, 0), (9, 1), (10, 2), (0, 17)]);
        let text = format_alignments(&original);
        let back = parse_alignments(&text).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn bounding_box_over_points() {
        let pts = set(&[(2, 5), (4, 1), (3, 3)]);
        let r = Rect::from_points(&pts).unwrap();
        assert_eq!(r, Rect::new(2, 1, 4, 5));
        assert!(Rect::from_points(&HashSet::new()).is_none());
    }

    #[test]
    fn straddle_is_exactly_one_axis() {
        let r = Rect::new(1, 1, 2, 2);
        assert!(r.straddles((1, 0))); // source in, target out
        assert!(r.straddles((0, 2))); // target in, source out
        assert!(!r.straddles((1, 2))); // both in
        assert!(!r.straddles((0, 0))); // both out
    }

    #[test]
    fn combine_is_minimum_bounding_rectangle() {
        let a = Rect::new(0, 0, 1, 1);
        let b = Rect::new(3, 2, 4, 5);
        assert_eq!(a.combine(&b), Rect::new(0, 0, 4, 5));
        assert_eq!(b.combine(&a), Rect::new(0, 0, 4, 5));
    }

    #[test]
    fn span_lengths_and_bounds() {
        let r = Rect::new(1, 0, 3, 1);
        assert_eq!(r.src_len(), 3);
        assert_eq!(r.tgt_len(), 2);
        assert!(r.within(3));
        assert!(!r.within(2));
        assert!(r.in_bounds(4, 2));
        assert!(!r.in_bounds(3, 2));
    }
}
