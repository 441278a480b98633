/*!
Consistent phrase-rectangle extraction from a word alignment.

Two phases over the alignment point set:

- *Closure*: seed a rectangle from any remaining point and absorb every
  point that straddles it, recomputing the bounding box, until the
  rectangle is consistent. Each point seeds or joins exactly one initial
  rectangle.
- *Growth*: drain the initial rectangles through a work queue. Each
  rectangle is padded one row/column at a time into fully unaligned
  neighbors, and joined pairwise with the rest of the queue; joins pass
  through a fix-up loop that re-absorbs straddling points or discards the
  candidate when a span outgrows the length bound.

Singleton rectangles of the alignment points themselves are appended last
so that every aligned word pair survives as a single-word phrase pair.

Straddle tests always run against the full alignment set, so every emitted
rectangle (word singletons aside) is consistent with every point, not just
with the points that had not yet been consumed.
*/

use crate::alignment::{AlignPoint, Rect};
use std::collections::HashSet;

/// Result of one extraction: the rectangle set plus the number of
/// candidates dropped by the phrase length bound.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub rects: HashSet<Rect>,
    pub filtered: usize,
}

/// Extract every consistent phrase rectangle for one sentence pair.
///
/// `src_len` / `tgt_len` are the token counts of the two sentences and
/// bound rectangle growth; `max_len` is the phrase length bound on both
/// spans (`usize::MAX` disables it). An empty alignment yields an empty
/// extraction.
pub fn extract_rectangles(
    alignment: &HashSet<AlignPoint>,
    src_len: usize,
    tgt_len: usize,
    max_len: usize,
) -> Extraction {
    let mut out = Extraction::default();

    // Phase A: closure into initial consistent rectangles.
    let mut queue: HashSet<Rect> = HashSet::new();
    let mut remaining: HashSet<AlignPoint> = alignment.clone();
    loop {
        let seed = match remaining.iter().next() {
            Some(&p) => p,
            None => break,
        };
        remaining.remove(&seed);
        let mut rect = Rect::from_point(seed);
        loop {
            let straddling: Vec<AlignPoint> =
                alignment.iter().copied().filter(|&p| rect.straddles(p)).collect();
            if straddling.is_empty() {
                break;
            }
            for p in straddling {
                remaining.remove(&p);
                rect = rect.include(p);
            }
        }
        if !rect.within(max_len) {
            out.filtered += 1;
            continue;
        }
        if rect.in_bounds(src_len, tgt_len) {
            queue.insert(rect);
        }
    }

    // Phase B: drain the queue, padding and joining as we go.
    loop {
        let rect = match queue.iter().next() {
            Some(&r) => r,
            None => break,
        };
        queue.remove(&rect);
        let mut fresh: HashSet<Rect> = HashSet::new();

        for grown in unit_expansions(rect, alignment, src_len, tgt_len) {
            if grown.within(max_len) {
                fresh.insert(grown);
            } else {
                out.filtered += 1;
            }
        }

        for &other in queue.iter() {
            match fix_up(rect.combine(&other), alignment, max_len) {
                Some(joined) if joined != rect => {
                    fresh.insert(joined);
                }
                Some(_) => {}
                None => out.filtered += 1,
            }
        }

        out.rects.insert(rect);
        for r in fresh {
            if !out.rects.contains(&r) {
                queue.insert(r);
            }
        }
    }

    // Word rectangles: one singleton per alignment point.
    for &p in alignment {
        let r = Rect::from_point(p);
        if r.within(max_len) && r.in_bounds(src_len, tgt_len) {
            out.rects.insert(r);
        }
    }

    out
}

/// The four one-step paddings of `rect` whose new row or column carries no
/// alignment point. Expansions past the sentence border are rejected.
fn unit_expansions(
    rect: Rect,
    alignment: &HashSet<AlignPoint>,
    src_len: usize,
    tgt_len: usize,
) -> Vec<Rect> {
    let row_unaligned = |i: usize| !alignment.iter().any(|&(a, _)| a == i);
    let col_unaligned = |j: usize| !alignment.iter().any(|&(_, b)| b == j);

    let mut grown = Vec::with_capacity(4);
    if rect.src_min > 0 && row_unaligned(rect.src_min - 1) {
        grown.push(Rect::new(rect.src_min - 1, rect.tgt_min, rect.src_max, rect.tgt_max));
    }
    if rect.src_max + 1 < src_len && row_unaligned(rect.src_max + 1) {
        grown.push(Rect::new(rect.src_min, rect.tgt_min, rect.src_max + 1, rect.tgt_max));
    }
    if rect.tgt_min > 0 && col_unaligned(rect.tgt_min - 1) {
        grown.push(Rect::new(rect.src_min, rect.tgt_min - 1, rect.src_max, rect.tgt_max));
    }
    if rect.tgt_max + 1 < tgt_len && col_unaligned(rect.tgt_max + 1) {
        grown.push(Rect::new(rect.src_min, rect.tgt_min, rect.src_max, rect.tgt_max + 1));
    }
    grown
}

/// Re-absorb straddling points into a joined rectangle until it is
/// consistent again; `None` when a span outgrows the length bound first.
fn fix_up(mut rect: Rect, alignment: &HashSet<AlignPoint>, max_len: usize) -> Option<Rect> {
    loop {
        if !rect.within(max_len) {
            return None;
        }
        let mut grown = rect;
        for &p in alignment.iter() {
            if rect.straddles(p) {
                grown = grown.include(p);
            }
        }
        if grown == rect {
            return Some(rect);
        }
        rect = grown;
    }
}
