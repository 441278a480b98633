//! Held-out coverage of a training phrase table.
//!
//! A held-out pair is *reachable* under a concatenation bound when the
//! source and target can be cut into the same number of contiguous parts
//! such that some pairing of source parts (in order) with target parts (in
//! any order) lies entirely inside the training set. Search runs bottom-up
//! over the number of cuts and short-circuits on the first witness.
//!
//! The default pairing search enumerates target permutations, which is
//! factorial but fine for the documented operational ceiling of three
//! concatenations. The `matching` feature swaps in maximum bipartite
//! matching over the part compatibility matrix for larger bounds.

use crate::error::{PhraseError, Result};
use crate::phrase::tokenize;
use crate::probs::PhrasePair;
use fst::{Set, SetBuilder};
use std::io;
use std::path::Path;

#[cfg(not(feature = "matching"))]
use itertools::Itertools;

/// Membership set over phrase pairs, an FST over sorted
/// `source "\t" target` keys. Lookup never materializes the pairs.
#[derive(Debug, Clone)]
pub struct PhraseSet {
    set: Set<Vec<u8>>,
}

fn pair_key(source: &str, target: &str) -> String {
    format!("{}\t{}", source, target)
}

impl PhraseSet {
    /// Build from any pair collection; duplicates collapse.
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = PhrasePair>,
    {
        let mut keys: Vec<String> =
            pairs.into_iter().map(|(s, t)| pair_key(&s, &t)).collect();
        keys.sort();
        keys.dedup();

        let mut builder = SetBuilder::memory();
        for key in &keys {
            builder.insert(key).map_err(invalid_data)?;
        }
        let bytes = builder.into_inner().map_err(invalid_data)?;
        Ok(Self { set: Set::new(bytes).map_err(invalid_data)? })
    }

    pub fn contains(&self, source: &str, target: &str) -> bool {
        self.set.contains(pair_key(source, target))
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Write the raw FST bytes.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.set.as_fst().as_bytes())?;
        Ok(())
    }

    /// Map a file written by `save` back into a set.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self { set: Set::new(bytes).map_err(invalid_data)? })
    }
}

fn invalid_data(e: fst::Error) -> PhraseError {
    PhraseError::Io(io::Error::new(io::ErrorKind::InvalidData, e))
}

/// All ways to cut `words` into exactly `parts` contiguous non-empty
/// chunks, each chunk joined back with single spaces.
pub fn splits_into(words: &[&str], parts: usize) -> Vec<Vec<String>> {
    if parts == 0 || words.len() < parts {
        return Vec::new();
    }
    if parts == 1 {
        return vec![vec![words.join(" ")]];
    }
    let mut out = Vec::new();
    for i in 1..=(words.len() - (parts - 1)) {
        let front = words[..i].join(" ");
        for mut tail in splits_into(&words[i..], parts - 1) {
            let mut split = Vec::with_capacity(parts);
            split.push(front.clone());
            split.append(&mut tail);
            out.push(split);
        }
    }
    out
}

/// Can `(source, target)` be rebuilt from at most `max_concat`
/// concatenations of training pairs, reordering the target side?
pub fn reachable(set: &PhraseSet, source: &str, target: &str, max_concat: usize) -> bool {
    let src_words = tokenize(source);
    let tgt_words = tokenize(target);

    for n in 0..=max_concat {
        let parts = n + 1;
        if n == 0 {
            if set.contains(source, target) {
                return true;
            }
            continue;
        }
        if src_words.len() < parts || tgt_words.len() < parts {
            break;
        }
        for src_split in splits_into(&src_words, parts) {
            for tgt_split in splits_into(&tgt_words, parts) {
                if admits(set, &src_split, &tgt_split) {
                    return true;
                }
            }
        }
    }
    false
}

/// Brute force: try every ordering of the target parts.
#[cfg(not(feature = "matching"))]
fn admits(set: &PhraseSet, src_parts: &[String], tgt_parts: &[String]) -> bool {
    tgt_parts
        .iter()
        .permutations(tgt_parts.len())
        .any(|perm| {
            src_parts
                .iter()
                .zip(perm)
                .all(|(s, t)| set.contains(s, t))
        })
}

/// Matching formulation: a pairing exists iff the part compatibility
/// matrix has a perfect matching.
#[cfg(feature = "matching")]
fn admits(set: &PhraseSet, src_parts: &[String], tgt_parts: &[String]) -> bool {
    let n = src_parts.len();
    let compat: Vec<Vec<bool>> = src_parts
        .iter()
        .map(|s| tgt_parts.iter().map(|t| set.contains(s, t)).collect())
        .collect();

    fn assign(
        k: usize,
        compat: &[Vec<bool>],
        seen: &mut [bool],
        matched: &mut [Option<usize>],
    ) -> bool {
        for m in 0..compat[k].len() {
            if compat[k][m] && !seen[m] {
                seen[m] = true;
                if matched[m].is_none()
                    || assign(matched[m].unwrap(), compat, seen, matched)
                {
                    matched[m] = Some(k);
                    return true;
                }
            }
        }
        false
    }

    let mut matched: Vec<Option<usize>> = vec![None; n];
    for k in 0..n {
        let mut seen = vec![false; n];
        if !assign(k, &compat, &mut seen, &mut matched) {
            return false;
        }
    }
    true
}

/// Coverage of one held-out set at one concatenation bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoverageReport {
    pub max_concat: usize,
    pub total: usize,
    pub reachable: usize,
}

impl CoverageReport {
    /// Fraction of held-out pairs that were reachable.
    pub fn coverage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.reachable as f64 / self.total as f64
        }
    }
}

/// Score every held-out pair against the training set.
pub fn evaluate(set: &PhraseSet, held_out: &[PhrasePair], max_concat: usize) -> CoverageReport {
    let mut report = CoverageReport { max_concat, total: held_out.len(), reachable: 0 };
    for (source, target) in held_out {
        if reachable(set, source, target, max_concat) {
            report.reachable += 1;
        }
    }
    report
}
