//! Probability estimation from finalized counters.
//!
//! Conditional phrase probabilities divide the joint counter by the
//! single-side counters; the marginal and joint maps serve the simple
//! extract writer. Lexical weighting multiplies word translation
//! probabilities along a phrase pair's internal alignment, with one `NULL`
//! factor per unaligned word. The weight is a plain product over aligned
//! pairs — no averaging over multiple links per position.

use crate::alignment::AlignPoint;
use crate::counts::PhraseCounts;
use crate::error::{PhraseError, Result};
use ahash::AHashMap;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::warn;

/// An ordered `(source, target)` phrase pair.
pub type PhrasePair = (String, String);

/// Probability contributed by a word pair missing from a lexical table.
pub const LEX_FLOOR: f64 = 1e-9;

/// Conditional phrase probabilities in both directions.
#[derive(Debug, Clone, Default)]
pub struct ConditionalProbs {
    /// P(s|t) = c(s,t) / c(t)
    pub src_given_tgt: AHashMap<PhrasePair, f64>,
    /// P(t|s) = c(s,t) / c(s)
    pub tgt_given_src: AHashMap<PhrasePair, f64>,
}

/// Divide the pair counter by both single-side counters.
///
/// A zero or missing single-side count is a corrupted counter set and
/// aborts with `InconsistentCounts`.
pub fn conditional_probabilities(counts: &PhraseCounts) -> Result<ConditionalProbs> {
    let mut probs = ConditionalProbs::default();
    for ((s, t), &freq) in counts.pair.iter() {
        let c_t = counts.target.get(t).copied().unwrap_or(0.0);
        if c_t <= 0.0 {
            return Err(PhraseError::InconsistentCounts(format!(
                "target phrase '{}' has zero count",
                t
            )));
        }
        let c_s = counts.source.get(s).copied().unwrap_or(0.0);
        if c_s <= 0.0 {
            return Err(PhraseError::InconsistentCounts(format!(
                "source phrase '{}' has zero count",
                s
            )));
        }
        probs
            .src_given_tgt
            .insert((s.clone(), t.clone()), freq / c_t);
        probs
            .tgt_given_src
            .insert((s.clone(), t.clone()), freq / c_s);
    }
    Ok(probs)
}

/// Normalize a frequency map into a marginal distribution.
pub fn phrase_probabilities(freqs: &AHashMap<String, f64>) -> Result<AHashMap<String, f64>> {
    let total: f64 = freqs.values().sum();
    if freqs.is_empty() {
        return Ok(AHashMap::new());
    }
    if total <= 0.0 {
        return Err(PhraseError::InconsistentCounts(
            "phrase frequencies sum to zero".into(),
        ));
    }
    Ok(freqs.iter().map(|(k, &v)| (k.clone(), v / total)).collect())
}

/// Joint distribution P(s,t) = P(s|t) * P(t).
pub fn joint_probabilities(
    src_given_tgt: &AHashMap<PhrasePair, f64>,
    target_probs: &AHashMap<String, f64>,
) -> Result<AHashMap<PhrasePair, f64>> {
    let mut joint = AHashMap::with_capacity(src_given_tgt.len());
    for (pair, &cond) in src_given_tgt.iter() {
        let p_t = target_probs.get(&pair.1).copied().ok_or_else(|| {
            PhraseError::InconsistentCounts(format!(
                "target phrase '{}' missing from marginal distribution",
                pair.1
            ))
        })?;
        joint.insert(pair.clone(), cond * p_t);
    }
    Ok(joint)
}

/// Word translation table: `(given, predicted) -> P(predicted | given)`.
///
/// The on-disk format is one whitespace-delimited `given predicted prob`
/// record per line, the layout of the directional `f2e` / `e2f` files.
#[derive(Debug, Clone, Default)]
pub struct LexTable {
    probs: AHashMap<(String, String), f64>,
}

impl LexTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<G: Into<String>, P: Into<String>>(&mut self, given: G, predicted: P, prob: f64) {
        self.probs.insert((given.into(), predicted.into()), prob);
    }

    pub fn prob(&self, given: &str, predicted: &str) -> Option<f64> {
        self.probs
            .get(&(given.to_string(), predicted.to_string()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.probs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    /// P_lex(t|s) from the word-level counters: lex(s,t) / lex(s).
    pub fn target_given_source(counts: &PhraseCounts) -> Result<Self> {
        let mut table = Self::new();
        for ((s, t), &freq) in counts.lex_pair.iter() {
            let c_s = counts.lex_source.get(s).copied().unwrap_or(0.0);
            if c_s <= 0.0 {
                return Err(PhraseError::InconsistentCounts(format!(
                    "word '{}' has zero lexical count",
                    s
                )));
            }
            table.insert(s.clone(), t.clone(), freq / c_s);
        }
        Ok(table)
    }

    /// P_lex(s|t) from the word-level counters: lex(s,t) / lex(t).
    pub fn source_given_target(counts: &PhraseCounts) -> Result<Self> {
        let mut table = Self::new();
        for ((s, t), &freq) in counts.lex_pair.iter() {
            let c_t = counts.lex_target.get(t).copied().unwrap_or(0.0);
            if c_t <= 0.0 {
                return Err(PhraseError::InconsistentCounts(format!(
                    "word '{}' has zero lexical count",
                    t
                )));
            }
            table.insert(t.clone(), s.clone(), freq / c_t);
        }
        Ok(table)
    }

    /// Write `given predicted prob` records, sorted for stable output.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        let mut entries: Vec<_> = self.probs.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        for ((given, predicted), prob) in entries {
            writeln!(writer, "{} {} {}", given, predicted, prob)?;
        }
        Ok(())
    }

    /// Read a table written by `save` (or any aligner's lexical dump).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut table = Self::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            let parsed = match fields.as_slice() {
                [given, predicted, prob] => prob.parse::<f64>().ok().map(|p| (given, predicted, p)),
                _ => None,
            };
            match parsed {
                Some((given, predicted, prob)) => table.insert(*given, *predicted, prob),
                None => {
                    return Err(PhraseError::MalformedRecord {
                        what: "lexical table",
                        line: idx + 1,
                    })
                }
            }
        }
        Ok(table)
    }
}

/// Lexical weights of one phrase pair under its internal word alignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LexWeights {
    /// lex(t|s): aligned factors from the f2e table, NULL factors for
    /// unaligned source words.
    pub tgt_given_src: f64,
    /// lex(s|t): aligned factors from the e2f table, NULL factors for
    /// unaligned target words.
    pub src_given_tgt: f64,
    /// Word pairs absent from a table and floored.
    pub unknown: usize,
}

/// Compute both lexical weights for a phrase pair.
///
/// `internal` aligns positions inside the phrase's own tokens and is
/// bounds-checked. Missing table entries contribute `LEX_FLOOR` and are
/// counted rather than treated as fatal.
pub fn lexical_weights(
    src_tokens: &[&str],
    tgt_tokens: &[&str],
    internal: &HashSet<AlignPoint>,
    f2e: &LexTable,
    e2f: &LexTable,
    null_token: &str,
) -> Result<LexWeights> {
    for &(i, j) in internal {
        if i >= src_tokens.len() {
            return Err(PhraseError::OutOfRange {
                index: i as i64,
                len: src_tokens.len(),
                line: 0,
            });
        }
        if j >= tgt_tokens.len() {
            return Err(PhraseError::OutOfRange {
                index: j as i64,
                len: tgt_tokens.len(),
                line: 0,
            });
        }
    }

    let mut links: Vec<AlignPoint> = internal.iter().copied().collect();
    links.sort_unstable();

    let mut weights = LexWeights { tgt_given_src: 1.0, src_given_tgt: 1.0, unknown: 0 };

    for &(i, j) in &links {
        weights.tgt_given_src *= factor(f2e, src_tokens[i], tgt_tokens[j], &mut weights.unknown);
        weights.src_given_tgt *= factor(e2f, tgt_tokens[j], src_tokens[i], &mut weights.unknown);
    }
    for (i, tok) in src_tokens.iter().enumerate() {
        if !links.iter().any(|&(a, _)| a == i) {
            weights.tgt_given_src *= factor(f2e, tok, null_token, &mut weights.unknown);
        }
    }
    for (j, tok) in tgt_tokens.iter().enumerate() {
        if !links.iter().any(|&(_, b)| b == j) {
            weights.src_given_tgt *= factor(e2f, tok, null_token, &mut weights.unknown);
        }
    }

    Ok(weights)
}

fn factor(table: &LexTable, given: &str, predicted: &str, unknown: &mut usize) -> f64 {
    table.prob(given, predicted).unwrap_or_else(|| {
        warn!(given, predicted, "word pair missing from lexical table");
        *unknown += 1;
        LEX_FLOOR
    })
}
