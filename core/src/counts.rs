//! Streaming frequency aggregation over a parallel corpus.
//!
//! One pass reads the alignment file and the two language files in lockstep
//! (optionally a sentence-weight file as well), extracts every consistent
//! phrase rectangle per sentence pair, and accumulates weighted counters:
//! phrase-pair, source-phrase and target-phrase frequencies, plus the three
//! lexical counters fed by single-word pairs and the `NULL` pseudo-pairs.
//!
//! Memory grows with the number of distinct phrase pairs, not with corpus
//! length. Counters snapshot to disk with bincode so an expensive pass can
//! be checkpointed and reloaded.

use crate::alignment::parse_alignments;
use crate::error::{PhraseError, Result};
use crate::extract::extract_rectangles;
use crate::phrase::{materialize, null_pairs, tokenize};
use crate::utils::normalize;
use crate::{Config, ErrorPolicy};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines};
use std::path::Path;
use tracing::{debug, warn};

/// Weighted frequency counters collected by the corpus pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhraseCounts {
    /// c(s, t) over extracted phrase pairs.
    pub pair: AHashMap<(String, String), f64>,
    /// c(s) over source phrases.
    pub source: AHashMap<String, f64>,
    /// c(t) over target phrases.
    pub target: AHashMap<String, f64>,
    /// Word-level c(s, t): single-token pairs and NULL pseudo-pairs.
    pub lex_pair: AHashMap<(String, String), f64>,
    /// Word-level c(s).
    pub lex_source: AHashMap<String, f64>,
    /// Word-level c(t).
    pub lex_target: AHashMap<String, f64>,
}

/// Tally of one finished pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Sentence pairs consumed.
    pub sentences: usize,
    /// Sentence pairs dropped under `ErrorPolicy::Skip`.
    pub skipped: usize,
    /// Rectangles discarded by the phrase length bound.
    pub filtered: usize,
}

impl PhraseCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one phrase pair at the given weight.
    pub fn add_pair(&mut self, s: String, t: String, weight: f64) {
        *self.source.entry(s.clone()).or_default() += weight;
        *self.target.entry(t.clone()).or_default() += weight;
        *self.pair.entry((s, t)).or_default() += weight;
    }

    /// Count one word-level pair at the given weight.
    pub fn add_lexical(&mut self, s: String, t: String, weight: f64) {
        *self.lex_source.entry(s.clone()).or_default() += weight;
        *self.lex_target.entry(t.clone()).or_default() += weight;
        *self.lex_pair.entry((s, t)).or_default() += weight;
    }

    /// Accumulate one sentence pair. Returns the number of rectangles the
    /// length bound filtered out.
    ///
    /// Alignment indices are validated against the tokenized sentence
    /// lengths here; the textual parser only rejects negative indices.
    pub fn observe_sentence(
        &mut self,
        alignment_line: &str,
        source_line: &str,
        target_line: &str,
        weight: f64,
        config: &Config,
    ) -> Result<usize> {
        let alignment = parse_alignments(alignment_line)?;
        let source_line = normalize(source_line);
        let target_line = normalize(target_line);
        let src_tokens = tokenize(&source_line);
        let tgt_tokens = tokenize(&target_line);

        for &(i, j) in &alignment {
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

        let extraction = extract_rectangles(
            &alignment,
            src_tokens.len(),
            tgt_tokens.len(),
            config.max_phrase_length,
        );

        for (s, t) in materialize(&extraction.rects, &src_tokens, &tgt_tokens) {
            let word_pair = !s.contains(' ') && !t.contains(' ');
            self.add_pair(s.clone(), t.clone(), weight);
            if word_pair {
                self.add_lexical(s, t, weight);
            }
        }
        for (s, t) in null_pairs(&alignment, &src_tokens, &tgt_tokens, &config.null_token) {
            self.add_lexical(s, t, weight);
        }

        Ok(extraction.filtered)
    }

    /// Snapshot the counters to a bincode file.
    pub fn save_cache<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, self)?;
        Ok(())
    }

    /// Reload a counter snapshot.
    pub fn load_cache<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let counts: Self = bincode::deserialize_from(reader)?;
        Ok(counts)
    }
}

/// Run the full streaming pass over a corpus on disk.
///
/// The three files are read in lockstep; a length disagreement fails with
/// `CorpusLengthMismatch`. `weights` supplies one decimal per sentence
/// (default weight 1.0 when absent). Per-sentence errors abort or skip
/// according to `Config::on_bad_sentence`.
pub fn extract_corpus_counts(
    alignments: &Path,
    language1: &Path,
    language2: &Path,
    weights: Option<&Path>,
    config: &Config,
) -> Result<(PhraseCounts, PassSummary)> {
    let mut align_lines = open_lines(alignments)?;
    let mut l1_lines = open_lines(language1)?;
    let mut l2_lines = open_lines(language2)?;
    let mut weight_lines = match weights {
        Some(p) => Some(open_lines(p)?),
        None => None,
    };

    let mut counts = PhraseCounts::new();
    let mut summary = PassSummary::default();
    let mut line_no = 0usize;

    loop {
        line_no += 1;
        let next = (align_lines.next(), l1_lines.next(), l2_lines.next());
        let (a, s, t) = match next {
            (None, None, None) => break,
            (Some(a), Some(s), Some(t)) => (a?, s?, t?),
            _ => return Err(PhraseError::CorpusLengthMismatch { line: line_no }),
        };
        let weight = match weight_lines.as_mut().map(|it| it.next()) {
            None => Ok(1.0),
            Some(Some(w)) => parse_weight(&w?, line_no),
            Some(None) => return Err(PhraseError::CorpusLengthMismatch { line: line_no }),
        };

        let observed = weight
            .and_then(|w| counts.observe_sentence(&a, &s, &t, w, config));
        match observed {
            Ok(filtered) => {
                summary.sentences += 1;
                summary.filtered += filtered;
            }
            Err(e) if e.is_sentence_local() && config.on_bad_sentence == ErrorPolicy::Skip => {
                warn!(line = line_no, error = %e, "skipping sentence pair");
                summary.skipped += 1;
            }
            Err(e) => return Err(e.at_line(line_no)),
        }

        if line_no % config.progress_interval == 0 {
            debug!(sentences = line_no, pairs = counts.pair.len(), "corpus pass");
        }
    }

    // A longer weight file is a length mismatch too.
    if let Some(mut it) = weight_lines {
        if it.next().is_some() {
            return Err(PhraseError::CorpusLengthMismatch { line: line_no });
        }
    }

    Ok((counts, summary))
}

fn open_lines(path: &Path) -> Result<Lines<BufReader<File>>> {
    Ok(BufReader::new(File::open(path)?).lines())
}

fn parse_weight(text: &str, line_no: usize) -> Result<f64> {
    let trimmed = text.trim();
    match trimmed.parse::<f64>() {
        Ok(w) if w.is_finite() && w >= 0.0 => Ok(w),
        _ => Err(PhraseError::MalformedWeight { token: trimmed.to_string(), line: line_no }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::default()
    }

    #[test]
    fn single_sentence_counts_pairs_and_lexical_pairs() {
        let mut counts = PhraseCounts::new();
        let filtered = counts
            .observe_sentence("0-0 1-1", "a b", "x y", 1.0, &config())
            .unwrap();
        assert_eq!(filtered, 0);

        assert_eq!(counts.pair[&("a".into(), "x".into())], 1.0);
        assert_eq!(counts.pair[&("b".into(), "y".into())], 1.0);
        assert_eq!(counts.pair[&("a b".into(), "x y".into())], 1.0);
        assert_eq!(counts.source["a b"], 1.0);
        assert_eq!(counts.target["x y"], 1.0);

        // only the single-token pairs reach the lexical counters
        assert_eq!(counts.lex_pair[&("a".into(), "x".into())], 1.0);
        assert!(!counts.lex_pair.contains_key(&("a b".into(), "x y".into())));
    }

    #[test]
    fn unaligned_words_feed_only_lexical_counters() {
        let mut counts = PhraseCounts::new();
        counts
            .observe_sentence("0-0", "a b", "x", 1.0, &config())
            .unwrap();
        assert_eq!(counts.lex_pair[&("b".into(), "NULL".into())], 1.0);
        assert!(!counts.pair.contains_key(&("b".into(), "NULL".into())));
    }

    #[test]
    fn sentence_weight_scales_every_increment() {
        let mut counts = PhraseCounts::new();
        counts
            .observe_sentence("0-0", "a", "x", 0.5, &config())
            .unwrap();
        counts
            .observe_sentence("0-0", "a", "x", 0.25, &config())
            .unwrap();
        assert!((counts.pair[&("a".into(), "x".into())] - 0.75).abs() < 1e-12);
        assert!((counts.source["a"] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn alignment_past_sentence_end_is_out_of_range() {
        let mut counts = PhraseCounts::new();
        let err = counts
            .observe_sentence("0-0 5-1", "a b", "x y", 1.0, &config())
            .unwrap_err();
        assert!(matches!(err, PhraseError::OutOfRange { index: 5, len: 2, .. }));
    }

    #[test]
    fn weight_lines_must_be_finite_and_non_negative() {
        assert!(parse_weight("1.25", 1).is_ok());
        for bad in ["", "abc", "-0.5", "NaN", "inf"] {
            assert!(
                matches!(parse_weight(bad, 1), Err(PhraseError::MalformedWeight { .. })),
                "weight {:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn cache_round_trip_preserves_counters() {
        let mut counts = PhraseCounts::new();
        counts
            .observe_sentence("0-0 1-1", "a b", "x y", 2.0, &config())
            .unwrap();

        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis();
        let mut path = std::env::temp_dir();
        path.push(format!("libphrase_test_counts_{}.bincode", stamp));

        counts.save_cache(&path).expect("save cache");
        let back = PhraseCounts::load_cache(&path).expect("load cache");
        std::fs::remove_file(&path).ok();

        assert_eq!(back.pair.len(), counts.pair.len());
        assert_eq!(back.pair[&("a b".into(), "x y".into())], 2.0);
        assert_eq!(back.lex_source["a"], 2.0);
    }
}
