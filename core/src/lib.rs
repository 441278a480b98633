//! libphrase-core
//!
//! Phrase-pair extraction from word-aligned bilingual corpora, translation
//! probability estimation, and held-out coverage scoring, shared by the
//! command-line tools (extract_phrases, score_phrase_table,
//! phrase_coverage).
//!
//! The pipeline: parse word alignments, extract every consistent phrase
//! rectangle per sentence pair, aggregate weighted frequency counters in
//! one streaming pass, derive conditional and lexical probabilities, and
//! write the scored phrase table. Coverage runs separately against a fixed
//! training table.
//!
//! Public API:
//! - `parse_alignments` / `Rect` - alignment records and bounding-box algebra
//! - `extract_rectangles` - consistent rectangles with unaligned padding
//! - `PhraseCounts` / `extract_corpus_counts` - streaming frequency pass
//! - `ConditionalProbs` / `LexTable` / `lexical_weights` - probability models
//! - `score_table` / `write_phrase_extract` - table outputs
//! - `PhraseSet` / `reachable` / `evaluate` - held-out coverage
//! - `Config` - extraction settings with TOML round-trip

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{PhraseError, Result};

pub mod alignment;
pub use alignment::{format_alignments, parse_alignments, AlignPoint, Rect};

pub mod extract;
pub use extract::{extract_rectangles, Extraction};

pub mod phrase;
pub use phrase::{materialize, null_pairs, phrase_pair, tokenize, NULL_TOKEN};

pub mod counts;
pub use counts::{extract_corpus_counts, PassSummary, PhraseCounts};

pub mod probs;
pub use probs::{
    conditional_probabilities, joint_probabilities, lexical_weights, phrase_probabilities,
    ConditionalProbs, LexTable, LexWeights, PhrasePair, LEX_FLOOR,
};

pub mod table;
pub use table::{
    parse_record, read_extract_pairs, read_phrase_extract, score_table, write_phrase_extract,
    ScoreSummary, TableRecord, FIELD_SEP, PHRASE_PENALTY,
};

pub mod coverage;
pub use coverage::{evaluate, reachable, splits_into, CoverageReport, PhraseSet};

/// What to do with a sentence pair that fails to parse or validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Fail the whole pass (the default).
    Abort,
    /// Drop the sentence pair, count it, keep going.
    Skip,
}

/// Settings for the extraction pass.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Phrase length bound on both spans of every rectangle.
    pub max_phrase_length: usize,
    /// Sentinel paired with unaligned words; must not occur as a corpus
    /// token.
    pub null_token: String,
    /// Per-sentence error handling.
    pub on_bad_sentence: ErrorPolicy,
    /// Sentences between progress events during the corpus pass.
    pub progress_interval: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_phrase_length: 4,
            null_token: NULL_TOKEN.to_string(),
            on_bad_sentence: ErrorPolicy::Abort,
            progress_interval: 1000,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(
        path: P,
    ) -> std::result::Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_toml<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml_string(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Utility helpers.
pub mod utils {
    /// Normalize input strings (NFC) and trim whitespace.
    pub fn normalize(s: &str) -> String {
        use unicode_normalization::UnicodeNormalization;
        s.nfc().collect::<String>().trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = Config::default();
        assert_eq!(config.max_phrase_length, 4);
        assert_eq!(config.null_token, "NULL");
        assert_eq!(config.on_bad_sentence, ErrorPolicy::Abort);
        assert_eq!(config.progress_interval, 1000);
    }

    #[test]
    fn config_toml_round_trip() {
        let mut config = Config::default();
        config.max_phrase_length = 7;
        config.on_bad_sentence = ErrorPolicy::Skip;
        let text = config.to_toml_string().unwrap();
        let back = Config::from_toml_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn normalize_trims_and_recomposes() {
        assert_eq!(utils::normalize("  a b \n"), "a b");
        // decomposed e + combining acute recomposes to a single scalar
        assert_eq!(utils::normalize("e\u{0301}"), "\u{00e9}");
    }
}
