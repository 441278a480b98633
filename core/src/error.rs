//! Error types shared by the extraction, scoring and coverage passes.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PhraseError>;

/// Errors raised by corpus passes.
///
/// Every variant is fatal for the pass that raised it unless the caller has
/// opted into `ErrorPolicy::Skip`, in which case the per-sentence variants
/// (`MalformedAlignment`, `OutOfRange`) drop the offending sentence and the
/// pass continues.
#[derive(Error, Debug)]
pub enum PhraseError {
    /// An alignment token that is not `i-j` with non-negative integers.
    #[error("malformed alignment token '{token}' on line {line}")]
    MalformedAlignment { token: String, line: usize },

    /// An alignment index that is negative or not inside its sentence.
    #[error("alignment index {index} out of range (sentence length {len}) on line {line}")]
    OutOfRange { index: i64, len: usize, line: usize },

    /// A sentence-weight line that is not a finite non-negative decimal.
    #[error("malformed sentence weight '{token}' on line {line}")]
    MalformedWeight { token: String, line: usize },

    /// A delimited table record (phrase table, lexical table, extract file)
    /// that does not match its format.
    #[error("malformed {what} record on line {line}")]
    MalformedRecord { what: &'static str, line: usize },

    /// Parallel files disagree on the number of sentences.
    #[error("corpus files disagree on sentence count at line {line}")]
    CorpusLengthMismatch { line: usize },

    /// A probability denominator was zero, i.e. a phrase pair references a
    /// single-side phrase the counters never saw.
    #[error("inconsistent counts: {0}")]
    InconsistentCounts(String),

    /// OS-level read or write failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PhraseError {
    /// Process exit code for this error: 1 I/O, 2 malformed input,
    /// 3 inconsistent counts.
    pub fn exit_code(&self) -> i32 {
        match self {
            PhraseError::Io(_) => 1,
            PhraseError::MalformedAlignment { .. }
            | PhraseError::MalformedWeight { .. }
            | PhraseError::MalformedRecord { .. }
            | PhraseError::OutOfRange { .. }
            | PhraseError::CorpusLengthMismatch { .. } => 2,
            PhraseError::InconsistentCounts(_) => 3,
        }
    }

    /// Attach a 1-based corpus line number to a per-sentence error.
    pub(crate) fn at_line(self, line_no: usize) -> Self {
        match self {
            PhraseError::MalformedAlignment { token, .. } => {
                PhraseError::MalformedAlignment { token, line: line_no }
            }
            PhraseError::MalformedWeight { token, .. } => {
                PhraseError::MalformedWeight { token, line: line_no }
            }
            PhraseError::OutOfRange { index, len, .. } => {
                PhraseError::OutOfRange { index, len, line: line_no }
            }
            other => other,
        }
    }

    /// True for errors that `ErrorPolicy::Skip` may swallow.
    pub(crate) fn is_sentence_local(&self) -> bool {
        matches!(
            self,
            PhraseError::MalformedAlignment { .. }
                | PhraseError::MalformedWeight { .. }
                | PhraseError::OutOfRange { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_documented_mapping() {
        let io = PhraseError::Io(std::io::Error::new(std::io::ErrorKind::Other, "x"));
        assert_eq!(io.exit_code(), 1);
        let mal = PhraseError::MalformedAlignment { token: "a-b".into(), line: 3 };
        assert_eq!(mal.exit_code(), 2);
        let mismatch = PhraseError::CorpusLengthMismatch { line: 10 };
        assert_eq!(mismatch.exit_code(), 2);
        let incons = PhraseError::InconsistentCounts("c(t) = 0".into());
        assert_eq!(incons.exit_code(), 3);
    }

    #[test]
    fn at_line_rewrites_sentence_errors_only() {
        let e = PhraseError::OutOfRange { index: 7, len: 3, line: 0 }.at_line(42);
        match e {
            PhraseError::OutOfRange { line, .. } => assert_eq!(line, 42),
            other => panic!("unexpected variant: {other:?}"),
        }
        let e = PhraseError::CorpusLengthMismatch { line: 5 }.at_line(42);
        match e {
            PhraseError::CorpusLengthMismatch { line } => assert_eq!(line, 5),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
