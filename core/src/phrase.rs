// core/src/phrase.rs
//
// Projection of extracted rectangles onto token strings, plus the NULL
// pseudo-pairs for unaligned words.

use crate::alignment::{AlignPoint, Rect};
use std::collections::HashSet;

/// Sentinel reserved from the token vocabulary; unaligned words pair with it.
pub const NULL_TOKEN: &str = "NULL";

/// Whitespace tokenizer used for all corpus and phrase text.
pub fn tokenize(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// Join the tokens covered by one rectangle into a `(source, target)` pair.
pub fn phrase_pair(rect: &Rect, src_tokens: &[&str], tgt_tokens: &[&str]) -> (String, String) {
    (
        src_tokens[rect.src_min..=rect.src_max].join(" "),
        tgt_tokens[rect.tgt_min..=rect.tgt_max].join(" "),
    )
}

/// Project a rectangle set onto the two sentences, sorted for stable output.
pub fn materialize(
    rects: &HashSet<Rect>,
    src_tokens: &[&str],
    tgt_tokens: &[&str],
) -> Vec<(String, String)> {
    let mut sorted: Vec<&Rect> = rects.iter().collect();
    sorted.sort_unstable();
    sorted
        .into_iter()
        .map(|r| phrase_pair(r, src_tokens, tgt_tokens))
        .collect()
}

/// Pseudo-pairs for words no alignment point touches: `(word, NULL)` per
/// unaligned source index, `(NULL, word)` per unaligned target index.
pub fn null_pairs(
    alignment: &HashSet<AlignPoint>,
    src_tokens: &[&str],
    tgt_tokens: &[&str],
    null_token: &str,
) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (i, tok) in src_tokens.iter().enumerate() {
        if !alignment.iter().any(|&(a, _)| a == i) {
            pairs.push((tok.to_string(), null_token.to_string()));
        }
    }
    for (j, tok) in tgt_tokens.iter().enumerate() {
        if !alignment.iter().any(|&(_, b)| b == j) {
            pairs.push((null_token.to_string(), tok.to_string()));
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_rectangles;

    #[test]
    fn joins_spans_with_single_spaces() {
        let r = Rect::new(0, 1, 1, 2);
        let (s, t) = phrase_pair(&r, &["a", "b", "c"], &["x", "y", "z"]);
        assert_eq!(s, "a b");
        assert_eq!(t, "y z");
    }

    #[test]
    fn materializes_diagonal_extraction() {
        let alignment = [(0, 0), (1, 1)].into_iter().collect();
        let out = extract_rectangles(&alignment, 2, 2, 2);
        let pairs = materialize(&out.rects, &["a", "b"], &["x", "y"]);
        assert!(pairs.contains(&("a".into(), "x".into())));
        assert!(pairs.contains(&("b".into(), "y".into())));
        assert!(pairs.contains(&("a b".into(), "x y".into())));
    }

    #[test]
    fn null_pairs_cover_both_sides() {
        let alignment = [(0, 0)].into_iter().collect();
        let pairs = null_pairs(&alignment, &["a", "b"], &["x", "y", "z"], NULL_TOKEN);
        assert_eq!(
            pairs,
            vec![
                ("b".to_string(), "NULL".to_string()),
                ("NULL".to_string(), "y".to_string()),
                ("NULL".to_string(), "z".to_string()),
            ]
        );
    }

    #[test]
    fn fully_aligned_sentence_has_no_null_pairs() {
        let alignment = [(0, 0), (1, 1)].into_iter().collect();
        assert!(null_pairs(&alignment, &["a", "b"], &["x", "y"], NULL_TOKEN).is_empty());
    }
}
