// core/tests/pipeline_integration.rs
//
// Drives the whole pipeline over files on disk: corpus pass -> counters ->
// probabilities -> lexical tables -> scored phrase table -> phrase-pair
// extract -> coverage. The corpus is tiny and fully hand-checkable.

use libphrase_core::{
    conditional_probabilities, evaluate, extract_corpus_counts, joint_probabilities,
    phrase_probabilities, read_extract_pairs, read_phrase_extract, score_table,
    write_phrase_extract, Config, ErrorPolicy, LexTable, PhraseError, PhraseSet,
};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    fn new(tag: &str) -> Self {
        let stamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("libphrase_{}_{}", tag, stamp));
        fs::create_dir_all(&dir).expect("create test dir");
        Self { dir }
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.join(name);
        fs::write(&path, content).expect("write test file");
        path
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        fs::remove_dir_all(&self.dir).ok();
    }
}

// One two-word sentence plus four word translations chosen so that
// P_lex(x|a) = 1/2 and P_lex(y|b) = 1/4.
fn write_corpus(ws: &Workspace) -> (PathBuf, PathBuf, PathBuf) {
    let alignments = ws.write("corpus.align", "0-0 1-1\n0-0\n0-0\n0-0\n0-0\n");
    let language1 = ws.write("corpus.l1", "a b\na\nb\nb\nb\n");
    let language2 = ws.write("corpus.l2", "x y\nq\nr\ns\nt\n");
    (alignments, language1, language2)
}

#[test]
fn counters_probabilities_and_scored_table() {
    let ws = Workspace::new("pipeline");
    let (alignments, language1, language2) = write_corpus(&ws);
    let config = Config::default();

    let (counts, summary) =
        extract_corpus_counts(&alignments, &language1, &language2, None, &config).unwrap();
    assert_eq!(summary.sentences, 5);
    assert_eq!(summary.skipped, 0);

    // hand-checked counters
    assert_eq!(counts.pair[&("a b".into(), "x y".into())], 1.0);
    assert_eq!(counts.source["a"], 2.0);
    assert_eq!(counts.source["b"], 4.0);
    assert_eq!(counts.lex_pair[&("b".into(), "y".into())], 1.0);
    assert_eq!(counts.lex_source["b"], 4.0);

    let probs = conditional_probabilities(&counts).unwrap();

    // P(.|s) is a distribution for every source phrase
    let mut per_source: HashMap<&str, f64> = HashMap::new();
    for ((s, _), p) in probs.tgt_given_src.iter() {
        *per_source.entry(s.as_str()).or_default() += p;
    }
    for (s, sum) in &per_source {
        assert!((sum - 1.0).abs() < 1e-9, "P(.|{}) sums to {}", s, sum);
    }

    // multiplying back by the single-side counts recovers the counter
    for (pair, &freq) in counts.pair.iter() {
        let via_src = probs.tgt_given_src[pair] * counts.source[&pair.0];
        let via_tgt = probs.src_given_tgt[pair] * counts.target[&pair.1];
        assert!((via_src - freq).abs() < 1e-9);
        assert!((via_tgt - freq).abs() < 1e-9);
    }

    // lexical tables derived from the word-level counters
    let f2e = LexTable::target_given_source(&counts).unwrap();
    let e2f = LexTable::source_given_target(&counts).unwrap();
    assert!((f2e.prob("a", "x").unwrap() - 0.5).abs() < 1e-12);
    assert!((f2e.prob("b", "y").unwrap() - 0.25).abs() < 1e-12);

    // score a base table carrying an internal alignment and a trailing field
    let base = ws.write("base.table", "a b ||| x y ||| 0.9 ||| 0-0 1-1 ||| extra\n");
    let scored = ws.path("scored.table");
    let score_summary =
        score_table(&base, &scored, &probs, &f2e, &e2f, &config.null_token).unwrap();
    assert_eq!(score_summary.records, 1);
    assert_eq!(score_summary.unknown_lex, 0);

    // lex(t|s) = P(x|a) * P(y|b) = 0.5 * 0.25; both conditionals are 1
    let line = fs::read_to_string(&scored).unwrap();
    assert_eq!(
        line.trim_end(),
        "a b ||| x y ||| 1 1 1 0.125 2.718 ||| 0-0 1-1 ||| extra"
    );
}

#[test]
fn extract_file_feeds_coverage() {
    let ws = Workspace::new("coverage");
    let (alignments, language1, language2) = write_corpus(&ws);
    let config = Config::default();

    let (counts, _) =
        extract_corpus_counts(&alignments, &language1, &language2, None, &config).unwrap();
    let probs = conditional_probabilities(&counts).unwrap();
    let marginal = phrase_probabilities(&counts.target).unwrap();
    let joint = joint_probabilities(&probs.src_given_tgt, &marginal).unwrap();

    let extract = ws.path("train.extract");
    let written = write_phrase_extract(&extract, &joint, &probs).unwrap();
    assert_eq!(written, counts.pair.len());

    // records round-trip with their probabilities
    for (pair, joint_p, p_s_t, p_t_s) in read_phrase_extract(&extract).unwrap() {
        assert!((joint_p - joint[&pair]).abs() < 1e-12);
        assert!((p_s_t - probs.src_given_tgt[&pair]).abs() < 1e-12);
        assert!((p_t_s - probs.tgt_given_src[&pair]).abs() < 1e-12);
    }

    let training = read_extract_pairs(&extract).unwrap();
    let set = PhraseSet::from_pairs(training.clone()).unwrap();

    // every training pair is reachable without concatenation
    let reflexive = evaluate(&set, &training, 0);
    assert_eq!(reflexive.reachable, reflexive.total);
    assert!((reflexive.coverage() - 1.0).abs() < 1e-12);

    // "a b" / "y x" needs one concatenation and a target reorder:
    // ("a","x") and ("b","y") are both training pairs
    let held_out = vec![
        ("a b".to_string(), "x y".to_string()),
        ("a b".to_string(), "y x".to_string()),
        ("a q".to_string(), "x y".to_string()),
    ];
    assert_eq!(evaluate(&set, &held_out, 0).reachable, 1);
    assert_eq!(evaluate(&set, &held_out, 1).reachable, 2);
}

#[test]
fn sentence_weights_scale_the_counters() {
    let ws = Workspace::new("weights");
    let alignments = ws.write("w.align", "0-0\n0-0\n");
    let language1 = ws.write("w.l1", "a\na\n");
    let language2 = ws.write("w.l2", "x\nx\n");
    let weights = ws.write("w.weights", "0.5\n0.25\n");

    let (counts, _) = extract_corpus_counts(
        &alignments,
        &language1,
        &language2,
        Some(&weights),
        &Config::default(),
    )
    .unwrap();
    assert!((counts.pair[&("a".into(), "x".into())] - 0.75).abs() < 1e-12);
    assert!((counts.lex_source["a"] - 0.75).abs() < 1e-12);
}

#[test]
fn corpus_length_mismatch_is_fatal() {
    let ws = Workspace::new("mismatch");
    let alignments = ws.write("m.align", "0-0\n0-0\n");
    let language1 = ws.write("m.l1", "a\na\n");
    let language2 = ws.write("m.l2", "x\n");

    let err = extract_corpus_counts(&alignments, &language1, &language2, None, &Config::default())
        .unwrap_err();
    assert!(matches!(err, PhraseError::CorpusLengthMismatch { line: 2 }));
}

#[test]
fn skip_policy_drops_bad_sentences_and_counts_them() {
    let ws = Workspace::new("skip");
    let alignments = ws.write("s.align", "0-0\nbroken\n0-0\n");
    let language1 = ws.write("s.l1", "a\nb\nc\n");
    let language2 = ws.write("s.l2", "x\ny\nz\n");

    let mut config = Config::default();
    config.on_bad_sentence = ErrorPolicy::Skip;
    let (counts, summary) =
        extract_corpus_counts(&alignments, &language1, &language2, None, &config).unwrap();
    assert_eq!(summary.sentences, 2);
    assert_eq!(summary.skipped, 1);
    assert!(counts.pair.contains_key(&("c".into(), "z".into())));
    assert!(!counts.pair.contains_key(&("b".into(), "y".into())));

    // the default policy aborts on the same corpus, reporting the line
    let err = extract_corpus_counts(
        &alignments,
        &language1,
        &language2,
        None,
        &Config::default(),
    )
    .unwrap_err();
    assert!(matches!(err, PhraseError::MalformedAlignment { line: 2, .. }));
}
