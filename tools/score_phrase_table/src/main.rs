//! Rewrite a base phrase table with translation scores.
//!
//! Each ` ||| ` record gains the four model scores and the constant phrase
//! penalty: `s ||| t ||| P(s|t) lex(s|t) P(t|s) lex(t|s) 2.718 ||| α ||| …`.
//! Phrase counters come either from a checkpoint written by
//! `extract_phrases --cache` or from a fresh pass over the corpus; the two
//! lexical tables are read from their directional files.

use anyhow::Result;
use clap::Parser;
use libphrase_core::{
    conditional_probabilities, extract_corpus_counts, score_table, Config, LexTable,
    PhraseCounts, PhraseError,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "score_phrase_table")]
#[command(about = "Augment a phrase table with translation probabilities and lexical weights")]
struct Opts {
    /// Base phrase table to score
    #[arg(short, long)]
    table: PathBuf,

    /// Word table P(target | source)
    #[arg(long)]
    f2e: PathBuf,

    /// Word table P(source | target)
    #[arg(long)]
    e2f: PathBuf,

    /// Counter checkpoint written by extract_phrases --cache
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Alignment file (when counting from the corpus instead of a cache)
    #[arg(long)]
    alignments: Option<PathBuf>,

    /// Sentences of language 1
    #[arg(long)]
    language1: Option<PathBuf>,

    /// Sentences of language 2
    #[arg(long)]
    language2: Option<PathBuf>,

    /// Optional file with one sentence weight per line
    #[arg(short, long)]
    weights: Option<PathBuf>,

    /// Maximum phrase length on either side
    #[arg(short, long)]
    max_length: Option<usize>,

    /// Optional TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path of the scored table
    #[arg(short, long)]
    output: PathBuf,
}

fn main() {
    let opts = Opts::parse();
    if let Err(e) = run(opts) {
        eprintln!("error: {:#}", e);
        std::process::exit(exit_code(&e));
    }
}

fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<PhraseError>()
        .map(|e| e.exit_code())
        .unwrap_or(1)
}

fn run(opts: Opts) -> Result<()> {
    let mut config = match &opts.config {
        Some(path) => Config::load_toml(path)
            .map_err(|e| anyhow::anyhow!("load config {}: {}", path.display(), e))?,
        None => Config::default(),
    };
    if let Some(max_length) = opts.max_length {
        config.max_phrase_length = max_length;
    }

    let counts = match (&opts.cache, &opts.alignments, &opts.language1, &opts.language2) {
        (Some(path), _, _, _) if path.exists() => {
            println!("reusing counters from {}", path.display());
            PhraseCounts::load_cache(path)?
        }
        (_, Some(alignments), Some(language1), Some(language2)) => {
            let (counts, summary) = extract_corpus_counts(
                alignments,
                language1,
                language2,
                opts.weights.as_deref(),
                &config,
            )?;
            println!(
                "{} sentence pairs, {} skipped, {} rectangles over the length bound",
                summary.sentences, summary.skipped, summary.filtered
            );
            if let Some(path) = &opts.cache {
                counts.save_cache(path)?;
                println!("checkpointed counters to {}", path.display());
            }
            counts
        }
        _ => anyhow::bail!(
            "need either an existing --cache or --alignments/--language1/--language2"
        ),
    };

    let probs = conditional_probabilities(&counts)?;
    let f2e = LexTable::load(&opts.f2e)?;
    let e2f = LexTable::load(&opts.e2f)?;

    let summary = score_table(
        &opts.table,
        &opts.output,
        &probs,
        &f2e,
        &e2f,
        &config.null_token,
    )?;

    println!(
        "scored {} records into {}",
        summary.records,
        opts.output.display()
    );
    if summary.unknown_lex > 0 {
        eprintln!(
            "warning: {} word pairs missing from the lexical tables were floored",
            summary.unknown_lex
        );
    }
    Ok(())
}
