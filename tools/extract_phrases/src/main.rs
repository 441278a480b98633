//! Extract phrase pairs from a word-aligned parallel corpus.
//!
//! Runs the streaming counter pass, derives the probability models, and
//! writes three files under the output prefix:
//! - `<prefix>.extract`: phrase-pair records `((s,t), joint, P(s|t), P(t|s))`
//! - `<prefix>.f2e`: word table P(target | source)
//! - `<prefix>.e2f`: word table P(source | target)
//!
//! With `--cache`, counters checkpoint to disk after the pass and a later
//! run reuses them instead of re-reading the corpus.

use anyhow::Result;
use clap::Parser;
use libphrase_core::{
    conditional_probabilities, extract_corpus_counts, joint_probabilities, phrase_probabilities,
    write_phrase_extract, Config, LexTable, PhraseCounts, PhraseError,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "extract_phrases")]
#[command(about = "Extract a phrase translation table from word alignments")]
struct Opts {
    /// File containing one word alignment per sentence pair
    #[arg(short, long)]
    alignments: PathBuf,

    /// File containing sentences of language 1 (source side)
    #[arg(long)]
    language1: PathBuf,

    /// File containing sentences of language 2 (target side)
    #[arg(long)]
    language2: PathBuf,

    /// Maximum phrase length on either side (overrides the config file)
    #[arg(short, long)]
    max_length: Option<usize>,

    /// Optional file with one sentence weight per line
    #[arg(short, long)]
    weights: Option<PathBuf>,

    /// Counter checkpoint: reused when present, written after the pass
    #[arg(long)]
    cache: Option<PathBuf>,

    /// Optional TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output prefix for .extract / .f2e / .e2f
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

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{}.{}", prefix.display(), suffix))
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

    let counts = match &opts.cache {
        Some(path) if path.exists() => {
            println!("reusing counters from {}", path.display());
            PhraseCounts::load_cache(path)?
        }
        cache => {
            let (counts, summary) = extract_corpus_counts(
                &opts.alignments,
                &opts.language1,
                &opts.language2,
                opts.weights.as_deref(),
                &config,
            )?;
            println!(
                "{} sentence pairs, {} skipped, {} rectangles over the length bound",
                summary.sentences, summary.skipped, summary.filtered
            );
            if let Some(path) = cache {
                counts.save_cache(path)?;
                println!("checkpointed counters to {}", path.display());
            }
            counts
        }
    };

    let probs = conditional_probabilities(&counts)?;
    let marginal = phrase_probabilities(&counts.target)?;
    let joint = joint_probabilities(&probs.src_given_tgt, &marginal)?;

    let extract_path = with_suffix(&opts.output, "extract");
    let written = write_phrase_extract(&extract_path, &joint, &probs)?;

    let f2e = LexTable::target_given_source(&counts)?;
    let e2f = LexTable::source_given_target(&counts)?;
    let f2e_path = with_suffix(&opts.output, "f2e");
    let e2f_path = with_suffix(&opts.output, "e2f");
    f2e.save(&f2e_path)?;
    e2f.save(&e2f_path)?;

    println!("wrote {} phrase pairs to {}", written, extract_path.display());
    println!(
        "wrote {} + {} word entries to {} and {}",
        f2e.len(),
        e2f.len(),
        f2e_path.display(),
        e2f_path.display()
    );
    Ok(())
}
