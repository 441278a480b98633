//! Measure how much of a held-out phrase table a training table covers.
//!
//! Both inputs are phrase-pair extract files written by `extract_phrases`.
//! For each requested concatenation bound, every held-out pair is tested
//! for reachability: can it be rebuilt from training pairs, cutting the
//! source in order and the target in any order?

use anyhow::Result;
use clap::Parser;
use libphrase_core::{evaluate, read_extract_pairs, PhraseError, PhraseSet};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "phrase_coverage")]
#[command(about = "Held-out coverage of a training phrase table")]
struct Opts {
    /// Training phrase-pair extract
    #[arg(short, long)]
    table: PathBuf,

    /// Held-out phrase-pair extract
    #[arg(long)]
    held_out: PathBuf,

    /// Comma-separated concatenation bounds, e.g. 0,1,3
    #[arg(short, long, value_delimiter = ',', required = true)]
    max_concat: Vec<usize>,
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
    let training = read_extract_pairs(&opts.table)?;
    println!("{} training pairs from {}", training.len(), opts.table.display());
    let set = PhraseSet::from_pairs(training)?;

    let held_out = read_extract_pairs(&opts.held_out)?;
    println!("{} held-out pairs from {}", held_out.len(), opts.held_out.display());

    for &bound in &opts.max_concat {
        let report = evaluate(&set, &held_out, bound);
        println!(
            "max_concat {}: {}/{} reachable, coverage {:.4}",
            report.max_concat,
            report.reachable,
            report.total,
            report.coverage()
        );
    }
    Ok(())
}
