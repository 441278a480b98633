//! Phrase-table records and the phrase-pair extract format.
//!
//! A base table record is ` ||| `-delimited: source phrase, target phrase,
//! an unused score column, the internal word alignment in `i-j` syntax, and
//! any trailing fields, which are preserved verbatim. Scoring rewrites each
//! record with the four model scores and the constant phrase penalty
//! inserted. The phrase-pair extract is the simple-writer output: one JSON
//! array `[["s","t"], joint, P(s|t), P(t|s)]` per line.

use crate::alignment::{format_alignments, parse_alignments, AlignPoint};
use crate::error::{PhraseError, Result};
use crate::phrase::tokenize;
use crate::probs::{lexical_weights, ConditionalProbs, LexTable, PhrasePair};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Field delimiter of phrase-table records.
pub const FIELD_SEP: &str = " ||| ";

/// Constant phrase-penalty column expected by downstream decoders.
pub const PHRASE_PENALTY: f64 = 2.718;

/// One parsed base-table record.
#[derive(Debug, Clone)]
pub struct TableRecord {
    pub source: String,
    pub target: String,
    /// Internal word alignment over the pair's own token positions.
    pub alignment: HashSet<AlignPoint>,
    /// Fields after the alignment, kept untouched.
    pub trailing: Vec<String>,
}

/// Parse one ` ||| ` record: `s ||| t ||| <ignored> ||| α [||| …]`.
pub fn parse_record(line: &str, line_no: usize) -> Result<TableRecord> {
    let fields: Vec<&str> = line.split(FIELD_SEP).collect();
    if fields.len() < 4 {
        return Err(PhraseError::MalformedRecord { what: "phrase table", line: line_no });
    }
    let alignment = parse_alignments(fields[3]).map_err(|e| e.at_line(line_no))?;
    Ok(TableRecord {
        source: fields[0].trim().to_string(),
        target: fields[1].trim().to_string(),
        alignment,
        trailing: fields[4..].iter().map(|f| f.to_string()).collect(),
    })
}

/// Tally of one scoring pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreSummary {
    /// Records rewritten.
    pub records: usize,
    /// Word pairs floored because a lexical table did not know them.
    pub unknown_lex: usize,
}

/// Rewrite a base phrase table with the four scores and the penalty column.
///
/// Output layout per record:
/// `s ||| t ||| P(s|t) lex(s|t) P(t|s) lex(t|s) 2.718 ||| α ||| trailing…`
///
/// Every record's pair must be present in the conditional maps; a pair the
/// counters never saw means a zero single-side count and aborts with
/// `InconsistentCounts`. Blank input lines are dropped.
pub fn score_table(
    input: &Path,
    output: &Path,
    probs: &ConditionalProbs,
    f2e: &LexTable,
    e2f: &LexTable,
    null_token: &str,
) -> Result<ScoreSummary> {
    let reader = BufReader::new(File::open(input)?);
    let mut writer = BufWriter::new(File::create(output)?);
    let mut summary = ScoreSummary::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = parse_record(&line, idx + 1)?;
        let pair = (record.source.clone(), record.target.clone());
        let p_s_t = lookup(&probs.src_given_tgt, &pair)?;
        let p_t_s = lookup(&probs.tgt_given_src, &pair)?;

        let src_tokens = tokenize(&record.source);
        let tgt_tokens = tokenize(&record.target);
        let lex = lexical_weights(
            &src_tokens,
            &tgt_tokens,
            &record.alignment,
            f2e,
            e2f,
            null_token,
        )?;
        summary.unknown_lex += lex.unknown;

        let scores = format!(
            "{} {} {} {} {}",
            p_s_t, lex.src_given_tgt, p_t_s, lex.tgt_given_src, PHRASE_PENALTY
        );
        write!(
            writer,
            "{src}{sep}{tgt}{sep}{scores}{sep}{align}",
            src = record.source,
            tgt = record.target,
            align = format_alignments(&record.alignment),
            sep = FIELD_SEP,
        )?;
        for field in &record.trailing {
            write!(writer, "{}{}", FIELD_SEP, field)?;
        }
        writeln!(writer)?;
        summary.records += 1;
    }

    Ok(summary)
}

fn lookup(map: &AHashMap<PhrasePair, f64>, pair: &PhrasePair) -> Result<f64> {
    map.get(pair).copied().ok_or_else(|| {
        PhraseError::InconsistentCounts(format!(
            "phrase pair ('{}', '{}') was never counted",
            pair.0, pair.1
        ))
    })
}

// Serialized as a JSON array, one record per line.
#[derive(Debug, Serialize, Deserialize)]
struct ExtractRecord(PhrasePair, f64, f64, f64);

/// Write the phrase-pair extract: `((s,t), joint, P(s|t), P(t|s))` records,
/// sorted by pair. Returns the number of records written.
pub fn write_phrase_extract(
    path: &Path,
    joint: &AHashMap<PhrasePair, f64>,
    probs: &ConditionalProbs,
) -> Result<usize> {
    let mut writer = BufWriter::new(File::create(path)?);
    let mut pairs: Vec<&PhrasePair> = joint.keys().collect();
    pairs.sort();

    for pair in &pairs {
        let record = ExtractRecord(
            (*pair).clone(),
            joint[*pair],
            lookup(&probs.src_given_tgt, pair)?,
            lookup(&probs.tgt_given_src, pair)?,
        );
        let line = serde_json::to_string(&record)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        writeln!(writer, "{}", line)?;
    }
    Ok(pairs.len())
}

/// Read a phrase-pair extract back as full records.
pub fn read_phrase_extract(path: &Path) -> Result<Vec<(PhrasePair, f64, f64, f64)>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let rec: ExtractRecord = serde_json::from_str(&line).map_err(|_| {
            PhraseError::MalformedRecord { what: "phrase extract", line: idx + 1 }
        })?;
        records.push((rec.0, rec.1, rec.2, rec.3));
    }
    Ok(records)
}

/// Read only the phrase pairs of an extract, the coverage evaluator's view.
pub fn read_extract_pairs(path: &Path) -> Result<Vec<PhrasePair>> {
    Ok(read_phrase_extract(path)?.into_iter().map(|r| r.0).collect())
}
