use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tracing::warn;

use crate::persona::format::{is_consistent, InstructFormat};
use crate::persona::prompt::PromptKind;
use crate::types::{DatasetStats, TrainingExample};

/// What ended up on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub lines: usize,
    pub bytes: u64,
    /// Hex SHA-256 of the file contents
    pub sha256: String,
}

/// Write examples as JSONL, one object per line, in order.
/// Each line is serialized in full and handed to the OS in a single write,
/// so an interrupted run leaves only complete lines behind.
pub fn write_jsonl(path: &Path, examples: &[TrainingExample]) -> Result<WriteSummary> {
    let mut file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut bytes: u64 = 0;

    for (i, example) in examples.iter().enumerate() {
        let mut line = serde_json::to_string(example)
            .with_context(|| format!("serializing example {}", i))?;
        line.push('\n');
        file.write_all(line.as_bytes())
            .with_context(|| format!("writing line {} of {}", i + 1, path.display()))?;
        hasher.update(line.as_bytes());
        bytes += line.len() as u64;
    }

    file.sync_all()
        .with_context(|| format!("flushing {}", path.display()))?;

    Ok(WriteSummary {
        lines: examples.len(),
        bytes,
        sha256: hex::encode(hasher.finalize()),
    })
}

/// Read a JSONL file of training examples, skipping blank lines.
pub fn load_jsonl(path: &Path) -> Result<Vec<TrainingExample>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut examples = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let example: TrainingExample = serde_json::from_str(&line)
            .with_context(|| format!("parsing {}:{}", path.display(), i + 1))?;
        examples.push(example);
    }

    Ok(examples)
}

/// Compute dataset statistics. Lengths are counted in characters.
pub fn compute_stats(examples: &[TrainingExample], format: InstructFormat) -> DatasetStats {
    if examples.is_empty() {
        return DatasetStats::default();
    }

    let mut stats = DatasetStats {
        total_samples: examples.len(),
        min_text_chars: usize::MAX,
        ..DatasetStats::default()
    };
    let mut total_chars: usize = 0;

    for example in examples {
        let len = example.text.chars().count();
        total_chars += len;
        stats.min_text_chars = stats.min_text_chars.min(len);
        stats.max_text_chars = stats.max_text_chars.max(len);

        match example.prompt().map(PromptKind::of) {
            Some(PromptKind::Unconditional) => stats.unconditional_prompts += 1,
            Some(PromptKind::Conditional) => stats.conditional_prompts += 1,
            None => {}
        }
        if !is_consistent(format, example) {
            stats.inconsistent += 1;
        }
    }

    stats.avg_text_chars = total_chars as f64 / examples.len() as f64;
    stats
}

/// Print dataset statistics to stderr.
pub fn print_stats(stats: &DatasetStats) {
    eprint!("{}", format_stats(stats));
    if stats.inconsistent > 0 {
        warn!(
            count = stats.inconsistent,
            "examples disagree between text and messages"
        );
    }
}

/// The statistics banner printed after a build and by the stats command.
pub fn format_stats(stats: &DatasetStats) -> String {
    let mut out = String::from("\n=== Dataset Statistics ===\n");
    out.push_str(&format!("Examples: {}\n", stats.total_samples));
    out.push_str(&format!(
        "Avg length: {:.0} chars (~{:.0} tokens)\n",
        stats.avg_text_chars,
        stats.avg_text_chars / 4.0
    ));
    out.push_str(&format!(
        "Length range: {} - {} chars\n",
        stats.min_text_chars, stats.max_text_chars
    ));
    out.push_str(&format!(
        "Prompts: {} unconditional, {} conditional\n",
        stats.unconditional_prompts, stats.conditional_prompts
    ));
    out.push_str(&format!(
        "Inconsistent (text vs messages): {}\n",
        stats.inconsistent
    ));
    out.push_str("==========================\n\n");
    out
}

/// Print where the output went and its digest.
pub fn print_output(path: &Path, summary: &WriteSummary) {
    eprintln!("Output: {}", path.display());
    eprintln!("  {} lines, {} bytes", summary.lines, summary.bytes);
    eprintln!("  sha256: {}", summary.sha256);
}

/// Print the start of the first example, cut at `max_chars` characters.
pub fn print_preview(example: &TrainingExample, max_chars: usize) {
    let banner = "=".repeat(60);
    eprintln!("\n{}", banner);
    eprintln!("SAMPLE OUTPUT:");
    eprintln!("{}", banner);
    eprintln!("{}", truncate_chars(&example.text, max_chars));
    eprintln!("...");
}

/// The first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Print statistics for an existing JSONL output file (for the stats command).
pub fn print_file_stats(path: &Path) -> Result<()> {
    let examples = load_jsonl(path)?;
    let stats = compute_stats(&examples, InstructFormat::default());
    print_stats(&stats);
    Ok(())
}
