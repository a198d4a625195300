use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

use crate::config::BuildConfig;
use crate::persona::format::{assemble, InstructFormat};
use crate::persona::profile::render_profile;
use crate::persona::prompt::PromptSelector;
use crate::persona::sampler::{sample_indices, seeded_rng};
use crate::source::{JsonlSource, PersonaSource};
use crate::types::{DatasetStats, PersonaRecord, TrainingExample};
use crate::writer::{self, WriteSummary};

/// Result of a completed build.
#[derive(Debug)]
pub struct BuildReport {
    pub source_rows: usize,
    pub stats: DatasetStats,
    pub output: WriteSummary,
}

/// Build the fine-tuning dataset described by `config`: open the source,
/// sample, convert, write, and report.
pub fn run(config: &BuildConfig) -> Result<BuildReport> {
    config.validate()?;

    info!(source = %config.source.display(), split = %config.split, "loading personas");
    let mut source = JsonlSource::open(&config.source, &config.split)
        .with_context(|| format!("opening persona source {}", config.source.display()))?;
    info!(
        records = source.len(),
        shards = source.shard_count(),
        "source indexed"
    );
    if source.is_empty() {
        warn!("persona source has no records");
    }

    let format = InstructFormat::default();
    let examples = build_examples(&mut source, config, format)?;

    info!(path = %config.output.display(), "writing examples");
    let output = writer::write_jsonl(&config.output, &examples)?;
    let stats = writer::compute_stats(&examples, format);

    eprintln!("\nDone!");
    writer::print_stats(&stats);
    writer::print_output(&config.output, &output);
    match examples.first() {
        Some(first) => writer::print_preview(first, config.preview_chars),
        None => warn!("no examples were produced; nothing to preview"),
    }

    Ok(BuildReport {
        source_rows: source.len(),
        stats,
        output,
    })
}

/// Sample records from `source` and turn each into a training example,
/// in sampled order. Any bad record aborts the whole build.
pub fn build_examples<S: PersonaSource + ?Sized>(
    source: &mut S,
    config: &BuildConfig,
    format: InstructFormat,
) -> Result<Vec<TrainingExample>> {
    let selector = PromptSelector::new()?;
    let mut rng = seeded_rng(config.seed);

    let indices = sample_indices(&mut rng, source.len(), config.sample_size);
    if indices.len() < config.sample_size {
        warn!(
            requested = config.sample_size,
            available = source.len(),
            "sample size exceeds source; using every record"
        );
    }
    info!(count = indices.len(), seed = config.seed, "sampled records");

    let total = indices.len();
    let mut examples = Vec::with_capacity(total);

    for (i, &idx) in indices.iter().enumerate() {
        let row = source.row(idx)?;
        let record =
            PersonaRecord::from_row(row).with_context(|| format!("source record {}", idx))?;

        let profile = render_profile(&record);
        let prompt = selector
            .select(&record, &mut rng)
            .with_context(|| format!("choosing prompt for record {}", idx))?;
        examples.push(assemble(format, &prompt.text, &profile));

        let done = i + 1;
        if progress_due(done, config.progress_interval) {
            info!("Processed {}/{}", done, total);
        }
    }

    Ok(examples)
}

/// Whether to log progress after `done` records. An interval of 0 never logs.
fn progress_due(done: usize, interval: usize) -> bool {
    interval > 0 && done % interval == 0
}

/// Render the profile of source row `index`, without sampling or prompts.
pub fn preview_record(source: &Path, split: &str, index: usize) -> Result<String> {
    let mut personas = JsonlSource::open(source, split)
        .with_context(|| format!("opening persona source {}", source.display()))?;
    let row = personas.row(index)?;
    let record =
        PersonaRecord::from_row(row).with_context(|| format!("source record {}", index))?;
    Ok(render_profile(&record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::format::is_consistent;
    use crate::persona::prompt::{PromptKind, CONDITIONAL_TEMPLATES, UNCONDITIONAL_PROMPTS};
    use crate::types::fixtures::reno_row;
    use crate::types::Row;
    use serde_json::json;
    use std::collections::HashSet;

    fn rows(n: usize) -> Vec<Row> {
        (0..n)
            .map(|i| {
                let mut row = reno_row();
                row.insert("persona".into(), json!(format!("persona #{}", i)));
                row.insert("age".into(), json!(20 + i));
                row
            })
            .collect()
    }

    fn write_source(path: &Path, rows: &[Row]) {
        let body: String = rows
            .iter()
            .map(|r| format!("{}\n", serde_json::to_string(r).unwrap()))
            .collect();
        std::fs::write(path, body).unwrap();
    }

    fn config(sample_size: usize) -> BuildConfig {
        BuildConfig {
            sample_size,
            progress_interval: 3,
            ..BuildConfig::default()
        }
    }

    #[test]
    fn test_oversized_sample_uses_every_record_once() {
        let mut source = rows(12);
        let examples = build_examples(&mut source, &config(50_000), InstructFormat::Mistral).unwrap();
        assert_eq!(examples.len(), 12);
        let personas: HashSet<_> = examples
            .iter()
            .map(|e| e.response().unwrap().to_string())
            .collect();
        assert_eq!(personas.len(), 12);
    }

    #[test]
    fn test_examples_are_consistent_and_prompts_known() {
        let mut source = rows(40);
        let examples = build_examples(&mut source, &config(30), InstructFormat::Mistral).unwrap();
        assert_eq!(examples.len(), 30);
        for example in &examples {
            assert!(is_consistent(InstructFormat::Mistral, example));
            let prompt = example.prompt().unwrap();
            if PromptKind::of(prompt) == PromptKind::Conditional {
                assert!(!prompt.contains('{'));
                let prefix_known = CONDITIONAL_TEMPLATES
                    .iter()
                    .any(|t| prompt.starts_with(&t[..10]));
                assert!(prefix_known, "unexpected prompt: {}", prompt);
            } else {
                assert!(UNCONDITIONAL_PROMPTS.iter().any(|p| *p == prompt));
            }
        }
    }

    #[test]
    fn test_same_seed_same_examples() {
        let a = build_examples(&mut rows(50), &config(20), InstructFormat::Mistral).unwrap();
        let b = build_examples(&mut rows(50), &config(20), InstructFormat::Mistral).unwrap();
        assert_eq!(a, b);

        let other = BuildConfig {
            seed: 7,
            ..config(20)
        };
        let c = build_examples(&mut rows(50), &other, InstructFormat::Mistral).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_missing_field_on_sampled_record_aborts() {
        let mut source = rows(3);
        source[1].remove("travel_persona");
        let err = build_examples(&mut source, &config(3), InstructFormat::Mistral).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("source record 1"));
        assert!(message.contains("travel_persona"));
    }

    #[test]
    fn test_empty_source_yields_nothing() {
        let mut source: Vec<Row> = Vec::new();
        let examples = build_examples(&mut source, &config(10), InstructFormat::Mistral).unwrap();
        assert!(examples.is_empty());
    }

    #[test]
    fn test_run_twice_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("personas.jsonl");
        write_source(&source_path, &rows(25));

        let build = |name: &str| {
            let config = BuildConfig {
                source: source_path.clone(),
                output: dir.path().join(name),
                ..config(10)
            };
            run(&config).unwrap()
        };
        let first = build("a.jsonl");
        let second = build("b.jsonl");

        assert_eq!(first.source_rows, 25);
        assert_eq!(first.stats.total_samples, 10);
        assert_eq!(first.output.sha256, second.output.sha256);
        assert_eq!(
            std::fs::read(dir.path().join("a.jsonl")).unwrap(),
            std::fs::read(dir.path().join("b.jsonl")).unwrap()
        );
    }

    #[test]
    fn test_record_error_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("personas.jsonl");
        let mut bad = rows(4);
        for row in &mut bad {
            row.remove("sex");
        }
        write_source(&source_path, &bad);

        let output = dir.path().join("out.jsonl");
        let config = BuildConfig {
            source: source_path,
            output: output.clone(),
            ..config(4)
        };
        assert!(run(&config).is_err());
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.jsonl");
        let config = BuildConfig {
            source: dir.path().join("absent.jsonl"),
            output: output.clone(),
            ..config(4)
        };
        assert!(run(&config).is_err());
        assert!(!output.exists());
    }

    #[test]
    fn test_progress_cadence() {
        let logged: Vec<_> = (1..=25).filter(|&done| progress_due(done, 10)).collect();
        assert_eq!(logged, vec![10, 20]);
        assert!((1..=25).all(|done| !progress_due(done, 0)));
        assert!(progress_due(1, 1));
    }

    #[test]
    fn test_preview_record_renders_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("personas.jsonl");
        write_source(&source_path, &rows(3));

        let profile = preview_record(&source_path, "train", 2).unwrap();
        assert!(profile.starts_with("## Demographics\nSex: female\nAge: 22\n"));
        assert!(profile.contains("## Personality\npersona #2\n"));
        assert!(!profile.contains("[INST]"));

        let err = preview_record(&source_path, "train", 3).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }
}
