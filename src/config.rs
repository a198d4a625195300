use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default local copy of the persona dataset
const DEFAULT_SOURCE: &str = "Nemotron-Personas-USA";

/// Default output file, ready for SFT trainers that read `text` or `messages`
const DEFAULT_OUTPUT: &str = "inception_personas_train.jsonl";

/// Everything one dataset build needs. Fields missing from a YAML file
/// keep their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// JSONL file, or directory of JSONL shards
    pub source: PathBuf,
    /// Shard-name prefix selected inside a directory source
    pub split: String,
    /// Requested number of examples; clamped to the source size
    pub sample_size: usize,
    pub seed: u64,
    pub output: PathBuf,
    /// Log progress every N records (0 disables)
    pub progress_interval: usize,
    /// Characters of the first example shown after the run
    pub preview_chars: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from(DEFAULT_SOURCE),
            split: "train".to_string(),
            sample_size: 50_000,
            seed: 42,
            output: PathBuf::from(DEFAULT_OUTPUT),
            progress_interval: 10_000,
            preview_chars: 2000,
        }
    }
}

impl BuildConfig {
    /// Load a YAML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty file is a valid "all defaults" config.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: BuildConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.split.trim().is_empty() {
            anyhow::bail!("split name must not be empty");
        }
        if self.output.as_os_str().is_empty() {
            anyhow::bail!("output path must not be empty");
        }
        if self.output.is_dir() {
            anyhow::bail!("output path is a directory: {}", self.output.display());
        }
        Ok(())
    }
}
