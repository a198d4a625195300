use anyhow::{Context, Result};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::types::Row;

/// Indexed, read-only access to persona rows.
pub trait PersonaSource {
    /// Number of rows in the collection.
    fn len(&self) -> usize;

    /// Fetch row `index` as a field mapping.
    fn row(&mut self, index: usize) -> Result<Row>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Location of one row: which shard, where the line starts, and its 1-based
/// line number for error messages.
#[derive(Debug, Clone, Copy)]
struct RowRef {
    shard: usize,
    offset: u64,
    line: usize,
}

struct Shard {
    path: PathBuf,
    reader: BufReader<File>,
}

/// A JSONL file, or a directory of JSONL shards, read lazily.
/// Opening indexes the byte offset of every non-blank line; rows are only
/// parsed when fetched.
pub struct JsonlSource {
    shards: Vec<Shard>,
    rows: Vec<RowRef>,
}

impl JsonlSource {
    /// Open `path`. A directory is searched recursively (following symlinks)
    /// for `*.jsonl` files whose name starts with `split`; a file is used
    /// as-is. Any entry that cannot be walked fails the open.
    pub fn open(path: &Path, split: &str) -> Result<Self> {
        let paths = shard_paths(path, split)?;
        let mut shards = Vec::with_capacity(paths.len());
        let mut rows = Vec::new();

        for (shard_idx, shard_path) in paths.into_iter().enumerate() {
            let file = File::open(&shard_path)
                .with_context(|| format!("opening {}", shard_path.display()))?;
            let mut reader = BufReader::new(file);
            let before = rows.len();
            index_lines(&mut reader, shard_idx, &mut rows)
                .with_context(|| format!("indexing {}", shard_path.display()))?;
            debug!(
                shard = %shard_path.display(),
                rows = rows.len() - before,
                "indexed shard"
            );
            shards.push(Shard {
                path: shard_path,
                reader,
            });
        }

        Ok(Self { shards, rows })
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}

impl PersonaSource for JsonlSource {
    fn len(&self) -> usize {
        self.rows.len()
    }

    fn row(&mut self, index: usize) -> Result<Row> {
        let row_ref = *self
            .rows
            .get(index)
            .with_context(|| format!("row {} out of range ({} rows)", index, self.rows.len()))?;
        let shard = &mut self.shards[row_ref.shard];
        let location = format!("{}:{}", shard.path.display(), row_ref.line);

        shard
            .reader
            .seek(SeekFrom::Start(row_ref.offset))
            .with_context(|| format!("seeking to {}", location))?;
        let mut line = String::new();
        shard
            .reader
            .read_line(&mut line)
            .with_context(|| format!("reading {}", location))?;

        match serde_json::from_str::<Value>(&line)
            .with_context(|| format!("parsing JSON at {}", location))?
        {
            Value::Object(map) => Ok(map),
            other => anyhow::bail!(
                "expected a JSON object at {}, found {}",
                location,
                json_kind(&other)
            ),
        }
    }
}

/// Resolve the shard files for a source path, sorted for a stable row order.
fn shard_paths(path: &Path, split: &str) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        anyhow::bail!("persona source not found: {}", path.display());
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(path).follow_links(true) {
        let entry = entry.with_context(|| format!("walking {}", path.display()))?;
        let is_shard = entry.file_type().is_file()
            && entry.path().extension().map_or(false, |ext| ext == "jsonl")
            && entry
                .file_name()
                .to_str()
                .map_or(false, |n| n.starts_with(split));
        if is_shard {
            paths.push(entry.into_path());
        }
    }
    paths.sort();

    if paths.is_empty() {
        anyhow::bail!(
            "no '{}' JSONL shards found under {}",
            split,
            path.display()
        );
    }
    Ok(paths)
}

/// Record the start offset of every non-blank line.
fn index_lines<R: BufRead>(reader: &mut R, shard: usize, rows: &mut Vec<RowRef>) -> Result<()> {
    let mut offset: u64 = 0;
    let mut line_no = 0;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf)?;
        if read == 0 {
            break;
        }
        line_no += 1;
        if !buf.iter().all(u8::is_ascii_whitespace) {
            rows.push(RowRef {
                shard,
                offset,
                line: line_no,
            });
        }
        offset += read as u64;
    }

    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
impl PersonaSource for Vec<Row> {
    fn len(&self) -> usize {
        <[Row]>::len(self)
    }

    fn row(&mut self, index: usize) -> Result<Row> {
        self.get(index)
            .cloned()
            .with_context(|| format!("row {} out of range", index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_single_file_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("personas.jsonl");
        fs::write(&path, "{\"n\":0}\n\n  \n{\"n\":1}\n{\"n\":\"é\"}").unwrap();

        let mut source = JsonlSource::open(&path, "ignored").unwrap();
        assert_eq!(source.len(), 3);
        assert_eq!(source.row(1).unwrap()["n"], 1);
        assert_eq!(source.row(2).unwrap()["n"], "é");
        assert_eq!(source.row(0).unwrap()["n"], 0);
        assert!(source.row(3).is_err());
    }

    #[test]
    fn test_directory_shards_by_split() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        fs::create_dir(&data).unwrap();
        fs::write(data.join("train-00001.jsonl"), "{\"n\":2}\n").unwrap();
        fs::write(data.join("train-00000.jsonl"), "{\"n\":0}\n{\"n\":1}\n").unwrap();
        fs::write(data.join("test-00000.jsonl"), "{\"n\":99}\n").unwrap();
        fs::write(data.join("train-notes.txt"), "not data\n").unwrap();

        let mut source = JsonlSource::open(dir.path(), "train").unwrap();
        assert_eq!(source.shard_count(), 2);
        assert_eq!(source.len(), 3);
        let values: Vec<_> = (0..3).map(|i| source.row(i).unwrap()["n"].clone()).collect();
        assert_eq!(values, vec![0, 1, 2]);
    }

    #[test]
    fn test_missing_source_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(JsonlSource::open(&dir.path().join("nope"), "train").is_err());
        assert!(JsonlSource::open(dir.path(), "train").is_err());
    }

    #[test]
    fn test_bad_rows_report_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.jsonl");
        fs::write(&path, "{\"ok\":true}\n[1,2]\n{broken\n").unwrap();

        let mut source = JsonlSource::open(&path, "train").unwrap();
        assert!(source.row(0).is_ok());
        let err = source.row(1).unwrap_err().to_string();
        assert!(err.contains("train.jsonl:2") && err.contains("an array"));
        let err = format!("{:#}", source.row(2).unwrap_err());
        assert!(err.contains("train.jsonl:3"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unwalkable_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        fs::create_dir(&data).unwrap();
        fs::write(data.join("train-00000.jsonl"), "{\"n\":0}\n").unwrap();
        std::os::unix::fs::symlink(dir.path(), data.join("loop")).unwrap();

        let err = JsonlSource::open(dir.path(), "train").err().unwrap();
        assert!(format!("{:#}", err).contains("walking"));
    }
}
