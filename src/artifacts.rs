// Tabular artifacts: the CSV files each stage reads and writes.
//
// Writes go to a sibling temp file that is renamed over the target once
// complete, so a reader never sees a partial file. Stages with more than one
// output stage every file first and rename only once all of them are written.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Read every row of a CSV artifact. A missing or malformed file is an error.
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        anyhow::bail!("Input artifact not found: {}", path.display());
    }
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut rows = Vec::new();
    for (i, record) in reader.deserialize().enumerate() {
        // +2: one for the header, one for 1-based line numbers
        let row = record.with_context(|| format!("{}: bad row at line {}", path.display(), i + 2))?;
        rows.push(row);
    }
    debug!(rows = rows.len(), "Read {}", path.display());
    Ok(rows)
}

/// Write rows to a CSV artifact atomically, creating parent directories.
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    stage_rows(path, rows)?.publish()
}

/// A fully written temp file waiting to be renamed over its target.
/// Dropping it without publishing removes the temp file.
#[derive(Debug)]
pub struct StagedArtifact {
    tmp: PathBuf,
    target: PathBuf,
    rows: usize,
    published: bool,
}

impl StagedArtifact {
    /// Rename the temp file over the target.
    pub fn publish(mut self) -> Result<()> {
        fs::rename(&self.tmp, &self.target)
            .with_context(|| format!("Failed to move {} into place", self.target.display()))?;
        self.published = true;
        debug!(rows = self.rows, "Wrote {}", self.target.display());
        Ok(())
    }
}

impl Drop for StagedArtifact {
    fn drop(&mut self) {
        if !self.published {
            let _ = fs::remove_file(&self.tmp);
        }
    }
}

/// Write rows to the target's temp file without publishing them.
pub fn stage_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<StagedArtifact> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }

    let staged = StagedArtifact {
        tmp: temp_path(path),
        target: path.to_path_buf(),
        rows: rows.len(),
        published: false,
    };
    write_csv(&staged.tmp, rows)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(staged)
}

/// Publish staged artifacts in order. Every file was written before this is
/// called, so a serialization failure can no longer leave one output
/// published without the others.
pub fn publish_all(staged: Vec<StagedArtifact>) -> Result<()> {
    for artifact in staged {
        artifact.publish()?;
    }
    Ok(())
}

/// Count data rows without deserializing them (for status output).
pub fn count_rows(path: &Path) -> Result<usize> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut count = 0;
    for record in reader.records() {
        record.with_context(|| format!("Failed to read {}", path.display()))?;
        count += 1;
    }
    Ok(count)
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
