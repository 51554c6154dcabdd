//! On-disk stores for pipeline artifacts
//!
//! PR records live in an append-only JSONL file written one line at a time;
//! patterns and scored patterns are JSON arrays written once per run.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::{PrRecord, RemedyError, Result};

/// JSONL store of PR records
#[derive(Debug, Clone)]
pub struct PrStore {
    path: PathBuf,
}

impl PrStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the store for a fresh collection run, truncating old contents
    pub async fn create(&self) -> Result<PrWriter> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .await?;

        debug!("Opened record store {:?}", self.path);
        Ok(PrWriter {
            file,
            path: self.path.clone(),
            written: 0,
        })
    }

    /// Load every record; a missing file is an empty store
    pub async fn load(&self) -> Result<Vec<PrRecord>> {
        if !self.path.exists() {
            warn!("Record store not found: {:?}", self.path);
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).await?;
        let records = parse_records(&content)?;

        info!("Loaded {} PRs from {:?}", records.len(), self.path);
        Ok(records)
    }
}

fn parse_records(content: &str) -> Result<Vec<PrRecord>> {
    let mut records = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let record = serde_json::from_str::<PrRecord>(line).map_err(|e| {
            RemedyError::MalformedRecord {
                line: idx + 1,
                message: e.to_string(),
            }
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Appends records to an open store, flushing after every line
pub struct PrWriter {
    file: fs::File,
    path: PathBuf,
    written: usize,
}

impl PrWriter {
    pub async fn append(&mut self, record: &PrRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        self.file.write_all(line.as_bytes()).await?;
        self.file.flush().await?;
        self.written += 1;

        debug!("Stored {} to {:?}", record.pr_id(), self.path);
        Ok(())
    }

    /// Records appended through this writer
    pub fn written(&self) -> usize {
        self.written
    }
}

/// Write a JSON array, replacing whatever was there
pub async fn write_json_array<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    let content = serde_json::to_string_pretty(items)?;
    fs::write(path, content).await?;

    info!("Wrote {} items to {:?}", items.len(), path);
    Ok(())
}

/// Read a JSON array; a missing file is an empty array
pub async fn read_json_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        warn!("File not found: {:?}", path);
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path).await?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    Ok(serde_json::from_str(&content)?)
}
