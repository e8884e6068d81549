//! JSON-lines persistence of labelled sighting rows.

use crate::memory::{RunSightings, SightingDb};
use gossipsim_core::{SightingRecord, SinkError};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// One persisted line: a sighting row tagged with its run label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSighting {
    pub label: String,
    #[serde(flatten)]
    pub record: SightingRecord,
}

fn persistence_error(err: impl std::fmt::Display) -> SinkError {
    SinkError::Persistence(err.to_string())
}

impl SightingDb {
    /// Restore a store from JSON lines. Blank lines are skipped.
    pub fn from_jsonl(reader: impl BufRead) -> Result<Self, SinkError> {
        let db = SightingDb::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(persistence_error)?;
            if line.trim().is_empty() {
                continue;
            }
            let row: PersistedSighting = serde_json::from_str(&line)
                .map_err(|e| persistence_error(format!("line {}: {}", index + 1, e)))?;
            db.store_for(&row.label).restore(row.record)?;
        }
        Ok(db)
    }

    /// Restore a store from a file, or start empty if it does not exist yet.
    pub fn open_file(path: &Path) -> Result<Self, SinkError> {
        if !path.exists() {
            return Ok(SightingDb::new());
        }
        let file = File::open(path).map_err(persistence_error)?;
        let db = Self::from_jsonl(BufReader::new(file))?;
        info!(path = %path.display(), labels = db.labels().len(), "Loaded sighting store");
        Ok(db)
    }
}

impl RunSightings {
    /// Write this run's rows as JSON lines, ordered by message then node.
    pub fn write_jsonl(&self, mut writer: impl Write) -> Result<usize, SinkError> {
        let rows = self.rows();
        for record in &rows {
            let line = PersistedSighting {
                label: self.label().to_string(),
                record: record.clone(),
            };
            serde_json::to_writer(&mut writer, &line).map_err(persistence_error)?;
            writer.write_all(b"\n").map_err(persistence_error)?;
        }
        writer.flush().map_err(persistence_error)?;
        Ok(rows.len())
    }

    /// Append this run's rows to a JSON-lines file, creating it if needed.
    pub fn append_to_file(&self, path: &Path) -> Result<usize, SinkError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(persistence_error)?;
        let written = self.write_jsonl(BufWriter::new(file))?;
        info!(path = %path.display(), label = self.label(), rows = written, "Persisted sightings");
        Ok(written)
    }
}
