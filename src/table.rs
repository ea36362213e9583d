//! The persisted frequency table: the pipeline's only cross-run state.
//!
//! A tab-delimited file with a stable header, read fully into a map keyed by
//! prefix at the start of a run and rewritten in full (never appended) on
//! every checkpoint. Keying by prefix makes re-runs update rather than
//! duplicate, and the full rewrite keeps the file byte-identical for a given
//! mapping regardless of where a previous run stopped.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TableError;

pub type TableResult<T> = std::result::Result<T, TableError>;

/// One persisted frequency row. `prefix` is the unique key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyRecord {
    pub prefix: String,
    pub entity: Option<String>,
    pub name: String,
    pub query: String,
    pub count: u64,
}

/// In-memory view of the persisted table, keyed by prefix.
pub type FrequencyTable = BTreeMap<String, FrequencyRecord>;

/// Reads and checkpoints the frequency table at a fixed path.
///
/// The enrichment counter is the only writer; readers load a snapshot once
/// and never see a partially written file because every write goes through a
/// temp file and an atomic rename.
#[derive(Debug, Clone)]
pub struct TableStore {
    path: PathBuf,
}

impl TableStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the full table. A missing file is an empty table, not an error.
    pub fn load(&self) -> TableResult<FrequencyTable> {
        if !self.path.is_file() {
            return Ok(FrequencyTable::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_path(&self.path)
            .map_err(|e| TableError::Format {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;

        let mut table = FrequencyTable::new();
        for row in reader.deserialize::<FrequencyRecord>() {
            let record = row.map_err(|e| TableError::Format {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;
            if table.contains_key(&record.prefix) {
                return Err(TableError::DuplicateKey {
                    path: self.path.display().to_string(),
                    key: record.prefix,
                });
            }
            table.insert(record.prefix.clone(), record);
        }
        Ok(table)
    }

    /// Checkpoint: rewrite the whole table atomically.
    ///
    /// Rows are ordered by descending count, then ascending prefix, so the
    /// file doubles as a readable ranking and is deterministic for a given
    /// mapping.
    pub fn write(&self, table: &FrequencyTable) -> TableResult<()> {
        let tmp = self.path.with_extension("tsv.tmp");
        let io_err = |e: std::io::Error| TableError::Io {
            path: self.path.display().to_string(),
            source: e,
        };

        {
            let file = std::fs::File::create(&tmp).map_err(io_err)?;
            let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(file);

            let mut rows: Vec<&FrequencyRecord> = table.values().collect();
            rows.sort_by(|a, b| (Reverse(a.count), &a.prefix).cmp(&(Reverse(b.count), &b.prefix)));

            for record in rows {
                writer.serialize(record).map_err(|e| TableError::Format {
                    path: self.path.display().to_string(),
                    message: e.to_string(),
                })?;
            }
            writer
                .into_inner()
                .map_err(|e| TableError::Format {
                    path: self.path.display().to_string(),
                    message: e.to_string(),
                })?
                .sync_all()
                .map_err(io_err)?;
        }

        std::fs::rename(&tmp, &self.path).map_err(io_err)
    }
}
