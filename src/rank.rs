//! Ranking and report serialization.

use std::cmp::Reverse;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TableError;
use crate::table::TableResult;

/// One row of the final report: a dependent entity with its resolved
/// literature frequency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedRow {
    pub item: String,
    pub short_name: Option<String>,
    pub label: String,
    pub description: Option<String>,
    pub frequency: u64,
}

/// Stable sort: descending by frequency, ties ascending by label.
pub fn rank(mut rows: Vec<RankedRow>) -> Vec<RankedRow> {
    rows.sort_by(|a, b| (Reverse(a.frequency), &a.label).cmp(&(Reverse(b.frequency), &b.label)));
    rows
}

/// Write the ranked report as TSV.
pub fn write_report(path: &Path, rows: &[RankedRow]) -> TableResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(|e| TableError::Format {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    for row in rows {
        writer.serialize(row).map_err(|e| TableError::Format {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    }
    writer.flush().map_err(|e| TableError::Io {
        path: path.display().to_string(),
        source: e,
    })
}
