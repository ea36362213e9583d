//! On-disk layout for a litrank data directory.
//!
//! Every artifact the pipeline reads or writes lives under one data
//! directory; [`DataPaths`] derives the individual file locations so no
//! component hard-codes a path.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors from data-directory handling.
#[derive(Debug, Error, Diagnostic)]
pub enum PathError {
    #[error("failed to create data directory: {path}")]
    #[diagnostic(
        code(litrank::paths::create_dir),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type PathResult<T> = std::result::Result<T, PathError>;

/// File layout under the data directory.
#[derive(Debug, Clone)]
pub struct DataPaths {
    /// Root of all pipeline state.
    pub data_dir: PathBuf,
    /// `data_dir/registry.json` — registry dump (input).
    pub registry_dump: PathBuf,
    /// `data_dir/frequencies.tsv` — persisted frequency table (checkpointed).
    pub frequency_table: PathBuf,
    /// `data_dir/dependents.tsv` — cached transitive dependents table.
    pub dependents_table: PathBuf,
    /// `data_dir/proposals.tsv` — annotation proposal rows.
    pub proposals_table: PathBuf,
    /// `data_dir/report.tsv` — final ranked report.
    pub report: PathBuf,
}

impl DataPaths {
    /// Derive all file locations from a data directory.
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            registry_dump: data_dir.join("registry.json"),
            frequency_table: data_dir.join("frequencies.tsv"),
            dependents_table: data_dir.join("dependents.tsv"),
            proposals_table: data_dir.join("proposals.tsv"),
            report: data_dir.join("report.tsv"),
            data_dir,
        }
    }

    /// Create the data directory. Idempotent.
    pub fn ensure_dirs(&self) -> PathResult<()> {
        std::fs::create_dir_all(&self.data_dir).map_err(|e| PathError::CreateDir {
            path: self.data_dir.display().to_string(),
            source: e,
        })
    }
}
