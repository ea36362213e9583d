//! The transitive dependents table.
//!
//! Entities that depend on the root set, fetched from the knowledge base once
//! and cached on disk as TSV. Frequencies are attached later by the merger;
//! this module only knows about the edges themselves.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TableError;
use crate::kb::{KbQuery, KnowledgeBase, KbResult};
use crate::table::TableResult;

/// One dependents-table row: an entity reachable from the root set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub item: String,
    pub short_name: Option<String>,
    pub label: String,
    pub description: Option<String>,
}

/// Fetch the dependents table, sorted by short name for a stable file.
pub fn fetch_dependents<K: KnowledgeBase>(kb: &K, query: &KbQuery) -> KbResult<Vec<DependencyEdge>> {
    let mut edges: Vec<DependencyEdge> = kb
        .records(query)?
        .into_iter()
        .map(|r| DependencyEdge {
            item: r.item,
            short_name: r.short_name,
            label: r.label,
            description: r.description,
        })
        .collect();
    edges.sort_by(|a, b| {
        let a_key = (a.short_name.as_deref().unwrap_or(""), a.label.as_str());
        let b_key = (b.short_name.as_deref().unwrap_or(""), b.label.as_str());
        a_key.cmp(&b_key)
    });
    Ok(edges)
}

/// Load a dependents table from TSV.
pub fn load_edges(path: &Path) -> TableResult<Vec<DependencyEdge>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(|e| TableError::Format {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    reader
        .deserialize::<DependencyEdge>()
        .map(|row| {
            row.map_err(|e| TableError::Format {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        })
        .collect()
}

/// Write a dependents table as TSV.
pub fn write_edges(path: &Path, edges: &[DependencyEdge]) -> TableResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(|e| TableError::Format {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    for edge in edges {
        writer.serialize(edge).map_err(|e| TableError::Format {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    }
    writer.flush().map_err(|e| TableError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

/// Render the table for terminal display.
pub fn format_edges(edges: &[DependencyEdge]) -> String {
    let mut out = String::from("| item | short name | label |\n|---|---|---|\n");
    for edge in edges {
        out.push_str(&format!(
            "| {} | {} | {} |\n",
            edge.item,
            edge.short_name.as_deref().unwrap_or(""),
            edge.label
        ));
    }
    out
}
