//! Annotation state tracking and proposal generation.
//!
//! From the knowledge base's view of a collection, [`build_exclusion_set`]
//! derives which entities already carry the target annotation so downstream
//! steps never re-submit them. [`propose_annotations`] then pairs the registry
//! with that state to emit the annotation edges still missing upstream.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ident;
use crate::kb::KbRecord;
use crate::pipeline::{Skip, SkipReason};
use crate::registry::Registry;

/// Annotation state derived from a knowledge-base query.
#[derive(Debug, Default, Clone)]
pub struct ExclusionSet {
    /// Normalized short identifier → entity id.
    pub entity_by_key: BTreeMap<String, String>,
    /// Normalized short identifiers of entities already annotated.
    pub excluded: BTreeSet<String>,
}

impl ExclusionSet {
    /// Whether the normalized key is already annotated.
    pub fn contains(&self, key: &str) -> bool {
        self.excluded.contains(key)
    }
}

/// Build the exclusion set from knowledge-base records.
///
/// Pure over its input. Records without a short name are ignored. When two
/// records normalize to the same short identifier but name different entities,
/// the first mapping wins and the conflict is logged; the ambiguity is real in
/// the source data and must not be resolved silently either way.
pub fn build_exclusion_set(records: &[KbRecord]) -> ExclusionSet {
    let mut set = ExclusionSet::default();
    for record in records {
        let Some(short_name) = record.short_name.as_deref() else {
            continue;
        };
        let Ok(key) = ident::normalize(short_name) else {
            debug!(item = %record.item, "record with blank short name, ignoring");
            continue;
        };

        if record.annotated {
            set.excluded.insert(key.clone());
        }

        match set.entity_by_key.get(&key) {
            None => {
                set.entity_by_key.insert(key, record.item.clone());
            }
            Some(existing) if *existing != record.item => {
                warn!(
                    key,
                    kept = %existing,
                    ignored = %record.item,
                    "duplicate short identifier maps to different entities, keeping first"
                );
            }
            Some(_) => {}
        }
    }
    set
}

// ---------------------------------------------------------------------------
// Annotation proposals
// ---------------------------------------------------------------------------

/// A proposed annotation fact, ready for upstream submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationEdge {
    pub subject: String,
    pub predicate: String,
    pub target: String,
}

/// One row of the proposal table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposalRow {
    pub prefix: String,
    pub entity: String,
    pub version: String,
}

/// Result of a proposal pass: edges to submit plus identifiers that could
/// not be processed, with reasons.
#[derive(Debug, Default)]
pub struct ProposalOutcome {
    pub edges: Vec<AnnotationEdge>,
    pub rows: Vec<ProposalRow>,
    pub skipped: Vec<Skip>,
}

/// Propose annotation edges for registry resources that are tracked locally
/// (present in `usage`, keyed by registry prefix) but not yet annotated in
/// the knowledge base.
///
/// Resources without an external prefix, or without a local usage record,
/// are simply not candidates. A resource whose external prefix has no known
/// entity is a reconciliation gap: it is logged and reported, and the run
/// continues.
pub fn propose_annotations(
    registry: &Registry,
    exclusion: &ExclusionSet,
    usage: &BTreeMap<String, String>,
    predicate: &str,
    target: &str,
) -> ProposalOutcome {
    let mut outcome = ProposalOutcome::default();

    for resource in registry.resources() {
        let Some(external) = resource.external_prefix.as_deref() else {
            continue;
        };
        let key = match ident::normalize(external) {
            Ok(key) => key,
            Err(_) => {
                outcome.skipped.push(Skip {
                    key: resource.prefix.clone(),
                    reason: SkipReason::InvalidIdentifier,
                });
                continue;
            }
        };

        if exclusion.contains(&key) {
            debug!(prefix = %resource.prefix, "already annotated, skipping");
            continue;
        }

        let Some(entity) = exclusion.entity_by_key.get(&key) else {
            warn!(
                external,
                name = %resource.name,
                "no entity found for external prefix"
            );
            outcome.skipped.push(Skip {
                key: resource.prefix.clone(),
                reason: SkipReason::UnresolvedIdentifier,
            });
            continue;
        };

        let Some(version) = usage.get(&resource.prefix) else {
            continue;
        };

        outcome.edges.push(AnnotationEdge {
            subject: entity.clone(),
            predicate: predicate.to_string(),
            target: target.to_string(),
        });
        outcome.rows.push(ProposalRow {
            prefix: resource.prefix.clone(),
            entity: entity.clone(),
            version: version.clone(),
        });
    }

    outcome
}

/// Write the proposal rows as TSV.
pub fn write_proposals(
    path: &std::path::Path,
    rows: &[ProposalRow],
) -> crate::table::TableResult<()> {
    use crate::error::TableError;

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Resource;

    fn record(item: &str, short_name: Option<&str>, annotated: bool) -> KbRecord {
        KbRecord {
            item: item.into(),
            short_name: short_name.map(Into::into),
            label: String::new(),
            description: None,
            types: Vec::new(),
            annotated,
        }
    }

    fn resource(prefix: &str, name: &str, external: Option<&str>) -> Resource {
        Resource {
            prefix: prefix.into(),
            name: name.into(),
            preferred_prefix: None,
            external_prefix: external.map(Into::into),
            entity: None,
            deprecated: false,
        }
    }

    #[test]
    fn exclusion_set_registers_and_excludes() {
        let records = vec![
            record("Q1", Some("DOID"), true),
            record("Q2", Some("chebi"), false),
            record("Q3", None, true),
        ];
        let set = build_exclusion_set(&records);

        assert_eq!(set.entity_by_key.get("doid").map(String::as_str), Some("Q1"));
        assert_eq!(
            set.entity_by_key.get("chebi").map(String::as_str),
            Some("Q2")
        );
        assert!(set.contains("doid"));
        assert!(!set.contains("chebi"));
        // The record without a short name registers nothing.
        assert_eq!(set.entity_by_key.len(), 2);
    }

    #[test]
    fn duplicate_key_keeps_first_mapping() {
        let records = vec![record("Q1", Some("go"), false), record("Q2", Some("GO"), false)];
        let set = build_exclusion_set(&records);
        assert_eq!(set.entity_by_key.get("go").map(String::as_str), Some("Q1"));
    }

    #[test]
    fn exclusion_is_case_insensitive() {
        let set = build_exclusion_set(&[record("Q1", Some("  DOID "), true)]);
        assert!(set.contains("doid"));
    }

    #[test]
    fn proposals_cover_unannotated_tracked_resources_only() {
        let registry = Registry::from_resources(vec![
            resource("doid", "Human Disease Ontology", Some("DOID")),
            resource("go", "Gene Ontology", Some("GO")),
            resource("chebi", "ChEBI", Some("CHEBI")),
            resource("untracked", "No External Prefix", None),
        ]);
        let exclusion = build_exclusion_set(&[
            record("Q1", Some("doid"), false),
            record("Q2", Some("go"), true),
        ]);
        let usage: BTreeMap<String, String> = [
            ("doid".to_string(), "1.5".to_string()),
            ("go".to_string(), "1.4".to_string()),
        ]
        .into();

        let outcome = propose_annotations(&registry, &exclusion, &usage, "P1547", "Q999");

        // doid: tracked, resolvable, unannotated → proposed.
        assert_eq!(outcome.edges.len(), 1);
        assert_eq!(
            outcome.edges[0],
            AnnotationEdge {
                subject: "Q1".into(),
                predicate: "P1547".into(),
                target: "Q999".into(),
            }
        );
        assert_eq!(outcome.rows[0].prefix, "doid");
        assert_eq!(outcome.rows[0].version, "1.5");

        // go is already annotated; chebi has no entity → reported.
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].key, "chebi");
        assert_eq!(outcome.skipped[0].reason, SkipReason::UnresolvedIdentifier);
    }
}
