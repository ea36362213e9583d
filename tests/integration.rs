//! End-to-end integration tests for the litrank pipeline.
//!
//! These tests exercise the full flow from candidate selection through
//! enrichment, merging, and ranking, with scripted collaborators standing in
//! for the knowledge base and search endpoints.

use std::cell::RefCell;
use std::collections::BTreeMap;

use litrank::annotation::{build_exclusion_set, propose_annotations};
use litrank::deps::DependencyEdge;
use litrank::enrich::enrich;
use litrank::error::SearchError;
use litrank::kb::KbRecord;
use litrank::merge::{MergeConfig, merge};
use litrank::pipeline::select_candidates;
use litrank::rank::rank;
use litrank::registry::{Registry, Resource};
use litrank::search::{SearchCounter, SearchResult};
use litrank::table::{FrequencyTable, TableStore};

/// Search counter scripted by substring match, recording every call.
struct ScriptedCounter {
    counts: Vec<(&'static str, u64)>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedCounter {
    fn new(counts: Vec<(&'static str, u64)>) -> Self {
        Self {
            counts,
            calls: RefCell::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl SearchCounter for ScriptedCounter {
    fn count(&self, query: &str, _retmax: Option<usize>) -> SearchResult<u64> {
        self.calls.borrow_mut().push(query.to_string());
        self.counts
            .iter()
            .find(|(needle, _)| query.contains(needle))
            .map(|(_, count)| Ok(*count))
            .unwrap_or(Err(SearchError::Format {
                message: format!("unscripted query: {query}"),
            }))
    }
}

fn resource(prefix: &str, name: &str, entity: Option<&str>) -> Resource {
    Resource {
        prefix: prefix.into(),
        name: name.into(),
        preferred_prefix: None,
        external_prefix: None,
        entity: entity.map(Into::into),
        deprecated: false,
    }
}

fn default_policy() -> litrank::enrich::QueryPolicy {
    litrank::enrich::QueryPolicy {
        bare_prefix_allowlist: Default::default(),
        field_tag: "[tw]".into(),
    }
}

fn options() -> litrank::enrich::EnrichOptions {
    litrank::enrich::EnrichOptions {
        refresh: false,
        batch_size: 20,
        retmax: Some(10),
    }
}

#[test]
fn count_then_combine_filters_zero_frequency() {
    // Two candidates, one with 150 mentions, one with zero. Both land in the
    // persisted table; only the nonzero one is ranked.
    let dir = tempfile::TempDir::new().unwrap();
    let store = TableStore::new(dir.path().join("frequencies.tsv"));

    let registry = Registry::from_resources(vec![
        resource("doid", "Human Disease Ontology", Some("Q1")),
        resource("chebi", "Chemical Entities of Biological Interest", Some("Q2")),
    ]);
    let (candidates, skipped) = select_candidates(&registry, None);
    assert!(skipped.is_empty());

    let counter = ScriptedCounter::new(vec![
        ("Human Disease Ontology", 150),
        ("Chemical Entities of Biological Interest", 0),
    ]);
    let report = enrich(
        &candidates,
        FrequencyTable::new(),
        &default_policy(),
        &options(),
        &counter,
        &store,
    )
    .unwrap();

    assert_eq!(report.counted, 2);
    let table = store.load().unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table["doid"].count, 150);
    assert_eq!(table["chebi"].count, 0);

    // Merge against the dependents table and rank.
    let edges = vec![
        DependencyEdge {
            item: "Q1".into(),
            short_name: Some("DOID".into()),
            label: "Human Disease Ontology".into(),
            description: None,
        },
        DependencyEdge {
            item: "Q2".into(),
            short_name: Some("CHEBI".into()),
            label: "Chemical Entities of Biological Interest".into(),
            description: None,
        },
    ];
    let fallback = ScriptedCounter::new(vec![]);
    let outcome = merge(
        &table,
        &registry.entity_map(),
        &edges,
        &fallback,
        &MergeConfig::default(),
    );
    let ranked = rank(outcome.rows);

    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].item, "Q1");
    assert_eq!(ranked[0].frequency, 150);
    // Both items had mapped frequencies; no fallback searches happened.
    assert_eq!(fallback.call_count(), 0);
}

#[test]
fn unmapped_edge_with_zero_fallback_is_dropped() {
    // A dependency edge outside the frequency mapping whose fallback search
    // returns zero never reaches the report.
    let fallback = ScriptedCounter::new(vec![("Unknown Tool", 0)]);
    let edges = vec![DependencyEdge {
        item: "Q99".into(),
        short_name: None,
        label: "Unknown Tool".into(),
        description: None,
    }];
    let outcome = merge(
        &FrequencyTable::new(),
        &BTreeMap::new(),
        &edges,
        &fallback,
        &MergeConfig::default(),
    );

    assert_eq!(fallback.call_count(), 1);
    assert!(outcome.rows.is_empty());
    assert!(outcome.skipped.is_empty());
}

#[test]
fn ranked_report_orders_mixed_frequencies() {
    let registry = Registry::from_resources(vec![
        resource("a", "Alpha Ontology", Some("Q1")),
        resource("b", "Beta Ontology", Some("Q2")),
        resource("c", "Gamma Ontology", Some("Q3")),
    ]);
    let dir = tempfile::TempDir::new().unwrap();
    let store = TableStore::new(dir.path().join("frequencies.tsv"));

    let (candidates, _) = select_candidates(&registry, None);
    let counter = ScriptedCounter::new(vec![
        ("Alpha Ontology", 10),
        ("Beta Ontology", 99),
        ("Gamma Ontology", 10),
    ]);
    let report = enrich(
        &candidates,
        FrequencyTable::new(),
        &default_policy(),
        &options(),
        &counter,
        &store,
    )
    .unwrap();

    let edges: Vec<DependencyEdge> = [("Q1", "Alpha Ontology"), ("Q2", "Beta Ontology"), ("Q3", "Gamma Ontology")]
        .iter()
        .map(|(item, label)| DependencyEdge {
            item: item.to_string(),
            short_name: None,
            label: label.to_string(),
            description: None,
        })
        .collect();
    let fallback = ScriptedCounter::new(vec![]);
    let outcome = merge(
        &report.table,
        &registry.entity_map(),
        &edges,
        &fallback,
        &MergeConfig::default(),
    );
    let ranked = rank(outcome.rows);

    let labels: Vec<&str> = ranked.iter().map(|r| r.label.as_str()).collect();
    // Beta wins on frequency; Alpha and Gamma tie and sort by label.
    assert_eq!(labels, vec!["Beta Ontology", "Alpha Ontology", "Gamma Ontology"]);
}

#[test]
fn annotation_flow_from_kb_records_to_proposals() {
    let registry = Registry::from_resources(vec![
        Resource {
            prefix: "doid".into(),
            name: "Human Disease Ontology".into(),
            preferred_prefix: Some("DOID".into()),
            external_prefix: Some("DOID".into()),
            entity: Some("Q1".into()),
            deprecated: false,
        },
        Resource {
            prefix: "go".into(),
            name: "Gene Ontology".into(),
            preferred_prefix: None,
            external_prefix: Some("GO".into()),
            entity: None,
            deprecated: false,
        },
    ]);

    // The knowledge base knows both, but GO is already annotated.
    let records = vec![
        KbRecord {
            item: "Q1".into(),
            short_name: Some("doid".into()),
            label: String::new(),
            description: None,
            types: Vec::new(),
            annotated: false,
        },
        KbRecord {
            item: "Q2".into(),
            short_name: Some("go".into()),
            label: String::new(),
            description: None,
            types: Vec::new(),
            annotated: true,
        },
    ];
    let exclusion = build_exclusion_set(&records);

    let usage: BTreeMap<String, String> = [
        ("doid".to_string(), "1.5".to_string()),
        ("go".to_string(), "1.4".to_string()),
    ]
    .into();

    let outcome = propose_annotations(&registry, &exclusion, &usage, "P1547", "Q777");
    assert_eq!(outcome.edges.len(), 1);
    assert_eq!(outcome.edges[0].subject, "Q1");
    assert_eq!(outcome.edges[0].target, "Q777");
    assert!(outcome.skipped.is_empty());

    // The excluded resource is also not an enrichment candidate.
    let (candidates, skipped) = select_candidates(&registry, Some(&exclusion));
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].key, "doid");
    assert_eq!(skipped.len(), 1);
}
