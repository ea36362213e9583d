//! Knowledge-base query collaborator.
//!
//! The pipeline needs two shapes of query against the external knowledge base:
//! the annotation state of a collection (which entities already carry the
//! target annotation) and the transitive dependents of a set of root entities.
//! Both return flat [`KbRecord`] rows. The [`KnowledgeBase`] trait is the seam;
//! [`HttpKnowledgeBase`] renders SPARQL and talks to a wikibase-style endpoint
//! over synchronous HTTP.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::error::KbError;

pub type KbResult<T> = std::result::Result<T, KbError>;

/// One row of a knowledge-base query result.
///
/// Optional fields are genuinely optional: a record with no short name or
/// description is valid, and an empty result set is a valid answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KbRecord {
    /// Bare entity id (IRI prefix stripped).
    pub item: String,
    /// Short identifier the entity is known by, if any.
    pub short_name: Option<String>,
    /// Human-readable label; empty when the query does not resolve labels.
    pub label: String,
    /// Free-text description, if any.
    pub description: Option<String>,
    /// Entity type ids, when the query exposes them.
    pub types: Vec<String>,
    /// Whether the entity already carries the target annotation.
    pub annotated: bool,
}

/// Query description handed to the knowledge base.
#[derive(Debug, Clone)]
pub enum KbQuery {
    /// Entities in a collection, their short names, and whether each already
    /// links to `target` via one of `predicates`.
    AnnotationState {
        /// Property linking entities to the collection.
        membership: String,
        /// Collection entity id.
        collection: String,
        /// Property holding the short name.
        short_name: String,
        /// Annotation predicates, any of which counts as "already annotated".
        predicates: Vec<String>,
        /// Annotation target entity id.
        target: String,
    },
    /// Entities transitively linked to any of `roots` via `predicates`.
    TransitiveDependents {
        roots: Vec<String>,
        predicates: Vec<String>,
        /// Property holding the short name.
        short_name: String,
    },
}

impl KbQuery {
    /// Render the query as SPARQL for a wikibase-style endpoint.
    pub fn to_sparql(&self) -> String {
        match self {
            KbQuery::AnnotationState {
                membership,
                collection,
                short_name,
                predicates,
                target,
            } => {
                let preds = predicates
                    .iter()
                    .map(|p| format!("wdt:{p}"))
                    .collect::<Vec<_>>()
                    .join("|");
                format!(
                    "SELECT ?item ?shortName ?annotated\n\
                     WHERE {{\n\
                       ?item wdt:{membership} wd:{collection} .\n\
                       OPTIONAL {{ ?item wdt:{short_name} ?shortName . }}\n\
                       OPTIONAL {{\n\
                         ?item {preds} wd:{target}\n\
                         BIND(true AS ?annotated)\n\
                       }}\n\
                     }}"
                )
            }
            KbQuery::TransitiveDependents {
                roots,
                predicates,
                short_name,
            } => {
                let values = roots
                    .iter()
                    .map(|r| format!("wd:{r}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                let preds = predicates
                    .iter()
                    .map(|p| format!("wdt:{p}"))
                    .collect::<Vec<_>>()
                    .join("|");
                format!(
                    "SELECT DISTINCT ?item ?shortName ?itemLabel ?itemDescription\n\
                     WHERE {{\n\
                       VALUES ?root {{ {values} }}\n\
                       ?item ({preds})+ ?root .\n\
                       OPTIONAL {{ ?item wdt:{short_name} ?shortName . }}\n\
                       SERVICE wikibase:label {{ bd:serviceParam wikibase:language \"[AUTO_LANGUAGE],mul,en\". }}\n\
                     }}"
                )
            }
        }
    }
}

/// Seam for the knowledge-base collaborator.
pub trait KnowledgeBase {
    /// Execute a query and return its rows. An empty vector means zero
    /// matches, not an error.
    fn records(&self, query: &KbQuery) -> KbResult<Vec<KbRecord>>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// SPARQL-over-HTTP knowledge base client.
pub struct HttpKnowledgeBase {
    endpoint: String,
    agent: ureq::Agent,
}

impl HttpKnowledgeBase {
    /// Create a client for the given SPARQL endpoint.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            endpoint: endpoint.into(),
            agent,
        }
    }
}

impl KnowledgeBase for HttpKnowledgeBase {
    fn records(&self, query: &KbQuery) -> KbResult<Vec<KbRecord>> {
        let sparql = query.to_sparql();
        let response = self
            .agent
            .get(&self.endpoint)
            .set("Accept", "application/sparql-results+json")
            .query("query", &sparql)
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(status, response) => KbError::Http {
                    status,
                    body: response.into_string().unwrap_or_default(),
                },
                ureq::Error::Transport(transport) => KbError::Transport {
                    message: transport.to_string(),
                },
            })?;

        let results: SparqlResults = response.into_json().map_err(|e| KbError::Format {
            message: e.to_string(),
        })?;
        Ok(results
            .results
            .bindings
            .iter()
            .filter_map(record_from_binding)
            .collect())
    }
}

// ---------------------------------------------------------------------------
// SPARQL JSON results envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SparqlResults {
    results: SparqlBindings,
}

#[derive(Debug, Deserialize)]
struct SparqlBindings {
    bindings: Vec<BTreeMap<String, SparqlTerm>>,
}

#[derive(Debug, Deserialize)]
struct SparqlTerm {
    value: String,
}

/// Build a [`KbRecord`] from one solution binding. Solutions without an
/// `item` binding are dropped.
fn record_from_binding(binding: &BTreeMap<String, SparqlTerm>) -> Option<KbRecord> {
    let item = entity_id(&binding.get("item")?.value);
    let get = |key: &str| binding.get(key).map(|t| t.value.clone());
    Some(KbRecord {
        item,
        short_name: get("shortName"),
        label: get("itemLabel").unwrap_or_default(),
        description: get("itemDescription"),
        types: get("types")
            .map(|t| t.split('|').map(str::to_string).collect())
            .unwrap_or_default(),
        annotated: get("annotated").is_some_and(|v| v == "true"),
    })
}

/// Strip the entity IRI namespace, keeping the bare id.
///
/// Endpoints return items as full IRIs (`http://…/entity/Q42`); the registry
/// and persisted tables hold bare ids.
fn entity_id(value: &str) -> String {
    if value.starts_with("http://") || value.starts_with("https://") {
        value.rsplit('/').next().unwrap_or(value).to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(value: &str) -> SparqlTerm {
        SparqlTerm {
            value: value.into(),
        }
    }

    #[test]
    fn annotation_query_renders_membership_and_flag() {
        let query = KbQuery::AnnotationState {
            membership: "P361".into(),
            collection: "Q4117183".into(),
            short_name: "P1813".into(),
            predicates: vec!["P1547".into(), "P2283".into()],
            target: "Q112336713".into(),
        };
        let sparql = query.to_sparql();
        assert!(sparql.contains("?item wdt:P361 wd:Q4117183 ."));
        assert!(sparql.contains("wdt:P1547|wdt:P2283 wd:Q112336713"));
        assert!(sparql.contains("BIND(true AS ?annotated)"));
    }

    #[test]
    fn dependents_query_renders_transitive_path() {
        let query = KbQuery::TransitiveDependents {
            roots: vec!["Q109302681".into(), "Q116738064".into()],
            predicates: vec!["P1547".into(), "P2283".into()],
            short_name: "P1813".into(),
        };
        let sparql = query.to_sparql();
        assert!(sparql.contains("VALUES ?root { wd:Q109302681 wd:Q116738064 }"));
        assert!(sparql.contains("(wdt:P1547|wdt:P2283)+ ?root"));
        assert!(sparql.contains("SELECT DISTINCT"));
    }

    #[test]
    fn binding_parses_with_optional_fields_missing() {
        let mut binding = BTreeMap::new();
        binding.insert(
            "item".to_string(),
            term("http://www.wikidata.org/entity/Q42"),
        );
        let record = record_from_binding(&binding).unwrap();
        assert_eq!(record.item, "Q42");
        assert_eq!(record.short_name, None);
        assert_eq!(record.label, "");
        assert!(!record.annotated);
    }

    #[test]
    fn binding_parses_annotated_flag() {
        let mut binding = BTreeMap::new();
        binding.insert("item".to_string(), term("Q42"));
        binding.insert("shortName".to_string(), term("DOID"));
        binding.insert("annotated".to_string(), term("true"));
        let record = record_from_binding(&binding).unwrap();
        assert_eq!(record.short_name.as_deref(), Some("DOID"));
        assert!(record.annotated);
    }

    #[test]
    fn binding_without_item_is_dropped() {
        let mut binding = BTreeMap::new();
        binding.insert("shortName".to_string(), term("DOID"));
        assert!(record_from_binding(&binding).is_none());
    }

    #[test]
    fn empty_results_envelope_is_valid() {
        let json = r#"{"head": {"vars": ["item"]}, "results": {"bindings": []}}"#;
        let results: SparqlResults = serde_json::from_str(json).unwrap();
        assert!(results.results.bindings.is_empty());
    }
}
