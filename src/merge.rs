//! Dependency graph merger.
//!
//! Joins the dependents table against the frequency table by entity id,
//! filling gaps with a fallback search on the entity's label. Rows that still
//! have no positive frequency are dropped: the report ranks entities by
//! evidence, and "no evidence" is not a rank.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::deps::DependencyEdge;
use crate::pipeline::{Skip, SkipReason};
use crate::rank::RankedRow;
use crate::search::SearchCounter;
use crate::table::FrequencyTable;

/// Merger configuration. `noise_prefixes` is a label-prefix denylist for
/// naming-convention artifacts from unrelated ecosystems that the transitive
/// query drags in.
#[derive(Debug, Clone, Default)]
pub struct MergeConfig {
    pub noise_prefixes: Vec<String>,
    pub retmax: Option<usize>,
}

impl MergeConfig {
    fn is_noise(&self, label: &str) -> bool {
        self.noise_prefixes.iter().any(|p| label.starts_with(p))
    }
}

/// Merged rows ready for ranking, plus the entities left unresolved.
#[derive(Debug, Default)]
pub struct MergeOutcome {
    pub rows: Vec<RankedRow>,
    pub skipped: Vec<Skip>,
}

/// Join dependency edges with the frequency table.
///
/// The frequency table is keyed by registry prefix; `entity_map` (normalized
/// prefix → entity id) bridges it to the dependents table's entity ids. Edges
/// without a mapped frequency get one fallback search on their quoted label;
/// a failed fallback leaves the edge unresolved and it is dropped, along with
/// every edge whose resolved frequency is zero.
pub fn merge<S: SearchCounter>(
    table: &FrequencyTable,
    entity_map: &BTreeMap<String, String>,
    edges: &[DependencyEdge],
    fallback: &S,
    config: &MergeConfig,
) -> MergeOutcome {
    // Frequencies keyed by entity id, for prefixes with a curated mapping.
    let mut dd: BTreeMap<String, u64> = BTreeMap::new();
    for record in table.values() {
        if let Some(entity) = entity_map.get(&record.prefix) {
            dd.insert(entity.clone(), record.count);
        }
    }
    debug!(resolved = dd.len(), "built entity frequency map");

    let mut outcome = MergeOutcome::default();
    let mut seen: BTreeSet<(String, String)> = BTreeSet::new();

    for edge in edges {
        if config.is_noise(&edge.label) {
            debug!(label = %edge.label, "noise label, dropping");
            continue;
        }
        if !seen.insert((edge.item.clone(), edge.label.clone())) {
            continue;
        }

        if !dd.contains_key(&edge.item) {
            match fallback.count(&format!("\"{}\"", edge.label), config.retmax) {
                Ok(count) => {
                    dd.insert(edge.item.clone(), count);
                }
                Err(e) => {
                    warn!(item = %edge.item, label = %edge.label, error = %e, "fallback search failed");
                    outcome.skipped.push(Skip {
                        key: edge.item.clone(),
                        reason: SkipReason::SearchFailed(e.to_string()),
                    });
                    continue;
                }
            }
        }

        let frequency = dd[&edge.item];
        if frequency == 0 {
            continue;
        }
        outcome.rows.push(RankedRow {
            item: edge.item.clone(),
            short_name: edge.short_name.clone(),
            label: edge.label.clone(),
            description: edge.description.clone(),
            frequency,
        });
    }

    outcome
}
