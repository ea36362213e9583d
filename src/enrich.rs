//! Resumable enrichment counter.
//!
//! Walks the candidate list, asks the search collaborator for a literature
//! count per candidate, and folds the results into the frequency table. The
//! external calls are slow and fail often, so the fold checkpoints the full
//! table every `batch_size` processed candidates: a crash loses at most
//! `batch_size - 1` counts, and a restart with `refresh=false` carries prior
//! rows forward without repeating their searches.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::pipeline::{Skip, SkipReason};
use crate::search::SearchCounter;
use crate::table::{FrequencyRecord, FrequencyTable, TableResult, TableStore};

/// An entity awaiting a frequency count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Normalized registry prefix; key into the persisted table.
    pub key: String,
    /// Knowledge-base entity id, when curated.
    pub entity: Option<String>,
    /// Display name, the base of the search query.
    pub name: String,
    /// Preferred short form, when one exists.
    pub preferred_prefix: Option<String>,
}

/// Deterministic search-query construction.
///
/// The base phrase is the display name; a second phrase combines name and
/// preferred short form; the bare short form is added only for keys on the
/// allowlist, where the short form is distinctive enough to search on alone.
#[derive(Debug, Clone, Default)]
pub struct QueryPolicy {
    /// Candidate keys whose bare preferred prefix joins the query.
    pub bare_prefix_allowlist: BTreeSet<String>,
    /// Field tag appended to every phrase (e.g. `[tw]`).
    pub field_tag: String,
}

impl QueryPolicy {
    /// Build the disjunctive search query for a candidate.
    pub fn build_query(&self, candidate: &Candidate) -> String {
        let mut phrases = vec![candidate.name.clone()];
        if let Some(pp) = candidate.preferred_prefix.as_deref() {
            phrases.push(format!("{} ({pp})", candidate.name));
            if self.bare_prefix_allowlist.contains(&candidate.key) {
                phrases.push(pp.to_string());
            }
        }
        phrases
            .iter()
            .map(|phrase| format!("\"{phrase}\"{}", self.field_tag))
            .collect::<Vec<_>>()
            .join(" OR ")
    }
}

/// Knobs for one enrichment run.
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Discard the prior table and re-count everything.
    pub refresh: bool,
    /// Checkpoint stride, in processed candidates.
    pub batch_size: usize,
    /// Result-limit hint passed to the search collaborator.
    pub retmax: Option<usize>,
}

/// What an enrichment run did: the final table plus per-candidate outcomes.
#[derive(Debug)]
pub struct EnrichReport {
    pub table: FrequencyTable,
    /// Candidates freshly counted this run.
    pub counted: usize,
    /// Candidates whose prior record was carried forward unchanged.
    pub carried: usize,
    /// Candidates whose search failed; count unknown for this run.
    pub skipped: Vec<Skip>,
}

/// Run the enrichment fold over `candidates`.
///
/// Search failures degrade to a [`Skip`] entry and the fold continues; only a
/// checkpoint write failure aborts, because the persisted table is the
/// authoritative progress record. The table is persisted once more at the end
/// regardless of how many candidates were processed.
pub fn enrich<S: SearchCounter>(
    candidates: &[Candidate],
    prior: FrequencyTable,
    policy: &QueryPolicy,
    options: &EnrichOptions,
    search: &S,
    store: &TableStore,
) -> TableResult<EnrichReport> {
    let mut table = if options.refresh {
        FrequencyTable::new()
    } else {
        prior
    };
    let batch_size = options.batch_size.max(1);

    let mut counted = 0usize;
    let mut carried = 0usize;
    let mut processed = 0usize;
    let mut skipped = Vec::new();

    for candidate in candidates {
        if table.contains_key(&candidate.key) {
            carried += 1;
            continue;
        }

        let query = policy.build_query(candidate);
        match search.count(&query, options.retmax) {
            Ok(count) => {
                debug!(key = %candidate.key, count, "counted");
                table.insert(
                    candidate.key.clone(),
                    FrequencyRecord {
                        prefix: candidate.key.clone(),
                        entity: candidate.entity.clone(),
                        name: candidate.name.clone(),
                        query,
                        count,
                    },
                );
                counted += 1;
            }
            Err(e) => {
                warn!(key = %candidate.key, error = %e, "search failed, leaving unresolved");
                skipped.push(Skip {
                    key: candidate.key.clone(),
                    reason: SkipReason::SearchFailed(e.to_string()),
                });
            }
        }

        processed += 1;
        if processed % batch_size == 0 {
            store.write(&table)?;
            debug!(processed, rows = table.len(), "checkpoint");
        }
    }

    store.write(&table)?;
    info!(
        counted,
        carried,
        failed = skipped.len(),
        "enrichment finished"
    );

    Ok(EnrichReport {
        table,
        counted,
        carried,
        skipped,
    })
}
