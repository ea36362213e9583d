//! Pipeline glue: candidate selection and the skip report.
//!
//! Per-item failures never abort a run; they become [`Skip`] entries that are
//! carried through to the end and printed, so a partially failed run still
//! tells the user exactly what it could not process and why.

use tracing::debug;

use crate::annotation::ExclusionSet;
use crate::enrich::Candidate;
use crate::ident;
use crate::registry::Registry;

/// Why an identifier was left out of a processing step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The identifier was empty or whitespace-only.
    InvalidIdentifier,
    /// No matching entity in the knowledge base.
    UnresolvedIdentifier,
    /// The entity already carries the target annotation.
    AlreadyAnnotated,
    /// The search-count call failed; count unknown for this run.
    SearchFailed(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::InvalidIdentifier => write!(f, "invalid identifier"),
            SkipReason::UnresolvedIdentifier => write!(f, "no matching entity in knowledge base"),
            SkipReason::AlreadyAnnotated => write!(f, "already annotated"),
            SkipReason::SearchFailed(message) => write!(f, "search failed: {message}"),
        }
    }
}

/// A skipped identifier and the reason it was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skip {
    pub key: String,
    pub reason: SkipReason,
}

/// Select enrichment candidates from the registry.
///
/// Deprecated resources were already dropped at registry load. When an
/// exclusion set is supplied, resources whose registry prefix or external
/// prefix is already annotated are filtered out here and never reach the
/// enrichment counter.
pub fn select_candidates(
    registry: &Registry,
    exclusion: Option<&ExclusionSet>,
) -> (Vec<Candidate>, Vec<Skip>) {
    let mut candidates = Vec::with_capacity(registry.len());
    let mut skipped = Vec::new();

    for resource in registry.resources() {
        let key = match ident::normalize(&resource.prefix) {
            Ok(key) => key,
            Err(_) => {
                skipped.push(Skip {
                    key: resource.prefix.clone(),
                    reason: SkipReason::InvalidIdentifier,
                });
                continue;
            }
        };

        if let Some(exclusion) = exclusion {
            let external_key = resource
                .external_prefix
                .as_deref()
                .and_then(|p| ident::normalize(p).ok());
            let annotated = exclusion.contains(&key)
                || external_key.as_deref().is_some_and(|k| exclusion.contains(k));
            if annotated {
                debug!(prefix = %resource.prefix, "already annotated, not a candidate");
                skipped.push(Skip {
                    key,
                    reason: SkipReason::AlreadyAnnotated,
                });
                continue;
            }
        }

        candidates.push(Candidate {
            key,
            entity: resource.entity.clone(),
            name: resource.name.clone(),
            preferred_prefix: resource.preferred_prefix.clone(),
        });
    }

    (candidates, skipped)
}

/// Render the skip report for the end of a run. Empty when nothing was skipped.
pub fn format_skip_report(skipped: &[Skip]) -> String {
    if skipped.is_empty() {
        return String::new();
    }
    let mut out = format!("{} identifier(s) skipped:\n", skipped.len());
    for skip in skipped {
        out.push_str(&format!("  {}: {}\n", skip.key, skip.reason));
    }
    out
}
