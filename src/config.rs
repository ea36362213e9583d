//! Pipeline configuration, loaded from TOML.
//!
//! Everything the components would otherwise hard-code lives here: endpoint
//! URLs, the knowledge-base vocabulary (properties and entity ids), the
//! query-construction allowlist, and the merger's noise-prefix denylist.
//! Every field has a default, so a missing config file means a default run,
//! not an error.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::enrich::{EnrichOptions, QueryPolicy};
use crate::kb::{HttpKnowledgeBase, KbQuery};
use crate::merge::MergeConfig;
use crate::search::HttpSearchCounter;

/// Errors from configuration loading.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file: {path}")]
    #[diagnostic(
        code(litrank::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {path}: {message}")]
    #[diagnostic(
        code(litrank::config::parse),
        help("Check the TOML syntax. Run with no --config to use the defaults.")
    )]
    Parse { path: String, message: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub kb: KbSection,
    #[serde(default)]
    pub search: SearchSection,
    #[serde(default)]
    pub enrich: EnrichSection,
    #[serde(default)]
    pub merge: MergeSection,
}

/// Knowledge-base endpoint and vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KbSection {
    /// SPARQL endpoint URL.
    #[serde(default = "default_kb_endpoint")]
    pub endpoint: String,
    /// Root entities for the transitive dependents query.
    #[serde(default)]
    pub roots: Vec<String>,
    /// Dependency/usage predicates.
    #[serde(default = "default_predicates")]
    pub predicates: Vec<String>,
    /// Property holding an entity's short name.
    #[serde(default = "default_short_name_property")]
    pub short_name_property: String,
    /// Property linking entities to the tracked collection.
    #[serde(default = "default_membership_property")]
    pub membership_property: String,
    /// Collection entity whose members are annotation candidates.
    #[serde(default)]
    pub collection: String,
    /// Target entity of the annotation predicate.
    #[serde(default)]
    pub annotation_target: String,
    #[serde(default = "default_kb_timeout_secs")]
    pub timeout_secs: u64,
}

/// Search-count endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSection {
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_retmax")]
    pub retmax: usize,
    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
}

/// Enrichment-counter knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichSection {
    /// Checkpoint stride, in processed candidates.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Keys whose bare preferred prefix is distinctive enough to search on.
    #[serde(default)]
    pub bare_prefix_allowlist: Vec<String>,
    /// Field tag appended to each query phrase.
    #[serde(default = "default_field_tag")]
    pub field_tag: String,
}

/// Merger knobs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeSection {
    /// Label prefixes to drop as naming-convention noise.
    #[serde(default)]
    pub noise_prefixes: Vec<String>,
}

fn default_kb_endpoint() -> String {
    "https://query.wikidata.org/sparql".into()
}
fn default_predicates() -> Vec<String> {
    vec!["P1547".into(), "P2283".into()]
}
fn default_short_name_property() -> String {
    "P1813".into()
}
fn default_membership_property() -> String {
    "P361".into()
}
fn default_kb_timeout_secs() -> u64 {
    60
}
fn default_search_endpoint() -> String {
    "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi".into()
}
fn default_database() -> String {
    "pubmed".into()
}
fn default_retmax() -> usize {
    10
}
fn default_search_timeout_secs() -> u64 {
    10
}
fn default_batch_size() -> usize {
    20
}
fn default_field_tag() -> String {
    "[tw]".into()
}

impl Default for KbSection {
    fn default() -> Self {
        Self {
            endpoint: default_kb_endpoint(),
            roots: Vec::new(),
            predicates: default_predicates(),
            short_name_property: default_short_name_property(),
            membership_property: default_membership_property(),
            collection: String::new(),
            annotation_target: String::new(),
            timeout_secs: default_kb_timeout_secs(),
        }
    }
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            database: default_database(),
            retmax: default_retmax(),
            timeout_secs: default_search_timeout_secs(),
        }
    }
}

impl Default for EnrichSection {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            bare_prefix_allowlist: Vec::new(),
            field_tag: default_field_tag(),
        }
    }
}

impl PipelineConfig {
    /// Load a config file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load a config file when given one; defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// The annotation-state query for the configured collection.
    pub fn annotation_query(&self) -> KbQuery {
        KbQuery::AnnotationState {
            membership: self.kb.membership_property.clone(),
            collection: self.kb.collection.clone(),
            short_name: self.kb.short_name_property.clone(),
            predicates: self.kb.predicates.clone(),
            target: self.kb.annotation_target.clone(),
        }
    }

    /// The transitive-dependents query for the configured roots.
    pub fn dependents_query(&self) -> KbQuery {
        KbQuery::TransitiveDependents {
            roots: self.kb.roots.clone(),
            predicates: self.kb.predicates.clone(),
            short_name: self.kb.short_name_property.clone(),
        }
    }

    /// HTTP knowledge-base client per the `[kb]` section.
    pub fn knowledge_base(&self) -> HttpKnowledgeBase {
        HttpKnowledgeBase::new(
            self.kb.endpoint.clone(),
            Duration::from_secs(self.kb.timeout_secs),
        )
    }

    /// HTTP search counter per the `[search]` section.
    pub fn search_counter(&self) -> HttpSearchCounter {
        HttpSearchCounter::new(
            self.search.endpoint.clone(),
            self.search.database.clone(),
            Duration::from_secs(self.search.timeout_secs),
        )
    }

    /// Query-construction policy per the `[enrich]` section.
    pub fn query_policy(&self) -> QueryPolicy {
        QueryPolicy {
            bare_prefix_allowlist: self.enrich.bare_prefix_allowlist.iter().cloned().collect(),
            field_tag: self.enrich.field_tag.clone(),
        }
    }

    /// Enrichment options, with CLI overrides applied by the caller.
    pub fn enrich_options(&self, refresh: bool, batch_size: Option<usize>) -> EnrichOptions {
        EnrichOptions {
            refresh,
            batch_size: batch_size.unwrap_or(self.enrich.batch_size),
            retmax: Some(self.search.retmax),
        }
    }

    /// Merger configuration per the `[merge]` section.
    pub fn merge_config(&self) -> MergeConfig {
        MergeConfig {
            noise_prefixes: self.merge.noise_prefixes.clone(),
            retmax: Some(self.search.retmax),
        }
    }
}

// ---------------------------------------------------------------------------
// Local usage file
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct UsageFile {
    #[serde(default)]
    records: Vec<UsageRecord>,
}

#[derive(Debug, Deserialize)]
struct UsageRecord {
    prefix: String,
    version: Option<String>,
}

/// Load the local usage file: which registry prefixes are tracked locally,
/// and at which version. Records without a version are ignored.
pub fn load_usage(path: &Path) -> ConfigResult<BTreeMap<String, String>> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        source: e,
    })?;
    let file: UsageFile = toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(file
        .records
        .into_iter()
        .filter_map(|r| Some((r.prefix, r.version?)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_field() {
        let config = PipelineConfig::default();
        assert_eq!(config.kb.predicates, vec!["P1547", "P2283"]);
        assert_eq!(config.enrich.batch_size, 20);
        assert_eq!(config.search.retmax, 10);
        assert!(config.merge.noise_prefixes.is_empty());
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("litrank.toml");
        std::fs::write(
            &path,
            r#"
            [kb]
            roots = ["Q109302681", "Q116738064"]
            collection = "Q4117183"
            annotation_target = "Q112336713"

            [enrich]
            bare_prefix_allowlist = ["doid"]

            [merge]
            noise_prefixes = ["bio2bel-"]
            "#,
        )
        .unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.kb.roots.len(), 2);
        assert_eq!(config.kb.endpoint, default_kb_endpoint());
        assert_eq!(config.enrich.bare_prefix_allowlist, vec!["doid"]);
        assert_eq!(config.merge.noise_prefixes, vec!["bio2bel-"]);

        let query = config.dependents_query();
        assert!(query.to_sparql().contains("wd:Q109302681"));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("litrank.toml");
        std::fs::write(&path, "[kb\nbroken").unwrap();
        assert!(matches!(
            PipelineConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn usage_file_keeps_versioned_records_only() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("usage.toml");
        std::fs::write(
            &path,
            r#"
            [[records]]
            prefix = "doid"
            version = "1.5"

            [[records]]
            prefix = "chebi"
            "#,
        )
        .unwrap();

        let usage = load_usage(&path).unwrap();
        assert_eq!(usage.get("doid").map(String::as_str), Some("1.5"));
        assert!(!usage.contains_key("chebi"));
    }
}
