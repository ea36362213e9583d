//! # litrank
//!
//! Reconciles resource identifiers from a local registry against an external
//! knowledge base, tracks annotation state, counts literature mentions per
//! entity through a resumable enrichment loop, and ranks the dependents of a
//! root set of software by those counts.
//!
//! ## Architecture
//!
//! - **Identifier normalization** (`ident`): every cross-source comparison
//!   goes through one normalized form
//! - **Annotation tracking** (`annotation`): exclusion set from the knowledge
//!   base's view, plus proposals for what is still missing upstream
//! - **Resumable enrichment** (`enrich`): blocking search calls folded into a
//!   checkpointed frequency table (`table`)
//! - **Merge and rank** (`merge`, `rank`): join the dependents graph against
//!   the table, fill gaps by fallback search, emit a ranked report
//! - **Collaborators** (`kb`, `search`, `registry`): thin synchronous
//!   wrappers behind traits, so tests script them
//!
//! ## Library usage
//!
//! ```
//! use litrank::enrich::{Candidate, QueryPolicy};
//!
//! let policy = QueryPolicy {
//!     field_tag: "[tw]".into(),
//!     ..Default::default()
//! };
//! let candidate = Candidate {
//!     key: "doid".into(),
//!     entity: None,
//!     name: "Human Disease Ontology".into(),
//!     preferred_prefix: None,
//! };
//! assert_eq!(policy.build_query(&candidate), "\"Human Disease Ontology\"[tw]");
//! ```

pub mod annotation;
pub mod config;
pub mod deps;
pub mod enrich;
pub mod error;
pub mod ident;
pub mod kb;
pub mod merge;
pub mod paths;
pub mod pipeline;
pub mod rank;
pub mod registry;
pub mod search;
pub mod table;
