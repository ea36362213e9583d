//! Local resource registry: the source of truth for candidate entities.
//!
//! The registry is loaded once per run from a JSON dump (an array of resource
//! records) and is read-only afterwards. Deprecated resources are filtered out
//! at load time, before any other component sees them.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RegistryError;
use crate::ident;

/// A registry resource record.
///
/// `prefix` is the registry-local key. `external_prefix` is the short name the
/// external knowledge base knows this resource by, and `entity` is the
/// knowledge-base entity id, when a mapping has been curated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub prefix: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
}

/// The loaded registry: non-deprecated resources in dump order.
#[derive(Debug, Clone)]
pub struct Registry {
    resources: Vec<Resource>,
}

pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

impl Registry {
    /// Load a registry dump from a JSON file, dropping deprecated resources.
    pub fn load(path: &Path) -> RegistryResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RegistryError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let all: Vec<Resource> =
            serde_json::from_str(&content).map_err(|e| RegistryError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        Ok(Self::from_resources(all))
    }

    /// Build a registry from in-memory records, dropping deprecated resources.
    pub fn from_resources(all: Vec<Resource>) -> Self {
        let total = all.len();
        let resources: Vec<Resource> = all.into_iter().filter(|r| !r.deprecated).collect();
        debug!(
            kept = resources.len(),
            dropped = total - resources.len(),
            "loaded registry"
        );
        Self { resources }
    }

    /// Non-deprecated resources in dump order.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Map from normalized registry prefix to knowledge-base entity id, for
    /// resources that carry a curated entity mapping.
    pub fn entity_map(&self) -> BTreeMap<String, String> {
        self.resources
            .iter()
            .filter_map(|r| {
                let entity = r.entity.clone()?;
                let key = ident::normalize(&r.prefix).ok()?;
                Some((key, entity))
            })
            .collect()
    }

    /// Number of loaded (non-deprecated) resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
