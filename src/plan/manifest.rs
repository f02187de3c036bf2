//! Declared caches.

use serde::{Deserialize, Serialize};

pub const QUERY_RESULTS_REGION: &str = "default-query-results-region";
pub const UPDATE_TIMESTAMPS_REGION: &str = "default-update-timestamps-region";

/// Static list of the caches the runtime should create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheManifest {
    /// Fully qualified entity type names; each gets a cache of the same name.
    pub entities: Vec<String>,
    /// Field-level collection caches, named `owner.field`.
    pub collections: Vec<CollectionCache>,
    /// Query result regions.
    pub query_regions: Vec<String>,
    /// Any other application-defined cache names.
    pub namespaces: Vec<String>,
    pub include_collections: bool,
    /// Adds the query-results and update-timestamps regions.
    pub include_hibernate_regions: bool,
}

impl Default for CacheManifest {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            collections: Vec::new(),
            query_regions: Vec::new(),
            namespaces: Vec::new(),
            include_collections: true,
            include_hibernate_regions: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionCache {
    pub owner: String,
    pub field: String,
}

impl CollectionCache {
    pub fn new(owner: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            field: field.into(),
        }
    }

    pub fn cache_name(&self) -> String {
        format!("{}.{}", self.owner.trim(), self.field.trim())
    }
}

/// Where a planned cache came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheOrigin {
    Entity,
    Collection,
    QueryRegion,
    Namespace,
    BuiltIn,
}
