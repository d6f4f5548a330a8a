use crate::domain::DomainResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One factory's entry in the centralized RBAC catalog.
///
/// `document_name` is the factory's canonical short form; lowercased it
/// prefixes department names in permission metadata. `services` maps each
/// department to the services it exposes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryRbacEntry {
    pub document_name: String,
    #[serde(default)]
    pub services: BTreeMap<String, Vec<String>>,
}

/// Centralized factory/department/service catalog.
///
/// Admin-class users are defined by this catalog: their permissions are
/// regenerated from it on every resolution, ignoring stored per-user grants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RbacCatalog(pub BTreeMap<String, FactoryRbacEntry>);

impl RbacCatalog {
    pub fn new(entries: BTreeMap<String, FactoryRbacEntry>) -> Self {
        Self(entries)
    }

    pub fn entries(&self) -> &BTreeMap<String, FactoryRbacEntry> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Canonical short form for a factory: the catalog `document_name`
    /// lowercased. A factory missing from the catalog falls back to its raw
    /// key lowercased rather than failing the resolution.
    pub fn short_form(&self, factory_key: &str) -> String {
        self.0
            .get(factory_key)
            .map(|entry| entry.document_name.to_lowercase())
            .unwrap_or_else(|| factory_key.to_lowercase())
    }
}

/// Provider of the RBAC catalog, loaded once per resolution call.
/// Callers may cache; the core does not assume caching.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RbacCatalogProvider: Send + Sync {
    async fn get_catalog(&self) -> DomainResult<RbacCatalog>;
}
