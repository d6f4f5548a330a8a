use crate::document_store::DocumentStore;
use async_trait::async_trait;
use common::auth::{RbacCatalog, RbacCatalogProvider};
use common::domain::{DomainError, DomainResult};
use std::sync::Arc;
use tracing::debug;

pub const APP_CONFIG_COLLECTION: &str = "app_config";
pub const RBAC_CATALOG_KEY: &str = "rbac_catalog";

/// Loads the RBAC catalog from its well-known document.
///
/// A deployment without the catalog document resolves to an empty catalog;
/// only a malformed document is an error.
pub struct DocumentRbacCatalogProvider {
    store: Arc<dyn DocumentStore>,
}

impl DocumentRbacCatalogProvider {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RbacCatalogProvider for DocumentRbacCatalogProvider {
    async fn get_catalog(&self) -> DomainResult<RbacCatalog> {
        let value = self
            .store
            .get(APP_CONFIG_COLLECTION, RBAC_CATALOG_KEY)
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;
        match value {
            Some(value) => serde_json::from_value(value).map_err(|e| {
                DomainError::RepositoryError(anyhow::anyhow!("malformed RBAC catalog document: {e}"))
            }),
            None => {
                debug!("no RBAC catalog document found, using empty catalog");
                Ok(RbacCatalog::default())
            }
        }
    }
}
