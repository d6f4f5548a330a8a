use crate::document_store::DocumentStore;
use crate::order_id_allocator::{NextOrderIdInput, OrderIdAllocator};
use chrono::{DateTime, Utc};
use common::domain::{CreateOrderInput, DomainError, DomainResult, GetOrderInput, Order};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub const ORDERS_COLLECTION: &str = "orders";

/// Order document as stored, keyed by the allocated order ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDocument {
    pub id: String,
    pub factory_key: String,
    pub sequence: u64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl From<OrderDocument> for Order {
    fn from(doc: OrderDocument) -> Self {
        Order {
            id: doc.id,
            factory_key: doc.factory_key,
            sequence: doc.sequence,
            created_by: doc.created_by,
            created_at: Some(doc.created_at),
        }
    }
}

/// Domain service for order creation and lookup
pub struct OrderService {
    allocator: Arc<OrderIdAllocator>,
    store: Arc<dyn DocumentStore>,
}

impl OrderService {
    pub fn new(allocator: Arc<OrderIdAllocator>, store: Arc<dyn DocumentStore>) -> Self {
        Self { allocator, store }
    }

    /// Create an order under a freshly allocated ID
    #[instrument(skip(self, input), fields(factory_key = %input.factory_key))]
    pub async fn create_order(&self, input: CreateOrderInput) -> DomainResult<Order> {
        debug!(factory_key = %input.factory_key, "creating order");

        if input.created_by.trim().is_empty() {
            return Err(DomainError::InvalidOrderCreator(
                "Order creator cannot be empty".to_string(),
            ));
        }

        let allocated = self
            .allocator
            .next_id(NextOrderIdInput {
                factory_key: input.factory_key,
            })
            .await?;

        let document = OrderDocument {
            id: allocated.order_id,
            factory_key: allocated.factory_key,
            sequence: allocated.sequence,
            created_by: input.created_by,
            created_at: Utc::now(),
        };
        let payload =
            serde_json::to_value(&document).map_err(|e| DomainError::RepositoryError(e.into()))?;
        self.store
            .set(ORDERS_COLLECTION, &document.id, payload)
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        info!(order_id = %document.id, "order created successfully");
        Ok(document.into())
    }

    /// Get an order by its allocated ID
    #[instrument(skip(self, input), fields(order_id = %input.order_id))]
    pub async fn get_order(&self, input: GetOrderInput) -> DomainResult<Order> {
        let value = self
            .store
            .get(ORDERS_COLLECTION, &input.order_id)
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?
            .ok_or_else(|| DomainError::OrderNotFound(input.order_id.clone()))?;

        let document: OrderDocument = serde_json::from_value(value).map_err(|e| {
            DomainError::RepositoryError(anyhow::anyhow!(
                "malformed order document for {}: {e}",
                input.order_id
            ))
        })?;
        Ok(document.into())
    }
}
