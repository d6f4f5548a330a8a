use crate::document_store::{DocumentStore, DocumentStoreError, TransactionBody};
use crate::factory_code::FactoryCodeTable;
use crate::order_id_allocator_config::OrderIdAllocatorConfig;
use common::domain::{DomainError, DomainResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

pub const ORDER_COUNTERS_COLLECTION: &str = "order_counters";

/// Fixed width of the zero-padded numeric part of an order ID.
pub const SEQUENCE_PAD_WIDTH: usize = 5;

/// Largest sequence the fixed width can represent. Crossing it fails the
/// allocation rather than widening or truncating IDs.
pub const MAX_SEQUENCE: u64 = 99_999;

/// Per-factory counter document. `last_sequence` only moves forward, and only
/// under a document transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCounterDocument {
    pub factory_key: String,
    pub last_sequence: u64,
}

/// Input for allocating the next order ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextOrderIdInput {
    pub factory_key: String,
}

/// A successfully allocated order ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedOrderId {
    pub order_id: String,
    pub factory_key: String,
    pub sequence: u64,
}

/// Issues unique, gap-free order IDs per factory.
///
/// Uniqueness under concurrent callers rests entirely on the store's
/// transaction isolation; the allocator holds no in-process locks. Conflicted
/// commits are retried with jittered backoff up to the configured budget.
pub struct OrderIdAllocator {
    store: Arc<dyn DocumentStore>,
    codes: FactoryCodeTable,
    config: OrderIdAllocatorConfig,
}

impl OrderIdAllocator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        codes: FactoryCodeTable,
        config: OrderIdAllocatorConfig,
    ) -> Self {
        Self {
            store,
            codes,
            config,
        }
    }

    /// Allocate the next order ID for a factory.
    ///
    /// Returns `OrderIdAllocationFailed` once the retry budget is exhausted;
    /// the caller must not assume any ID was reserved in that case.
    #[instrument(skip(self, input), fields(factory_key = %input.factory_key))]
    pub async fn next_id(&self, input: NextOrderIdInput) -> DomainResult<AllocatedOrderId> {
        if input.factory_key.trim().is_empty() {
            return Err(DomainError::InvalidFactoryKey(
                "Factory key cannot be empty".to_string(),
            ));
        }

        let mut attempt: u32 = 0;
        loop {
            match self.try_allocate(&input.factory_key).await {
                Ok(sequence) => {
                    if sequence > MAX_SEQUENCE {
                        return Err(DomainError::OrderSequenceOverflow(
                            input.factory_key.clone(),
                            sequence,
                        ));
                    }
                    let order_id = format!(
                        "{}-{:0width$}",
                        self.codes.prefix(&input.factory_key),
                        sequence,
                        width = SEQUENCE_PAD_WIDTH
                    );
                    debug!(order_id = %order_id, sequence, "allocated order ID");
                    return Ok(AllocatedOrderId {
                        order_id,
                        factory_key: input.factory_key.clone(),
                        sequence,
                    });
                }
                Err(DocumentStoreError::Conflict { .. }) => {
                    attempt += 1;
                    if attempt > self.config.max_retry_attempts {
                        return Err(DomainError::OrderIdAllocationFailed(
                            input.factory_key.clone(),
                            format!(
                                "counter transaction still conflicted after {} retries",
                                self.config.max_retry_attempts
                            ),
                        ));
                    }
                    warn!(
                        attempt,
                        max_retry_attempts = self.config.max_retry_attempts,
                        "counter transaction conflict, retrying"
                    );
                    let jitter_ms = rand::thread_rng().gen_range(0..=self.config.retry_jitter_ms);
                    tokio::time::sleep(self.config.retry_delay() + Duration::from_millis(jitter_ms))
                        .await;
                }
                Err(e) => {
                    return Err(DomainError::OrderIdAllocationFailed(
                        input.factory_key.clone(),
                        e.to_string(),
                    ));
                }
            }
        }
    }

    /// One transactional read-modify-write of the factory counter.
    async fn try_allocate(&self, factory_key: &str) -> Result<u64, DocumentStoreError> {
        let key = factory_key.to_string();
        let body: TransactionBody = Box::new(move |tx| {
            Box::pin(async move {
                let current = tx.read(ORDER_COUNTERS_COLLECTION, &key).await?;
                // A missing counter starts the factory's sequence at zero; a
                // counter that exists but fails to parse is corrupted state
                // and must never silently restart the sequence.
                let last_sequence = match current {
                    Some(value) => {
                        let counter: OrderCounterDocument = serde_json::from_value(value)
                            .map_err(|e| {
                                DocumentStoreError::Backend(anyhow::anyhow!(
                                    "malformed counter document for {key}: {e}"
                                ))
                            })?;
                        counter.last_sequence
                    }
                    None => 0,
                };
                let next = last_sequence + 1;
                let counter = OrderCounterDocument {
                    factory_key: key.clone(),
                    last_sequence: next,
                };
                let payload = serde_json::to_value(&counter)
                    .map_err(|e| DocumentStoreError::Backend(e.into()))?;
                tx.write(ORDER_COUNTERS_COLLECTION, &key, payload).await?;
                Ok(serde_json::json!(next))
            })
        });

        let committed = self.store.run_transaction(body).await?;
        committed.as_u64().ok_or_else(|| {
            DocumentStoreError::Backend(anyhow::anyhow!(
                "counter transaction returned a non-numeric sequence"
            ))
        })
    }
}
