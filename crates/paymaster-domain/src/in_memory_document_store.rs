use crate::document_store::{
    DocumentStore, DocumentStoreError, DocumentStoreResult, DocumentTransaction, TransactionBody,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct VersionedDocument {
    version: u64,
    value: Value,
}

type DocumentMap = HashMap<String, HashMap<String, VersionedDocument>>;

/// In-memory document store with per-document versions and optimistic
/// transactions. Complete enough for tests and single-process deployments.
pub struct InMemoryDocumentStore {
    documents: Arc<RwLock<DocumentMap>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Transaction handle that records the version of every document it read and
/// buffers writes until commit.
struct InMemoryTransaction {
    documents: Arc<RwLock<DocumentMap>>,
    reads: Vec<(String, String, u64)>,
    writes: Vec<(String, String, Value)>,
}

#[async_trait]
impl DocumentTransaction for InMemoryTransaction {
    async fn read(&mut self, collection: &str, key: &str) -> DocumentStoreResult<Option<Value>> {
        let documents = self.documents.read().await;
        let entry = documents.get(collection).and_then(|c| c.get(key));
        // A missing document is observed at version 0 so a concurrent create
        // still conflicts with this transaction.
        let (version, value) = match entry {
            Some(doc) => (doc.version, Some(doc.value.clone())),
            None => (0, None),
        };
        self.reads
            .push((collection.to_string(), key.to_string(), version));
        Ok(value)
    }

    async fn write(
        &mut self,
        collection: &str,
        key: &str,
        value: Value,
    ) -> DocumentStoreResult<()> {
        self.writes
            .push((collection.to_string(), key.to_string(), value));
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, key: &str) -> DocumentStoreResult<Option<Value>> {
        let documents = self.documents.read().await;
        Ok(documents
            .get(collection)
            .and_then(|c| c.get(key))
            .map(|doc| doc.value.clone()))
    }

    async fn set(&self, collection: &str, key: &str, value: Value) -> DocumentStoreResult<()> {
        let mut documents = self.documents.write().await;
        let entry = documents
            .entry(collection.to_string())
            .or_default()
            .entry(key.to_string())
            .or_insert(VersionedDocument {
                version: 0,
                value: Value::Null,
            });
        entry.version += 1;
        entry.value = value;
        Ok(())
    }

    async fn run_transaction(&self, body: TransactionBody) -> DocumentStoreResult<Value> {
        let mut tx = InMemoryTransaction {
            documents: Arc::clone(&self.documents),
            reads: Vec::new(),
            writes: Vec::new(),
        };

        // A body error aborts before any buffered write is applied.
        let output = body(&mut tx).await?;
        let InMemoryTransaction { reads, writes, .. } = tx;

        let mut documents = self.documents.write().await;
        for (collection, key, observed) in &reads {
            let current = documents
                .get(collection)
                .and_then(|c| c.get(key))
                .map(|doc| doc.version)
                .unwrap_or(0);
            if current != *observed {
                return Err(DocumentStoreError::Conflict {
                    collection: collection.clone(),
                    key: key.clone(),
                });
            }
        }
        for (collection, key, value) in writes {
            let entry = documents
                .entry(collection)
                .or_default()
                .entry(key)
                .or_insert(VersionedDocument {
                    version: 0,
                    value: Value::Null,
                });
            entry.version += 1;
            entry.value = value;
        }

        Ok(output)
    }
}
