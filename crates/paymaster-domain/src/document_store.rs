use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

#[derive(Error, Debug)]
pub enum DocumentStoreError {
    #[error("Transaction conflict on {collection}/{key}")]
    Conflict { collection: String, key: String },

    #[error("Store backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Future returned by a transaction body.
pub type TransactionFuture<'t> =
    Pin<Box<dyn Future<Output = DocumentStoreResult<Value>> + Send + 't>>;

/// A transaction body: receives the transaction handle, performs reads and
/// buffered writes through it, and returns the value to hand back to the
/// caller once the transaction commits.
pub type TransactionBody =
    Box<dyn for<'t> FnOnce(&'t mut (dyn DocumentTransaction + 't)) -> TransactionFuture<'t> + Send>;

/// Handle passed to a transaction body.
///
/// Reads observe a consistent view of the documents they touch; writes take
/// effect only if the whole transaction commits.
#[async_trait]
pub trait DocumentTransaction: Send {
    /// Read a document within the transaction. `None` means the document
    /// does not exist.
    async fn read(&mut self, collection: &str, key: &str) -> DocumentStoreResult<Option<Value>>;

    /// Write a document within the transaction.
    async fn write(&mut self, collection: &str, key: &str, value: Value)
        -> DocumentStoreResult<()>;
}

/// Storage of named JSON documents grouped into collections.
/// Implementations can be in-memory, PostgreSQL, etc.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Get a document by key. `None` means the document does not exist.
    async fn get(&self, collection: &str, key: &str) -> DocumentStoreResult<Option<Value>>;

    /// Create or replace a document outside any transaction.
    async fn set(&self, collection: &str, key: &str, value: Value) -> DocumentStoreResult<()>;

    /// Run a body against a transaction handle and commit its effects
    /// atomically, or roll them back entirely.
    ///
    /// A concurrent transaction touching a document this one read surfaces as
    /// [`DocumentStoreError::Conflict`]; the store never retries on its own,
    /// retry policy belongs to the caller.
    async fn run_transaction(&self, body: TransactionBody) -> DocumentStoreResult<Value>;
}
