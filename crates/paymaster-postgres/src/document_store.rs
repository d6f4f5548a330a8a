use crate::client::PostgresClient;
use async_trait::async_trait;
use paymaster_domain::{
    DocumentStore, DocumentStoreError, DocumentStoreResult, DocumentTransaction, TransactionBody,
};
use serde_json::Value;
use tokio_postgres::error::SqlState;
use tokio_postgres::IsolationLevel;
use tracing::debug;

const SELECT_SQL: &str = "SELECT payload FROM documents WHERE collection = $1 AND key = $2";

const UPSERT_SQL: &str = "INSERT INTO documents (collection, key, payload, version)
     VALUES ($1, $2, $3, 1)
     ON CONFLICT (collection, key)
     DO UPDATE SET payload = EXCLUDED.payload,
                   version = documents.version + 1,
                   updated_at = now()";

/// Document store backed by a PostgreSQL `documents` table.
///
/// Transactions run at SERIALIZABLE isolation, so any two concurrent
/// transactions racing on the same documents fail one side with a
/// serialization error, surfaced as [`DocumentStoreError::Conflict`].
#[derive(Clone)]
pub struct PostgresDocumentStore {
    client: PostgresClient,
}

impl PostgresDocumentStore {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }

    /// Creates the `documents` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        let conn = self.client.get_connection().await?;
        conn.batch_execute(
            "CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                key TEXT NOT NULL,
                payload JSONB NOT NULL,
                version BIGINT NOT NULL DEFAULT 1,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                PRIMARY KEY (collection, key)
            )",
        )
        .await?;
        debug!("documents table ready");
        Ok(())
    }
}

fn is_conflict(e: &tokio_postgres::Error) -> bool {
    e.code()
        .map(|code| {
            *code == SqlState::T_R_SERIALIZATION_FAILURE || *code == SqlState::UNIQUE_VIOLATION
        })
        .unwrap_or(false)
}

fn conflict_or_backend(e: tokio_postgres::Error, collection: &str, key: &str) -> DocumentStoreError {
    if is_conflict(&e) {
        DocumentStoreError::Conflict {
            collection: collection.to_string(),
            key: key.to_string(),
        }
    } else {
        DocumentStoreError::Backend(e.into())
    }
}

/// Transaction handle wrapping a SERIALIZABLE PostgreSQL transaction.
///
/// `touched` remembers the first document the body accessed so a conflict
/// detected at commit can still name a document.
struct PostgresDocumentTransaction<'a> {
    tx: deadpool_postgres::Transaction<'a>,
    touched: Option<(String, String)>,
}

impl PostgresDocumentTransaction<'_> {
    fn touch(&mut self, collection: &str, key: &str) {
        if self.touched.is_none() {
            self.touched = Some((collection.to_string(), key.to_string()));
        }
    }
}

#[async_trait]
impl DocumentTransaction for PostgresDocumentTransaction<'_> {
    async fn read(&mut self, collection: &str, key: &str) -> DocumentStoreResult<Option<Value>> {
        self.touch(collection, key);
        let row = self
            .tx
            .query_opt(SELECT_SQL, &[&collection, &key])
            .await
            .map_err(|e| conflict_or_backend(e, collection, key))?;
        Ok(row.map(|row| row.get("payload")))
    }

    async fn write(
        &mut self,
        collection: &str,
        key: &str,
        value: Value,
    ) -> DocumentStoreResult<()> {
        self.touch(collection, key);
        self.tx
            .execute(UPSERT_SQL, &[&collection, &key, &value])
            .await
            .map_err(|e| conflict_or_backend(e, collection, key))?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn get(&self, collection: &str, key: &str) -> DocumentStoreResult<Option<Value>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DocumentStoreError::Backend)?;
        let row = conn
            .query_opt(SELECT_SQL, &[&collection, &key])
            .await
            .map_err(|e| conflict_or_backend(e, collection, key))?;
        Ok(row.map(|row| row.get("payload")))
    }

    async fn set(&self, collection: &str, key: &str, value: Value) -> DocumentStoreResult<()> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DocumentStoreError::Backend)?;
        conn.execute(UPSERT_SQL, &[&collection, &key, &value])
            .await
            .map_err(|e| conflict_or_backend(e, collection, key))?;
        Ok(())
    }

    async fn run_transaction(&self, body: TransactionBody) -> DocumentStoreResult<Value> {
        let mut conn = self
            .client
            .get_connection()
            .await
            .map_err(DocumentStoreError::Backend)?;
        let tx = conn
            .build_transaction()
            .isolation_level(IsolationLevel::Serializable)
            .start()
            .await
            .map_err(|e| DocumentStoreError::Backend(e.into()))?;

        let mut handle = PostgresDocumentTransaction { tx, touched: None };
        // A body error drops the handle, which rolls the transaction back.
        let output = body(&mut handle).await?;

        let PostgresDocumentTransaction { tx, touched } = handle;
        let (collection, key) = touched.unwrap_or_default();
        tx.commit()
            .await
            .map_err(|e| conflict_or_backend(e, &collection, &key))?;
        Ok(output)
    }
}
