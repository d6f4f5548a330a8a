use paymaster_domain::{
    DocumentStore, DocumentStoreError, FactoryCodeTable, NextOrderIdInput, OrderIdAllocator,
    OrderIdAllocatorConfig, TransactionBody, ORDER_COUNTERS_COLLECTION,
};
use paymaster_postgres::{PostgresClient, PostgresDocumentStore};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;
use tokio::task::JoinSet;

async fn setup_test_store() -> (ContainerAsync<Postgres>, Arc<PostgresDocumentStore>) {
    let postgres = Postgres::default().start().await.unwrap();
    let host = postgres.get_host().await.unwrap();
    let port = postgres.get_host_port_ipv4(5432).await.unwrap();

    let client = PostgresClient::new(
        &host.to_string(),
        port,
        "postgres",
        "postgres",
        "postgres",
        5,
    )
    .unwrap();
    client.ping().await.unwrap();

    let store = PostgresDocumentStore::new(client);
    store.ensure_schema().await.unwrap();

    (postgres, Arc::new(store))
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_set_then_get_round_trips() {
    let (_container, store) = setup_test_store().await;

    store
        .set("users", "a@example.com", json!({"name": "A", "role": "user"}))
        .await
        .unwrap();

    let value = store.get("users", "a@example.com").await.unwrap();
    assert_eq!(value, Some(json!({"name": "A", "role": "user"})));

    let missing = store.get("users", "nobody@example.com").await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_set_replaces_existing_document() {
    let (_container, store) = setup_test_store().await;

    store.set("counters", "x", json!({"n": 1})).await.unwrap();
    store.set("counters", "x", json!({"n": 2})).await.unwrap();

    let value = store.get("counters", "x").await.unwrap();
    assert_eq!(value, Some(json!({"n": 2})));
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_transaction_commits_read_modify_write() {
    let (_container, store) = setup_test_store().await;
    store.set("counters", "x", json!({"n": 41})).await.unwrap();

    let body: TransactionBody = Box::new(|tx| {
        Box::pin(async move {
            let current = tx.read("counters", "x").await?.unwrap_or(json!({"n": 0}));
            let n = current["n"].as_u64().unwrap() + 1;
            tx.write("counters", "x", json!({ "n": n })).await?;
            Ok(json!(n))
        })
    });

    let output = store.run_transaction(body).await.unwrap();
    assert_eq!(output, json!(42));
    let value = store.get("counters", "x").await.unwrap();
    assert_eq!(value, Some(json!({"n": 42})));
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_transaction_conflicts_when_read_document_changes() {
    let (_container, store) = setup_test_store().await;
    store.set("counters", "x", json!({"n": 1})).await.unwrap();

    // The body observes the document, then an out-of-band write on a second
    // connection lands before the transaction finishes.
    let racing_store = Arc::clone(&store);
    let body: TransactionBody = Box::new(move |tx| {
        Box::pin(async move {
            let _ = tx.read("counters", "x").await?;
            racing_store.set("counters", "x", json!({"n": 99})).await?;
            tx.write("counters", "x", json!({"n": 2})).await?;
            Ok(Value::Null)
        })
    });

    let result = store.run_transaction(body).await;
    assert!(matches!(result, Err(DocumentStoreError::Conflict { .. })));

    // The transactional write never landed.
    let value = store.get("counters", "x").await.unwrap();
    assert_eq!(value, Some(json!({"n": 99})));
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_transaction_body_error_rolls_back_writes() {
    let (_container, store) = setup_test_store().await;
    store.set("counters", "x", json!({"n": 1})).await.unwrap();

    let body: TransactionBody = Box::new(|tx| {
        Box::pin(async move {
            tx.write("counters", "x", json!({"n": 100})).await?;
            Err(DocumentStoreError::Backend(anyhow::anyhow!("boom")))
        })
    });

    let result = store.run_transaction(body).await;
    assert!(matches!(result, Err(DocumentStoreError::Backend(_))));
    let value = store.get("counters", "x").await.unwrap();
    assert_eq!(value, Some(json!({"n": 1})));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_concurrent_order_id_allocation() {
    let (_container, store) = setup_test_store().await;

    let codes = FactoryCodeTable::new(BTreeMap::from([(
        "gulbarga".to_string(),
        "GBA".to_string(),
    )]));
    let config = OrderIdAllocatorConfig {
        retry_delay_ms: 5,
        retry_jitter_ms: 10,
        max_retry_attempts: 64,
    };
    let allocator = Arc::new(OrderIdAllocator::new(
        Arc::clone(&store) as Arc<dyn DocumentStore>,
        codes,
        config,
    ));

    let mut join_set = JoinSet::new();
    for _ in 0..8 {
        let allocator = Arc::clone(&allocator);
        join_set.spawn(async move {
            allocator
                .next_id(NextOrderIdInput {
                    factory_key: "gulbarga".to_string(),
                })
                .await
                .unwrap()
        });
    }

    let mut order_ids = BTreeSet::new();
    let mut sequences = BTreeSet::new();
    while let Some(result) = join_set.join_next().await {
        let allocated = result.unwrap();
        order_ids.insert(allocated.order_id);
        sequences.insert(allocated.sequence);
    }

    assert_eq!(order_ids.len(), 8, "all order IDs must be distinct");
    let expected: BTreeSet<u64> = (1..=8).collect();
    assert_eq!(sequences, expected, "sequences must be exactly 1..=8");
    assert!(order_ids.contains("GBA-00001"));
    assert!(order_ids.contains("GBA-00008"));

    let counter = store
        .get(ORDER_COUNTERS_COLLECTION, "gulbarga")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(counter["last_sequence"], json!(8));
}
