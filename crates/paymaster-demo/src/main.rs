mod config;

use common::auth::{
    Argon2PasswordService, AuthTokenProvider, JwtAuthTokenProvider, JwtConfig, LoginUserInput,
    PasswordService, RbacCatalogProvider,
};
use common::domain::{
    CreateOrderInput, DomainError, GetOrderInput, RegisterUserInput, UserRepository, UserRole,
};
use common::telemetry::{init_telemetry, TelemetryConfig};
use config::ServiceConfig;
use paymaster_domain::{
    DocumentRbacCatalogProvider, DocumentStore, DocumentUserRepository, FactoryCodeTable,
    InMemoryDocumentStore, OrderIdAllocator, OrderIdAllocatorConfig, OrderService, UserService,
    APP_CONFIG_COLLECTION, RBAC_CATALOG_KEY, USERS_COLLECTION,
};
use paymaster_postgres::{PostgresClient, PostgresConfig, PostgresDocumentStore};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    // Initialize configuration and tracing
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_telemetry(&TelemetryConfig {
        log_level: config.log_level.clone(),
    }) {
        eprintln!("Failed to initialize telemetry: {}", e);
        std::process::exit(1);
    }

    info!(store_backend = %config.store_backend, "Starting paymaster demo");
    debug!("Configuration: {:?}", config);

    let store = match build_store(&config).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to initialize document store: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run_demo(&config, store).await {
        error!("Demo failed: {}", e);
        std::process::exit(1);
    }

    info!("Demo complete");
}

async fn build_store(config: &ServiceConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match config.store_backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryDocumentStore::new())),
        "postgres" => {
            let client = PostgresClient::from_config(&PostgresConfig {
                host: config.postgres_host.clone(),
                port: config.postgres_port,
                database: config.postgres_database.clone(),
                username: config.postgres_username.clone(),
                password: config.postgres_password.clone(),
                max_pool_size: config.postgres_max_pool_size,
            })?;
            client.ping().await?;
            let store = PostgresDocumentStore::new(client);
            store.ensure_schema().await?;
            Ok(Arc::new(store))
        }
        other => anyhow::bail!("unknown store backend: {other}"),
    }
}

async fn run_demo(config: &ServiceConfig, store: Arc<dyn DocumentStore>) -> anyhow::Result<()> {
    seed_rbac_catalog(store.as_ref()).await?;

    let user_repository =
        Arc::new(DocumentUserRepository::new(Arc::clone(&store))) as Arc<dyn UserRepository>;
    let catalog_provider =
        Arc::new(DocumentRbacCatalogProvider::new(Arc::clone(&store))) as Arc<dyn RbacCatalogProvider>;
    let auth_token_provider = Arc::new(JwtAuthTokenProvider::new(JwtConfig::new(
        config.jwt_secret.clone(),
        config.jwt_expiration_hours,
    ))) as Arc<dyn AuthTokenProvider>;
    let password_service = Arc::new(Argon2PasswordService::new()) as Arc<dyn PasswordService>;
    let user_service = UserService::new(
        user_repository,
        catalog_provider,
        auth_token_provider,
        password_service,
    );

    let allocator = Arc::new(OrderIdAllocator::new(
        Arc::clone(&store),
        factory_codes(),
        OrderIdAllocatorConfig {
            retry_delay_ms: config.allocator_retry_delay_ms,
            retry_jitter_ms: config.allocator_retry_jitter_ms,
            max_retry_attempts: config.allocator_max_retry_attempts,
        },
    ));
    let order_service = Arc::new(OrderService::new(allocator, Arc::clone(&store)));

    // Register the demo user; reruns against a persistent store are fine
    let registered = user_service
        .register_user(RegisterUserInput {
            email: config.demo_email.clone(),
            password: config.demo_password.clone(),
            name: config.demo_name.clone(),
            role: UserRole::User,
        })
        .await;
    match registered {
        Ok(user) => info!(user_id = %user.id, "registered demo user"),
        Err(DomainError::UserAlreadyExists(_)) => {
            info!(email = %config.demo_email, "demo user already registered")
        }
        Err(e) => return Err(e.into()),
    }

    grant_tree_permissions(store.as_ref(), &config.demo_email).await?;

    // First login after the grant derives the permission structures from the
    // tree and migrates them onto the user record
    let login = user_service
        .login_user(LoginUserInput {
            email: config.demo_email.clone(),
            password: config.demo_password.clone(),
        })
        .await?;
    info!(
        user_id = %login.user_id,
        permissions = ?login.permissions,
        "demo user logged in"
    );
    info!(
        factories = ?login.permission_metadata.factories,
        departments = ?login.permission_metadata.departments,
        "resolved permission metadata"
    );

    // Concurrent burst of order creations against one factory
    let mut join_set = JoinSet::new();
    for _ in 0..config.order_burst {
        let order_service = Arc::clone(&order_service);
        let factory_key = config.factory_key.clone();
        let created_by = login.user_id.clone();
        join_set.spawn(async move {
            order_service
                .create_order(CreateOrderInput {
                    factory_key,
                    created_by,
                })
                .await
        });
    }

    let mut order_ids = BTreeSet::new();
    while let Some(result) = join_set.join_next().await {
        let order = result??;
        debug!(order_id = %order.id, sequence = order.sequence, "order created");
        order_ids.insert(order.id);
    }

    if order_ids.len() != config.order_burst {
        anyhow::bail!(
            "expected {} distinct order IDs, got {}",
            config.order_burst,
            order_ids.len()
        );
    }
    info!(
        count = order_ids.len(),
        first = ?order_ids.first(),
        last = ?order_ids.last(),
        "burst allocated distinct order IDs"
    );

    if let Some(order_id) = order_ids.first() {
        let order = order_service
            .get_order(GetOrderInput {
                order_id: order_id.clone(),
            })
            .await?;
        info!(order_id = %order.id, factory_key = %order.factory_key, "fetched order back");
    }

    Ok(())
}

async fn seed_rbac_catalog(store: &dyn DocumentStore) -> anyhow::Result<()> {
    store
        .set(
            APP_CONFIG_COLLECTION,
            RBAC_CATALOG_KEY,
            json!({
                "gulbarga": {
                    "document_name": "GLB",
                    "services": {
                        "humanresource": ["single_processing", "batch_processing"],
                        "payroll": ["payslips"]
                    }
                },
                "bellary": {
                    "document_name": "BLY",
                    "services": {
                        "accounts": ["ledger"]
                    }
                }
            }),
        )
        .await?;
    Ok(())
}

/// Grant tree-shaped permissions directly on the stored user document, the way
/// records written by the previous back office look.
async fn grant_tree_permissions(store: &dyn DocumentStore, email: &str) -> anyhow::Result<()> {
    let mut document = store
        .get(USERS_COLLECTION, email)
        .await?
        .ok_or_else(|| anyhow::anyhow!("demo user document missing: {email}"))?;
    document["tree_permissions"] = json!({
        "gulbarga.humanresource.single_processing": true,
        "gulbarga.humanresource.batch_processing": false,
        "bellary.accounts.ledger": true,
    });
    store.set(USERS_COLLECTION, email, document).await?;
    Ok(())
}

fn factory_codes() -> FactoryCodeTable {
    FactoryCodeTable::new(BTreeMap::from([
        ("gulbarga".to_string(), "GBA".to_string()),
        ("bellary".to_string(), "BLY".to_string()),
    ]))
}
