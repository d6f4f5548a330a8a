use crate::document_store::{DocumentStore, DocumentStoreError, TransactionBody};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::domain::{
    DomainError, DomainResult, GetUserByEmailInput, PermissionSet, PermissionTree,
    RegisterUserInputWithId, UpdateUserPermissionsInput, User, UserRepository, UserRole,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument};

pub const USERS_COLLECTION: &str = "users";

/// User document as stored, keyed by email.
///
/// `tree_permissions` keeps raw JSON leaves: user records written by older
/// tooling carry strings and numbers there, and only the boolean `true` is a
/// grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDocument {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
    #[serde(default)]
    pub tree_permissions: BTreeMap<String, Value>,
    #[serde(default)]
    pub permissions: PermissionSet,
    #[serde(default)]
    pub permission_metadata: PermissionTree,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserDocument> for User {
    fn from(doc: UserDocument) -> Self {
        let tree_permissions = doc
            .tree_permissions
            .into_iter()
            .map(|(key, value)| (key, matches!(value, Value::Bool(true))))
            .collect();
        User {
            id: doc.id,
            email: doc.email,
            password_hash: doc.password_hash,
            name: doc.name,
            role: doc.role,
            tree_permissions,
            permissions: doc.permissions,
            permission_metadata: doc.permission_metadata,
            created_at: Some(doc.created_at),
            updated_at: Some(doc.updated_at),
        }
    }
}

/// User repository backed by a document store.
pub struct DocumentUserRepository {
    store: Arc<dyn DocumentStore>,
}

impl DocumentUserRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn decode_user(email: &str, value: Value) -> DomainResult<User> {
        let document: UserDocument = serde_json::from_value(value).map_err(|e| {
            DomainError::RepositoryError(anyhow::anyhow!(
                "malformed user document for {email}: {e}"
            ))
        })?;
        Ok(document.into())
    }
}

#[async_trait]
impl UserRepository for DocumentUserRepository {
    #[instrument(skip(self, input), fields(user_id = %input.id, email = %input.email))]
    async fn register_user(&self, input: RegisterUserInputWithId) -> DomainResult<User> {
        let now = Utc::now();
        let document = UserDocument {
            id: input.id.clone(),
            email: input.email.clone(),
            password_hash: input.password_hash.clone(),
            name: input.name.clone(),
            role: input.role,
            tree_permissions: BTreeMap::new(),
            permissions: PermissionSet::new(),
            permission_metadata: PermissionTree::default(),
            created_at: now,
            updated_at: now,
        };
        let payload =
            serde_json::to_value(&document).map_err(|e| DomainError::RepositoryError(e.into()))?;

        // Create-if-absent inside one transaction so two concurrent
        // registrations of the same email cannot both win.
        let email = input.email.clone();
        let body: TransactionBody = Box::new(move |tx| {
            Box::pin(async move {
                if tx.read(USERS_COLLECTION, &email).await?.is_some() {
                    return Ok(Value::Bool(false));
                }
                tx.write(USERS_COLLECTION, &email, payload).await?;
                Ok(Value::Bool(true))
            })
        });

        let created = match self.store.run_transaction(body).await {
            Ok(created) => created,
            // A conflict here means another registration of the same email
            // committed first.
            Err(DocumentStoreError::Conflict { .. }) => {
                return Err(DomainError::UserAlreadyExists(input.email));
            }
            Err(e) => return Err(DomainError::RepositoryError(e.into())),
        };
        if created != Value::Bool(true) {
            return Err(DomainError::UserAlreadyExists(input.email));
        }

        debug!(user_id = %input.id, "user registered in document store");
        Ok(document.into())
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    async fn get_user_by_email(&self, input: GetUserByEmailInput) -> DomainResult<Option<User>> {
        let value = self
            .store
            .get(USERS_COLLECTION, &input.email)
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;
        match value {
            Some(value) => Ok(Some(Self::decode_user(&input.email, value)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    async fn update_user_permissions(&self, input: UpdateUserPermissionsInput) -> DomainResult<()> {
        let value = self
            .store
            .get(USERS_COLLECTION, &input.email)
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?
            .ok_or_else(|| DomainError::UserNotFound(input.email.clone()))?;

        let mut document: UserDocument = serde_json::from_value(value).map_err(|e| {
            DomainError::RepositoryError(anyhow::anyhow!(
                "malformed user document for {}: {e}",
                input.email
            ))
        })?;
        document.permissions = input.permissions;
        document.permission_metadata = input.permission_metadata;
        document.updated_at = Utc::now();

        let payload =
            serde_json::to_value(&document).map_err(|e| DomainError::RepositoryError(e.into()))?;
        self.store
            .set(USERS_COLLECTION, &input.email, payload)
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!(email = %input.email, "persisted derived permission structures");
        Ok(())
    }
}
