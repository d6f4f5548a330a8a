use crate::domain::permission::{PermissionSet, PermissionTree};
use crate::domain::result::DomainResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Role a user holds within the back office.
///
/// Catalog-driven roles get their permissions regenerated from the RBAC
/// catalog on every resolution; stored grants are ignored for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserRole {
    User,
    Admin,
    SuperAdmin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
            UserRole::SuperAdmin => "super-admin",
        }
    }

    /// Admin and super-admin are defined by the catalog, not by per-user grants.
    pub fn is_catalog_driven(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::SuperAdmin)
    }
}

/// User domain entity
///
/// `tree_permissions` carries leaf grants keyed `"factory.department.service"`.
/// Stored leaves that are not exactly boolean `true` are loaded as `false` and
/// never grant anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
    pub tree_permissions: BTreeMap<String, bool>,
    pub permissions: PermissionSet,
    pub permission_metadata: PermissionTree,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// External input for registering a user (no ID, plaintext password)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterUserInput {
    pub email: String,
    pub password: String, // Plaintext - will be hashed by domain service
    pub name: String,
    pub role: UserRole,
}

/// Internal input with generated ID and hashed password
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterUserInputWithId {
    pub id: String,
    pub email: String,
    pub password_hash: String, // Already hashed
    pub name: String,
    pub role: UserRole,
}

/// Input for getting a user by email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetUserByEmailInput {
    pub email: String,
}

/// Input for the one-time write-back of derived permission structures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateUserPermissionsInput {
    pub email: String,
    pub permissions: PermissionSet,
    pub permission_metadata: PermissionTree,
}

/// Repository trait for user storage operations
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Register a new user (id and password_hash already generated/hashed by domain service)
    async fn register_user(&self, input: RegisterUserInputWithId) -> DomainResult<User>;

    /// Get a user by email
    async fn get_user_by_email(&self, input: GetUserByEmailInput) -> DomainResult<Option<User>>;

    /// Persist derived permissions and metadata onto the stored user record
    async fn update_user_permissions(&self, input: UpdateUserPermissionsInput) -> DomainResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&UserRole::SuperAdmin).unwrap(),
            "\"super-admin\""
        );
        assert_eq!(serde_json::to_string(&UserRole::User).unwrap(), "\"user\"");
    }

    #[test]
    fn test_catalog_driven_roles() {
        assert!(!UserRole::User.is_catalog_driven());
        assert!(UserRole::Admin.is_catalog_driven());
        assert!(UserRole::SuperAdmin.is_catalog_driven());
    }
}
