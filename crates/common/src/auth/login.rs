use crate::domain::{PermissionSet, PermissionTree};

/// Input for user login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginUserInput {
    pub email: String,
    pub password: String,
}

/// Output from successful login
///
/// Carries the resolved permission structures so the caller never has to
/// re-read the user record after authenticating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginUserOutput {
    pub access_token: String,
    pub user_id: String,
    pub permissions: PermissionSet,
    pub permission_metadata: PermissionTree,
}
