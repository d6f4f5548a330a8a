use crate::permission_resolver::{self, PermissionSource};
use common::auth::{
    AuthTokenProvider, LoginUserInput, LoginUserOutput, PasswordService, RbacCatalog,
    RbacCatalogProvider,
};
use common::domain::{
    DomainError, DomainResult, GetUserByEmailInput, RegisterUserInput, RegisterUserInputWithId,
    UpdateUserPermissionsInput, User, UserRepository,
};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Domain service for user registration, lookup, and login
pub struct UserService {
    user_repository: Arc<dyn UserRepository>,
    catalog_provider: Arc<dyn RbacCatalogProvider>,
    auth_token_provider: Arc<dyn AuthTokenProvider>,
    password_service: Arc<dyn PasswordService>,
}

impl UserService {
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        catalog_provider: Arc<dyn RbacCatalogProvider>,
        auth_token_provider: Arc<dyn AuthTokenProvider>,
        password_service: Arc<dyn PasswordService>,
    ) -> Self {
        Self {
            user_repository,
            catalog_provider,
            auth_token_provider,
            password_service,
        }
    }

    /// Register a new user with hashed password
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register_user(&self, input: RegisterUserInput) -> DomainResult<User> {
        debug!(email = %input.email, "registering new user");

        // Validate email format (basic validation)
        if !Self::is_valid_email(&input.email) {
            return Err(DomainError::InvalidEmail(
                "Invalid email format".to_string(),
            ));
        }

        // Validate password (minimum length)
        if input.password.len() < 8 {
            return Err(DomainError::InvalidPassword(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        // Validate name is not empty
        if input.name.trim().is_empty() {
            return Err(DomainError::InvalidUserName(
                "Name cannot be empty".to_string(),
            ));
        }

        // Hash the password using injected password service
        let password_hash = self.password_service.hash_password(&input.password)?;

        // Generate unique user ID using xid
        let user_id = xid::new().to_string();

        let repo_input = RegisterUserInputWithId {
            id: user_id,
            email: input.email,
            password_hash,
            name: input.name,
            role: input.role,
        };

        let user = self.user_repository.register_user(repo_input).await?;

        debug!(user_id = %user.id, "user registered successfully");
        Ok(user)
    }

    /// Get a user by email
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn get_user_by_email(&self, input: GetUserByEmailInput) -> DomainResult<User> {
        if input.email.is_empty() {
            return Err(DomainError::InvalidEmail(
                "Email cannot be empty".to_string(),
            ));
        }

        let user = self
            .user_repository
            .get_user_by_email(input.clone())
            .await?
            .ok_or_else(|| DomainError::UserNotFound(input.email.clone()))?;

        Ok(user)
    }

    /// Login user, resolve permissions, and generate an access token.
    ///
    /// Login fails only on authentication mismatch. A catalog that cannot be
    /// loaded degrades to empty-catalog resolution, and the one-time
    /// write-back of tree-derived structures is best effort.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login_user(&self, input: LoginUserInput) -> DomainResult<LoginUserOutput> {
        debug!(email = %input.email, "attempting user login");

        // Validate email format
        if !Self::is_valid_email(&input.email) {
            return Err(DomainError::InvalidCredentials);
        }

        // Look up user by email
        let user = self
            .user_repository
            .get_user_by_email(GetUserByEmailInput {
                email: input.email.clone(),
            })
            .await?
            .ok_or(DomainError::InvalidCredentials)?;

        // Verify password using injected password service
        if !self
            .password_service
            .verify_password(&input.password, &user.password_hash)?
        {
            return Err(DomainError::InvalidCredentials);
        }

        // Load the RBAC catalog; a failure here must not block login
        let catalog = match self.catalog_provider.get_catalog().await {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!(error = %e, "failed to load RBAC catalog, resolving against empty catalog");
                RbacCatalog::default()
            }
        };

        // Resolve the permission structures for this user
        let resolved = permission_resolver::resolve(&user, &catalog);

        // Tree-derived structures are written back once so the next login
        // takes the stored-metadata path
        if resolved.source == PermissionSource::DerivedFromTree {
            let update = UpdateUserPermissionsInput {
                email: user.email.clone(),
                permissions: resolved.permissions.clone(),
                permission_metadata: resolved.metadata.clone(),
            };
            if let Err(e) = self.user_repository.update_user_permissions(update).await {
                warn!(error = %e, "failed to persist derived permission structures");
            }
        }

        // Generate access token
        let access_token = self
            .auth_token_provider
            .generate_token(&user.id, &user.email)?;

        debug!(user_id = %user.id, source = ?resolved.source, "user login successful");

        Ok(LoginUserOutput {
            access_token,
            user_id: user.id,
            permissions: resolved.permissions,
            permission_metadata: resolved.metadata,
        })
    }

    /// Basic email validation
    fn is_valid_email(email: &str) -> bool {
        // Simple validation: contains @ and at least one . after @
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() != 2 {
            return false;
        }
        let domain = parts[1];
        domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
    }
}
