use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Invalid password: {0}")]
    InvalidPassword(String),

    #[error("Invalid user name: {0}")]
    InvalidUserName(String),

    #[error("Password hashing error: {0}")]
    PasswordHashingError(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired token: {0}")]
    InvalidToken(String),

    #[error("Invalid factory key: {0}")]
    InvalidFactoryKey(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Invalid order creator: {0}")]
    InvalidOrderCreator(String),

    #[error("Order ID allocation failed for factory {0}: {1}")]
    OrderIdAllocationFailed(String, String),

    #[error("Order sequence overflow for factory {0}: sequence {1} exceeds the fixed ID width")]
    OrderSequenceOverflow(String, u64),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}
