pub mod auth;
pub mod domain;
pub mod telemetry;

// Re-export mocks when testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use auth::MockAuthTokenProvider;
#[cfg(any(test, feature = "testing"))]
pub use auth::MockPasswordService;
#[cfg(any(test, feature = "testing"))]
pub use auth::MockRbacCatalogProvider;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockUserRepository;
