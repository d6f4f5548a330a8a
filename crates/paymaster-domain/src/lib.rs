pub mod document_catalog_provider;
pub mod document_store;
pub mod document_user_repository;
pub mod factory_code;
pub mod in_memory_document_store;
pub mod order_id_allocator;
pub mod order_id_allocator_config;
pub mod order_service;
pub mod permission_resolver;
pub mod user_service;

pub use document_catalog_provider::*;
pub use document_store::*;
pub use document_user_repository::*;
pub use factory_code::*;
pub use in_memory_document_store::*;
pub use order_id_allocator::*;
pub use order_id_allocator_config::*;
pub use order_service::{OrderDocument, OrderService, ORDERS_COLLECTION};
pub use permission_resolver::{resolve, PermissionSource, ResolvedPermissions};
pub use user_service::UserService;
