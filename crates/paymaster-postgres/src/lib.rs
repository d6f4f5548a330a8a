mod client;
mod config;
mod document_store;

pub use client::PostgresClient;
pub use config::PostgresConfig;
pub use document_store::PostgresDocumentStore;
