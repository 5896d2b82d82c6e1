//! Courier Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports defined in
//! the application layer: the outbound HTTP client, the JSON-file
//! key-value store, and the Postman import path.

pub mod http;
pub mod import;
pub mod persistence;

pub use http::ReqwestHttpClient;
pub use import::{ImportError, import_collection, import_environment};
pub use persistence::FileKeyValueStore;
