//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the engine core and external
//! systems. Each port is a trait implemented by an adapter in the
//! infrastructure layer.

pub mod http_client;
pub mod kv_store;

pub use http_client::{HttpClient, HttpClientError, OutboundRequest, OutboundResponse};
pub use kv_store::{KeyValueStore, StorageError};
