//! Collection and environment import.

pub mod postman;

pub use postman::{ImportError, import_collection, import_environment};
