//! Postman import: Collection v2.1 files and environment exports.

mod importer;
mod types;

pub use importer::{ImportError, import_collection, import_environment};
