//! HTTP request building blocks.

pub mod header;
pub mod method;
pub mod query;

pub use header::{Header, Headers};
pub use method::HttpMethod;
pub use query::QueryParam;
