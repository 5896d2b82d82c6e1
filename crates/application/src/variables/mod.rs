//! Variable store and template resolver.

pub mod parser;
pub mod store;

pub use parser::{parse_tokens, TemplateToken};
pub use store::VariableStore;
