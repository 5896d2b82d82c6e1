//! Script sandbox: parser, execution context and executor.
//!
//! Script sources are parsed into domain commands and interpreted
//! against a narrow capability surface; nothing in a script can reach
//! program state except through the commands modeled here.

pub mod executor;
pub mod parser;

pub use executor::{ScriptContext, ScriptExecutor};
pub use parser::parse;
