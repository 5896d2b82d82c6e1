//! Courier Application - Engine logic
//!
//! The templating, scripting and dispatch engine behind the request
//! workbench. Depends on the domain crate and the ports defined here;
//! concrete adapters live in the infrastructure crate.

pub mod environments;
pub mod history;
pub mod keys;
pub mod overrides;
pub mod pipeline;
pub mod ports;
pub mod scripting;
pub mod send;
pub mod session;
pub mod variables;

pub use overrides::OverrideStore;
pub use pipeline::AssembledRequest;
pub use send::{SendOutcome, SendRequest};
pub use variables::VariableStore;
