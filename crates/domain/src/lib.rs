//! Courier Domain - Core business types
//!
//! This crate defines the domain model for the Courier request engine.
//! All types here are pure Rust with no I/O dependencies.

pub mod collection;
pub mod environment;
pub mod error;
pub mod history;
pub mod overrides;
pub mod request;
pub mod response;
pub mod scripting;
pub mod state;

pub use collection::{CollectionSpec, DeclaredAuth, RequestDefinition, strip_folder_prefix};
pub use environment::{EnvironmentSet, VariableEntry};
pub use error::{DomainError, DomainResult};
pub use history::{HistoryEntry, RequestHistory};
pub use overrides::{AuthOverride, EditableRequest, RequestPatch};
pub use request::{Header, Headers, HttpMethod, QueryParam};
pub use response::ResponseRecord;
pub use scripting::{
    Expr, RequestScripts, ScriptCommand, ScriptError, SubRequestSpec, VariableScope,
};
pub use state::{FailureKind, SendState};
