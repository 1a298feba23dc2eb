//! Core scoped service container for Wharf.

pub mod argument;
pub mod builder;
pub mod container;
pub mod descriptor;
pub mod error;
pub mod graph;
pub mod key;
pub mod parameter;
pub mod provider;
pub mod reference;
pub mod registry;
pub mod scope;

pub use container::{CONTAINER_SCOPE, ScopedContainer, prelude};
pub use error::{Result, WharfError};
pub use key::ServiceId;
pub use reference::InvalidBehavior;
pub use scope::{Scope, ScopeKind};
