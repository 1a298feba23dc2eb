//! # Wharf: scoped service container for Rust
//!
//! Describe services once, then let the container build, cache and wire
//! them. Scopes decide how long an instance lives; levels decide which
//! scopes may depend on which.
//!
//! ```rust
//! use std::sync::Arc;
//! use wharf::prelude::*;
//!
//! let container = ScopedContainer::new();
//! container
//!     .register_scope("request", Scope::nesting(ServiceBuilder::new()), 1)
//!     .unwrap();
//! container
//!     .register_descriptor(
//!         "request.id",
//!         ServiceDescriptor::from_fn(|_| Ok(42u64)).scope("request"),
//!     )
//!     .unwrap();
//!
//! {
//!     let _session = Session::enter(&container, "request").unwrap();
//!     let id: Arc<u64> = container.get_as("request.id").unwrap();
//!     assert_eq!(*id, 42);
//! }
//! assert!(container.has("request.id"));
//! ```

pub mod session;

pub use session::Session;
pub use wharf_container::*;
pub use wharf_support::*;

pub mod prelude {
    pub use crate::session::Session;
    pub use wharf_container::prelude::*;
}
