//! Provider trait: a module of related service registrations.
//!
//! Configuration loaders hand their descriptors, parameters and aliases
//! to the container through this seam.
//!
//! # Examples
//! ```rust
//! use wharf_container::prelude::*;
//!
//! struct MailProvider;
//!
//! impl Provider for MailProvider {
//!     fn register(&self, registry: &mut dyn ServiceRegistry) -> Result<()> {
//!         registry.set_parameter("mailer.transport", "smtp".into())?;
//!         registry.register_descriptor(
//!             "mailer.smtp",
//!             ServiceDescriptor::from_factory(|args, _| Ok(args.string(0)?))
//!                 .arg(Argument::parameter("mailer.transport")),
//!         )?;
//!         registry.set_alias("mailer", "mailer.smtp")
//!     }
//! }
//!
//! let container = ScopedContainer::new();
//! container.add_provider(&MailProvider).unwrap();
//! assert!(container.has("mailer"));
//! ```

use crate::descriptor::ServiceDescriptor;
use crate::error::Result;
use crate::parameter::ParameterValue;

/// A module that registers related services into a container.
///
/// Split registrations by domain instead of one giant block:
///
/// ```rust,ignore
/// container.add_provider(&DatabaseProvider)?;
/// container.add_provider(&MailProvider)?;
/// ```
pub trait Provider: Send + Sync {
    /// Registers services, parameters and aliases.
    fn register(&self, registry: &mut dyn ServiceRegistry) -> Result<()>;

    /// Human-readable name for logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Interface that providers use to register into a container.
///
/// Kept apart from [`ScopedContainer`](crate::container::ScopedContainer)
/// so providers can be tested on their own.
pub trait ServiceRegistry {
    fn register_descriptor(&mut self, id: &str, descriptor: ServiceDescriptor) -> Result<()>;

    fn set_parameter(&mut self, name: &str, value: ParameterValue) -> Result<()>;

    fn set_alias(&mut self, alias: &str, target: &str) -> Result<()>;
}
