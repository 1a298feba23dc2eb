//! Service descriptors: declarative recipes for building one service.
//!
//! A descriptor is filled in by a configuration loader (or by hand) and
//! registered on a scope's builder. Once the container is compiled the
//! registered descriptors can no longer be replaced.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::argument::{Argument, Arguments};
use crate::error::Result;
use crate::reference::Reference;
use crate::registry::{Instance, Resolver};

/// Closure building an instance from resolved arguments and a resolver.
pub type ClosureFn = Arc<dyn Fn(&Arguments, &dyn Resolver) -> Result<Instance> + Send + Sync>;

/// Closure applied to a freshly built instance.
pub type ConfigureFn = Arc<dyn Fn(&Instance) -> Result<()> + Send + Sync>;

/// How to obtain the instance instead of calling the type's constructor.
#[derive(Clone)]
pub enum Factory {
    /// A static function registered on a type.
    Static { type_name: String, function: String },
    /// A factory method on another service; the id may hold placeholders.
    Service { service: String, method: String },
    /// A closure.
    Closure(ClosureFn),
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Factory::Static { type_name, function } => write!(f, "Static({type_name}::{function})"),
            Factory::Service { service, method } => write!(f, "Service(@{service}->{method})"),
            Factory::Closure(_) => f.write_str("Closure(..)"),
        }
    }
}

/// Post-construction callable receiving the new instance.
#[derive(Clone)]
pub enum Configurator {
    Function(ConfigureFn),
    /// A method on another service, called with the instance as argument 0.
    Service { service: Reference, method: String },
    /// A static function, called with the instance as argument 0.
    Static { type_name: String, function: String },
}

impl fmt::Debug for Configurator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Configurator::Function(_) => f.write_str("Function(..)"),
            Configurator::Service { service, method } => write!(f, "Service({service}->{method})"),
            Configurator::Static { type_name, function } => write!(f, "Static({type_name}::{function})"),
        }
    }
}

/// A method to call after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    method: String,
    arguments: Vec<Argument>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Vec<Argument>) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }
}

/// Describes how to build one service.
///
/// # Examples
/// ```
/// use wharf_container::argument::Argument;
/// use wharf_container::descriptor::ServiceDescriptor;
/// use wharf_container::reference::Reference;
///
/// let mailer = ServiceDescriptor::new("Mailer")
///     .arg(Argument::parameter("mailer.transport"))
///     .call("set_logger", vec![Reference::new("logger").or_ignore().into()])
///     .scope("container");
///
/// assert_eq!(mailer.type_name(), Some("Mailer"));
/// assert_eq!(mailer.method_calls().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ServiceDescriptor {
    type_name: Option<String>,
    arguments: Vec<Argument>,
    method_calls: Vec<MethodCall>,
    factory: Option<Factory>,
    configurator: Option<Configurator>,
    file: Option<String>,
    scope: Option<String>,
}

impl ServiceDescriptor {
    /// A descriptor built by the constructor registered for `type_name`.
    ///
    /// The name may contain parameter placeholders.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            ..Self::default()
        }
    }

    /// A descriptor built by a closure that pulls what it needs from the
    /// resolver.
    pub fn from_fn<T: Any + Send + Sync>(
        f: impl Fn(&dyn Resolver) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        Self::default().factory(Factory::Closure(Arc::new(move |_: &Arguments, resolver: &dyn Resolver| {
            Ok(Arc::new(f(resolver)?) as Instance)
        })))
    }

    /// A descriptor built by a closure receiving the resolved arguments.
    pub fn from_factory<T: Any + Send + Sync>(
        f: impl Fn(&Arguments, &dyn Resolver) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        Self::default().factory(Factory::Closure(Arc::new(move |args: &Arguments, resolver: &dyn Resolver| {
            Ok(Arc::new(f(args, resolver)?) as Instance)
        })))
    }

    pub fn arg(mut self, argument: impl Into<Argument>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    pub fn args<I, A>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Argument>,
    {
        self.arguments.extend(arguments.into_iter().map(Into::into));
        self
    }

    /// Appends a method call, invoked in declaration order.
    pub fn call(mut self, method: impl Into<String>, arguments: Vec<Argument>) -> Self {
        self.method_calls.push(MethodCall::new(method, arguments));
        self
    }

    pub fn factory(mut self, factory: Factory) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Builds through a static function registered on `type_name`.
    pub fn static_factory(self, type_name: impl Into<String>, function: impl Into<String>) -> Self {
        self.factory(Factory::Static {
            type_name: type_name.into(),
            function: function.into(),
        })
    }

    /// Builds through a factory method of another service.
    pub fn service_factory(self, service: impl Into<String>, method: impl Into<String>) -> Self {
        self.factory(Factory::Service {
            service: service.into(),
            method: method.into(),
        })
    }

    pub fn configurator(mut self, configurator: Configurator) -> Self {
        self.configurator = Some(configurator);
        self
    }

    /// Shorthand for a closure configurator.
    pub fn configure_with(
        self,
        f: impl Fn(&Instance) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.configurator(Configurator::Function(Arc::new(f)))
    }

    /// A file to hand to the builder's file loader before construction.
    pub fn file(mut self, path: impl Into<String>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Assigns the descriptor to a scope; unscoped descriptors go to the
    /// container's default scope.
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn method_calls(&self) -> &[MethodCall] {
        &self.method_calls
    }

    pub fn get_factory(&self) -> Option<&Factory> {
        self.factory.as_ref()
    }

    pub fn get_configurator(&self) -> Option<&Configurator> {
        self.configurator.as_ref()
    }

    pub fn get_file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn scope_name(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    /// Every reference this descriptor declares, in resolution order:
    /// arguments, method calls, configurator.
    ///
    /// A factory service is not included; its id may still hold
    /// placeholders.
    pub fn references(&self) -> Vec<&Reference> {
        let mut out: Vec<&Reference> = self
            .arguments
            .iter()
            .flat_map(Argument::references)
            .collect();

        for call in &self.method_calls {
            out.extend(call.arguments.iter().flat_map(Argument::references));
        }

        if let Some(Configurator::Service { service, .. }) = &self.configurator {
            out.push(service);
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::InvalidBehavior;

    #[test]
    fn builder_methods_fill_fields() {
        let descriptor = ServiceDescriptor::new("%mailer.class%")
            .arg("smtp")
            .args([25, 465])
            .file("%kernel.dir%/mailer.conf")
            .static_factory("MailerFactory", "create")
            .scope("request");

        assert_eq!(descriptor.type_name(), Some("%mailer.class%"));
        assert_eq!(descriptor.arguments().len(), 3);
        assert_eq!(descriptor.get_file(), Some("%kernel.dir%/mailer.conf"));
        assert_eq!(descriptor.scope_name(), Some("request"));
        assert!(matches!(descriptor.get_factory(), Some(Factory::Static { .. })));
    }

    #[test]
    fn references_cover_calls_and_configurator() {
        let descriptor = ServiceDescriptor::new("Mailer")
            .arg(Argument::service("transport"))
            .call("set_logger", vec![Reference::new("logger").or_ignore().into()])
            .configurator(Configurator::Service {
                service: Reference::new("mailer.configurator"),
                method: "configure".into(),
            });

        let refs = descriptor.references();
        let ids: Vec<&str> = refs.iter().map(|r| r.id().as_str()).collect();
        assert_eq!(ids, vec!["transport", "logger", "mailer.configurator"]);
        assert_eq!(refs[1].on_missing(), InvalidBehavior::Ignore);
    }

    #[test]
    fn closure_descriptor_has_no_type() {
        let descriptor = ServiceDescriptor::from_fn(|_| Ok(42u32));
        assert!(descriptor.type_name().is_none());
        assert!(matches!(descriptor.get_factory(), Some(Factory::Closure(_))));
        assert_eq!(format!("{:?}", descriptor.get_factory().unwrap()), "Closure(..)");
    }
}
