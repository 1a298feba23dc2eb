//! Type registry: explicit construction functions for service types.
//!
//! Descriptors name their type as a string. The registry maps that name
//! to typed functions that know how to build it, and maps the runtime
//! type of an instance to the methods that can be called on it.
//!
//! # Examples
//! ```
//! use wharf_container::registry::TypeRegistry;
//!
//! struct Mailer { transport: String }
//!
//! let mut types = TypeRegistry::new();
//! types
//!     .register::<Mailer>("Mailer")
//!     .constructor(|args| Ok(Mailer { transport: args.string(0)? }));
//!
//! assert!(types.contains("Mailer"));
//! ```

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;
use wharf_support::rendering::shorten_type_name;

use crate::argument::Arguments;
use crate::error::{Result, WharfError};
use crate::key::ServiceId;
use crate::parameter::ParameterValue;
use crate::reference::InvalidBehavior;

/// A live, type-erased service instance.
///
/// Identity is pointer identity: two lookups return "the same instance"
/// when [`Arc::ptr_eq`] holds.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Builds an instance from resolved arguments.
pub type ConstructFn = Arc<dyn Fn(&Arguments) -> Result<Instance> + Send + Sync>;

/// Calls a method on an instance for its side effects.
pub type MethodFn = Arc<dyn Fn(&Instance, &Arguments) -> Result<()> + Send + Sync>;

/// Calls a method on a factory instance that produces another instance.
pub type FactoryMethodFn = Arc<dyn Fn(&Instance, &Arguments) -> Result<Instance> + Send + Sync>;

/// Trait for resolving services and parameters during construction.
///
/// This is what construction code receives to reach other services.
/// Separated from the container so the resolution state of the current
/// lookup can travel with it.
pub trait Resolver: Send + Sync {
    /// Looks up a service, honoring `behavior` when it is unknown.
    fn get(&self, id: &ServiceId, behavior: InvalidBehavior) -> Result<Option<Instance>>;

    /// Returns `true` if the container knows `id`.
    fn has(&self, id: &ServiceId) -> bool;

    /// Interpolates parameter placeholders inside `value`.
    fn resolve_value(&self, value: &ParameterValue) -> Result<ParameterValue>;

    /// Returns a resolved parameter.
    fn parameter(&self, name: &str) -> Result<ParameterValue> {
        self.resolve_value(&ParameterValue::String(format!("%{name}%")))
    }
}

/// Resolve a typed service from a [`Resolver`].
///
/// Use this inside factory closures:
///
/// ```rust,ignore
/// ServiceDescriptor::from_fn(|r| {
///     let logger: Arc<Logger> = wharf_container::registry::resolve(r, "logger")?;
///     Ok(Mailer::new(logger))
/// })
/// ```
pub fn resolve<T: Any + Send + Sync>(resolver: &dyn Resolver, id: &str) -> Result<Arc<T>> {
    let id = ServiceId::new(id);
    let instance = resolver
        .get(&id, InvalidBehavior::Fail)?
        .ok_or_else(|| WharfError::Construction {
            id: id.clone(),
            reason: "lookup returned no instance".to_string(),
        })?;
    downcast(&id, instance)
}

/// Downcasts an instance, reporting the service id on mismatch.
pub fn downcast<T: Any + Send + Sync>(id: &ServiceId, instance: Instance) -> Result<Arc<T>> {
    instance.downcast::<T>().map_err(|_| WharfError::Construction {
        id: id.clone(),
        reason: format!("Type mismatch: expected {}", type_name::<T>()),
    })
}

/// Returns the concrete [`TypeId`] behind an instance.
fn concrete_type_id(instance: &Instance) -> TypeId {
    let any: &(dyn Any + Send + Sync) = &**instance;
    any.type_id()
}

/// Registration entry for a single type.
#[derive(Clone)]
struct TypeEntry {
    type_id: TypeId,
    rust_name: &'static str,
    constructor: Option<ConstructFn>,
    functions: HashMap<String, ConstructFn>,
    methods: HashMap<String, MethodFn>,
    factory_methods: HashMap<String, FactoryMethodFn>,
}

impl TypeEntry {
    fn new<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            rust_name: type_name::<T>(),
            constructor: None,
            functions: HashMap::new(),
            methods: HashMap::new(),
            factory_methods: HashMap::new(),
        }
    }
}

impl fmt::Debug for TypeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeEntry")
            .field("type", &self.rust_name)
            .field("constructor", &self.constructor.is_some())
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Stores construction functions by type name.
///
/// Populated while configuring the container and shared (via `Arc`)
/// by every builder that needs it.
#[derive(Debug, Default, Clone)]
pub struct TypeRegistry {
    entries: HashMap<String, TypeEntry>,
    by_type: HashMap<TypeId, String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under `name` and returns a handle to attach functions.
    ///
    /// Registering the same name again with the same type extends the
    /// entry; a different type replaces it.
    pub fn register<T: Any + Send + Sync>(&mut self, name: impl Into<String>) -> TypeRegistration<'_, T> {
        let name = name.into();
        debug!(name = %name, rust_type = type_name::<T>(), "Registered type");

        let replace = self
            .entries
            .get(&name)
            .is_none_or(|entry| entry.type_id != TypeId::of::<T>());
        if replace {
            if let Some(old) = self.entries.insert(name.clone(), TypeEntry::new::<T>()) {
                self.by_type.remove(&old.type_id);
            }
        }
        self.by_type.insert(TypeId::of::<T>(), name.clone());

        let entry = self
            .entries
            .entry(name)
            .or_insert_with(TypeEntry::new::<T>);

        TypeRegistration {
            entry,
            _marker: PhantomData,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the registered name of an instance's runtime type.
    pub fn name_of(&self, instance: &Instance) -> Option<&str> {
        self.by_type.get(&concrete_type_id(instance)).map(String::as_str)
    }

    pub(crate) fn constructor(&self, name: &str) -> Option<&ConstructFn> {
        self.entries.get(name)?.constructor.as_ref()
    }

    pub(crate) fn function(&self, type_name: &str, function: &str) -> Option<&ConstructFn> {
        self.entries.get(type_name)?.functions.get(function)
    }

    pub(crate) fn method_for(&self, instance: &Instance, method: &str) -> Option<&MethodFn> {
        self.entry_for(instance)?.methods.get(method)
    }

    pub(crate) fn factory_method_for(&self, instance: &Instance, method: &str) -> Option<&FactoryMethodFn> {
        self.entry_for(instance)?.factory_methods.get(method)
    }

    /// Describes an instance for error messages.
    pub(crate) fn describe(&self, instance: &Instance) -> String {
        match self.entry_for(instance) {
            Some(entry) => shorten_type_name(entry.rust_name),
            None => "an unregistered type".to_string(),
        }
    }

    fn entry_for(&self, instance: &Instance) -> Option<&TypeEntry> {
        let name = self.by_type.get(&concrete_type_id(instance))?;
        self.entries.get(name)
    }
}

/// Handle returned by [`TypeRegistry::register`].
pub struct TypeRegistration<'a, T> {
    entry: &'a mut TypeEntry,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> TypeRegistration<'_, T> {
    /// Sets the function used for direct construction.
    pub fn constructor(
        self,
        f: impl Fn(&Arguments) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        self.entry.constructor = Some(Arc::new(move |args: &Arguments| {
            Ok(Arc::new(f(args)?) as Instance)
        }));
        self
    }

    /// Adds a static function, usable as a static factory or configurator.
    ///
    /// The product may be any type.
    pub fn function<U: Any + Send + Sync>(
        self,
        name: &str,
        f: impl Fn(&Arguments) -> Result<U> + Send + Sync + 'static,
    ) -> Self {
        self.entry.functions.insert(
            name.to_string(),
            Arc::new(move |args: &Arguments| Ok(Arc::new(f(args)?) as Instance)),
        );
        self
    }

    /// Adds a method callable on instances of `T`.
    ///
    /// Instances are shared, so methods take `&T`; mutate through
    /// interior mutability.
    pub fn method(
        self,
        name: &str,
        f: impl Fn(&T, &Arguments) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.entry.methods.insert(
            name.to_string(),
            Arc::new(move |instance: &Instance, args: &Arguments| f(receiver::<T>(instance)?, args)),
        );
        self
    }

    /// Adds a method that produces another instance, for service factories.
    pub fn factory_method<U: Any + Send + Sync>(
        self,
        name: &str,
        f: impl Fn(&T, &Arguments) -> Result<U> + Send + Sync + 'static,
    ) -> Self {
        self.entry.factory_methods.insert(
            name.to_string(),
            Arc::new(move |instance: &Instance, args: &Arguments| {
                Ok(Arc::new(f(receiver::<T>(instance)?, args)?) as Instance)
            }),
        );
        self
    }
}

fn receiver<T: Any + Send + Sync>(instance: &Instance) -> Result<&T> {
    instance.downcast_ref::<T>().ok_or_else(|| {
        WharfError::other(format!("receiver is not a {}", type_name::<T>()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::Arg;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Counter {
        value: AtomicU32,
    }

    struct Connection {
        dsn: String,
    }

    fn registry() -> TypeRegistry {
        let mut types = TypeRegistry::new();
        types
            .register::<Counter>("Counter")
            .constructor(|args| {
                Ok(Counter {
                    value: AtomicU32::new(args.int(0)? as u32),
                })
            })
            .method("add", |counter, args| {
                counter.value.fetch_add(args.int(0)? as u32, Ordering::SeqCst);
                Ok(())
            })
            .factory_method("connect", |counter, _| {
                Ok(Connection {
                    dsn: format!("db{}", counter.value.load(Ordering::SeqCst)),
                })
            })
            .function("zero", |_| {
                Ok(Counter {
                    value: AtomicU32::new(0),
                })
            });
        types
    }

    fn one_int(value: i64) -> Arguments {
        Arguments::new(vec![Arg::Value(value.into())])
    }

    #[test]
    fn construct_and_call_method() {
        let types = registry();
        let instance = (types.constructor("Counter").unwrap())(&one_int(2)).unwrap();

        let add = types.method_for(&instance, "add").unwrap();
        add(&instance, &one_int(3)).unwrap();

        let counter = instance.downcast_ref::<Counter>().unwrap();
        assert_eq!(counter.value.load(Ordering::SeqCst), 5);
        assert_eq!(types.name_of(&instance), Some("Counter"));
    }

    #[test]
    fn factory_method_produces_other_type() {
        let types = registry();
        let counter = (types.function("Counter", "zero").unwrap())(&Arguments::default()).unwrap();

        let connect = types.factory_method_for(&counter, "connect").unwrap();
        let connection = connect(&counter, &Arguments::default()).unwrap();
        assert_eq!(connection.downcast_ref::<Connection>().unwrap().dsn, "db0");
    }

    #[test]
    fn unknown_lookups_are_none() {
        let types = registry();
        let unregistered: Instance = Arc::new(42u8);

        assert!(types.constructor("Missing").is_none());
        assert!(types.function("Counter", "missing").is_none());
        assert!(types.method_for(&unregistered, "add").is_none());
        assert_eq!(types.name_of(&unregistered), None);
        assert_eq!(types.describe(&unregistered), "an unregistered type");
    }

    #[test]
    fn reregistering_other_type_replaces_entry() {
        let mut types = registry();
        types.register::<Connection>("Counter");

        assert!(types.constructor("Counter").is_none());
        assert_eq!(types.len(), 1);
    }
}
