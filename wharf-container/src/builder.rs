//! Service builder: turns a descriptor plus resolved arguments into a
//! live instance.
//!
//! Construction order:
//! 1. load the descriptor's file, if any
//! 2. resolve constructor arguments (parameters, then references)
//! 3. construct through the factory or the registered constructor
//! 4. run interface injectors
//! 5. invoke method calls, skipping those with a missing `Ignore` reference
//! 6. apply the configurator

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::argument::{Arg, Argument, Arguments};
use crate::descriptor::{Configurator, Factory, ServiceDescriptor};
use crate::error::{Result, WharfError};
use crate::key::ServiceId;
use crate::parameter::ParameterValue;
use crate::reference::InvalidBehavior;
use crate::registry::{Instance, Resolver, TypeRegistry};

/// Cross-cutting hook applied to every instance right after construction.
pub trait InterfaceInjector: Send + Sync {
    fn inject(&self, id: &ServiceId, descriptor: &ServiceDescriptor, instance: &Instance) -> Result<()>;
}

/// Loads a file a descriptor depends on. Called once per distinct path.
pub trait FileLoader: Send + Sync {
    fn load(&self, path: &str) -> Result<()>;
}

/// Builds services from descriptors.
///
/// Each scope owns one builder. Descriptors can be added and removed
/// through `&self` so the builder can live inside a shared scope.
pub struct ServiceBuilder {
    descriptors: RwLock<HashMap<ServiceId, Arc<ServiceDescriptor>>>,
    types: Arc<TypeRegistry>,
    injectors: Vec<Arc<dyn InterfaceInjector>>,
    loader: Option<Arc<dyn FileLoader>>,
    loaded: Mutex<HashSet<String>>,
}

impl Default for ServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceBuilder {
    /// A builder with an empty type registry.
    pub fn new() -> Self {
        Self::with_types(Arc::new(TypeRegistry::new()))
    }

    pub fn with_types(types: Arc<TypeRegistry>) -> Self {
        Self {
            descriptors: RwLock::new(HashMap::new()),
            types,
            injectors: Vec::new(),
            loader: None,
            loaded: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_injector(mut self, injector: impl InterfaceInjector + 'static) -> Self {
        self.injectors.push(Arc::new(injector));
        self
    }

    pub fn with_loader(mut self, loader: impl FileLoader + 'static) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Adds a descriptor and returns `self`, for setting up a builder
    /// before it is wrapped in a scope.
    pub fn with_descriptor(self, id: &str, descriptor: ServiceDescriptor) -> Self {
        self.register(ServiceId::new(id), descriptor);
        self
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Registers a descriptor, returning the one it replaced.
    pub fn register(&self, id: ServiceId, descriptor: ServiceDescriptor) -> Option<Arc<ServiceDescriptor>> {
        debug!(id = %id, "Registered descriptor");
        self.descriptors.write().insert(id, Arc::new(descriptor))
    }

    pub fn remove(&self, id: &ServiceId) -> Option<Arc<ServiceDescriptor>> {
        self.descriptors.write().remove(id)
    }

    pub fn has(&self, id: &ServiceId) -> bool {
        self.descriptors.read().contains_key(id)
    }

    pub fn descriptor(&self, id: &ServiceId) -> Option<Arc<ServiceDescriptor>> {
        self.descriptors.read().get(id).cloned()
    }

    /// Returns all descriptors, ordered by id.
    pub fn descriptors(&self) -> Vec<(ServiceId, Arc<ServiceDescriptor>)> {
        let mut all: Vec<_> = self
            .descriptors
            .read()
            .iter()
            .map(|(id, d)| (id.clone(), d.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    pub fn service_ids(&self) -> Vec<ServiceId> {
        let mut ids: Vec<_> = self.descriptors.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.descriptors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.read().is_empty()
    }

    /// Builds the service `id`.
    ///
    /// Returns `Ok(None)` when no descriptor exists for `id`; the caller
    /// decides whether absence is an error.
    pub fn create(&self, id: &ServiceId, resolver: &dyn Resolver) -> Result<Option<Instance>> {
        let Some(descriptor) = self.descriptor(id) else {
            return Ok(None);
        };

        trace!(id = %id, "Building service");

        if let Some(file) = descriptor.get_file() {
            let path = self.resolve_name(id, file, resolver)?;
            self.load_file(id, &path)?;
        }

        let arguments = Arguments::new(self.resolve_arguments(descriptor.arguments(), resolver)?);
        let instance = self.instantiate(id, &descriptor, &arguments, resolver)?;

        for injector in &self.injectors {
            injector
                .inject(id, &descriptor, &instance)
                .map_err(|e| e.within(id))?;
        }

        for call in descriptor.method_calls() {
            if let Some(missing) = self.missing_ignored(call.arguments(), resolver) {
                trace!(id = %id, method = call.method(), missing = %missing, "Skipping method call");
                continue;
            }

            let arguments = Arguments::new(self.resolve_arguments(call.arguments(), resolver)?);
            let method = self
                .types
                .method_for(&instance, call.method())
                .ok_or_else(|| WharfError::Construction {
                    id: id.clone(),
                    reason: format!(
                        "method \"{}\" is not registered for {}",
                        call.method(),
                        self.types.describe(&instance)
                    ),
                })?;
            method(&instance, &arguments).map_err(|e| e.within(id))?;
        }

        if let Some(configurator) = descriptor.get_configurator() {
            self.configure(id, configurator, &instance, resolver)?;
        }

        debug!(id = %id, "Built service");
        Ok(Some(instance))
    }

    fn instantiate(
        &self,
        id: &ServiceId,
        descriptor: &ServiceDescriptor,
        arguments: &Arguments,
        resolver: &dyn Resolver,
    ) -> Result<Instance> {
        match descriptor.get_factory() {
            Some(Factory::Closure(f)) => f(arguments, resolver).map_err(|e| e.within(id)),

            Some(Factory::Static { type_name, function }) => {
                let type_name = self.resolve_name(id, type_name, resolver)?;
                let f = self.types.function(&type_name, function).ok_or_else(|| {
                    WharfError::InvalidFactory {
                        id: id.clone(),
                        reason: format!("\"{type_name}::{function}\" is not a registered function"),
                    }
                })?;
                f(arguments).map_err(|e| e.within(id))
            }

            Some(Factory::Service { service, method }) => {
                let service = ServiceId::new(self.resolve_name(id, service, resolver)?);
                let factory = resolver
                    .get(&service, InvalidBehavior::Fail)?
                    .ok_or_else(|| WharfError::InvalidFactory {
                        id: id.clone(),
                        reason: format!("factory service \"{service}\" is not available"),
                    })?;
                let f = self.types.factory_method_for(&factory, method).ok_or_else(|| {
                    WharfError::InvalidFactory {
                        id: id.clone(),
                        reason: format!(
                            "\"{method}\" is not a factory method of \"{service}\" ({})",
                            self.types.describe(&factory)
                        ),
                    }
                })?;
                f(&factory, arguments).map_err(|e| e.within(id))
            }

            None => {
                let type_name = descriptor.type_name().ok_or_else(|| WharfError::Construction {
                    id: id.clone(),
                    reason: "the descriptor has neither a type nor a factory".to_string(),
                })?;
                let type_name = self.resolve_name(id, type_name, resolver)?;
                let constructor = self.types.constructor(&type_name).ok_or_else(|| {
                    WharfError::Construction {
                        id: id.clone(),
                        reason: format!("type \"{type_name}\" has no registered constructor"),
                    }
                })?;
                constructor(arguments).map_err(|e| e.within(id))
            }
        }
    }

    fn configure(
        &self,
        id: &ServiceId,
        configurator: &Configurator,
        instance: &Instance,
        resolver: &dyn Resolver,
    ) -> Result<()> {
        let subject = Arguments::new(vec![Arg::Service(instance.clone())]);

        match configurator {
            Configurator::Function(f) => f(instance).map_err(|e| e.within(id)),

            Configurator::Service { service, method } => {
                let target = resolver
                    .get(service.id(), service.on_missing())?
                    .ok_or_else(|| WharfError::InvalidConfigurator {
                        id: id.clone(),
                        reason: format!("service \"{}\" is not available", service.id()),
                    })?;
                let f = self.types.method_for(&target, method).ok_or_else(|| {
                    WharfError::InvalidConfigurator {
                        id: id.clone(),
                        reason: format!(
                            "\"{method}\" is not a method of \"{}\" ({})",
                            service.id(),
                            self.types.describe(&target)
                        ),
                    }
                })?;
                f(&target, &subject).map_err(|e| e.within(id))
            }

            Configurator::Static { type_name, function } => {
                let type_name = self.resolve_name(id, type_name, resolver)?;
                let f = self.types.function(&type_name, function).ok_or_else(|| {
                    WharfError::InvalidConfigurator {
                        id: id.clone(),
                        reason: format!("\"{type_name}::{function}\" is not a registered function"),
                    }
                })?;
                f(&subject).map(|_| ()).map_err(|e| e.within(id))
            }
        }
    }

    fn resolve_arguments(&self, arguments: &[Argument], resolver: &dyn Resolver) -> Result<Vec<Arg>> {
        arguments
            .iter()
            .map(|argument| self.resolve_argument(argument, resolver))
            .collect()
    }

    fn resolve_argument(&self, argument: &Argument, resolver: &dyn Resolver) -> Result<Arg> {
        match argument {
            Argument::Value(value) => Ok(Arg::Value(resolver.resolve_value(value)?)),
            Argument::Reference(reference) => {
                Ok(match resolver.get(reference.id(), reference.on_missing())? {
                    Some(instance) => Arg::Service(instance),
                    None => Arg::Empty,
                })
            }
            Argument::List(items) => Ok(Arg::List(self.resolve_arguments(items, resolver)?)),
        }
    }

    /// Returns the first `Ignore` reference whose target is unknown.
    fn missing_ignored(&self, arguments: &[Argument], resolver: &dyn Resolver) -> Option<ServiceId> {
        arguments
            .iter()
            .flat_map(Argument::references)
            .filter(|r| r.on_missing() == InvalidBehavior::Ignore)
            .find(|r| !resolver.has(r.id()))
            .map(|r| r.id().clone())
    }

    /// Interpolates a type name, service id or path.
    fn resolve_name(&self, id: &ServiceId, raw: &str, resolver: &dyn Resolver) -> Result<String> {
        match resolver.resolve_value(&ParameterValue::from(raw))? {
            ParameterValue::String(s) => Ok(s),
            other => Err(WharfError::Construction {
                id: id.clone(),
                reason: format!("\"{raw}\" resolved to a {}, expected a string", other.kind()),
            }),
        }
    }

    fn load_file(&self, id: &ServiceId, path: &str) -> Result<()> {
        let loader = self.loader.as_ref().ok_or_else(|| WharfError::InvalidFactory {
            id: id.clone(),
            reason: format!("no file loader is configured to load \"{path}\""),
        })?;

        if self.loaded.lock().contains(path) {
            return Ok(());
        }

        debug!(id = %id, path, "Loading service file");
        loader.load(path).map_err(|e| e.within(id))?;
        self.loaded.lock().insert(path.to_string());
        Ok(())
    }
}

impl fmt::Debug for ServiceBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceBuilder")
            .field("descriptors", &self.len())
            .field("types", &self.types.len())
            .field("injectors", &self.injectors.len())
            .finish()
    }
}
