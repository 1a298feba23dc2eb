//! # The ScopedContainer, heart of Wharf
//!
//! Orchestrates named scopes ordered by level, resolves services through
//! them and enforces the lifecycle rules between them.
//!
//! # Architecture
//! ```text
//! ScopedContainer ──get(id)──> service map ──> Scope ──> ServiceBuilder
//!        ▲                                                    │
//!        └──────────── ContainerResolver (per lookup) ◄───────┘
//! ```
//!
//! Levels rank scopes from most global (low) to most local (high). A
//! service resolved while a more global scope governs the lookup may not
//! pull from a more local one.
//!
//! # Examples
//! ```rust
//! use std::sync::Arc;
//! use wharf_container::prelude::*;
//!
//! struct Logger {
//!     prefix: String,
//! }
//!
//! struct Mailer {
//!     logger: Arc<Logger>,
//! }
//!
//! let container = ScopedContainer::new();
//! container.set_parameter("log.prefix", "[mail]").unwrap();
//!
//! container
//!     .register_descriptor(
//!         "logger",
//!         ServiceDescriptor::from_factory(|args, _| Ok(Logger { prefix: args.string(0)? }))
//!             .arg(Argument::parameter("log.prefix")),
//!     )
//!     .unwrap();
//! container
//!     .register_descriptor(
//!         "mailer",
//!         ServiceDescriptor::from_fn(|r| Ok(Mailer { logger: resolve(r, "logger")? })),
//!     )
//!     .unwrap();
//!
//! let mailer: Arc<Mailer> = container.get_as("mailer").unwrap();
//! assert_eq!(mailer.logger.prefix, "[mail]");
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, instrument, trace, warn};
use wharf_support::rendering::{ChainEntry, suggest_similar};

use crate::builder::ServiceBuilder;
use crate::descriptor::{Factory, ServiceDescriptor};
use crate::error::{
    CircularReferenceError, CycleKind, InaccessibleScopeError, Result, ScopeMismatchError,
    UnknownServiceError, WharfError,
};
use crate::graph::{DependencyInfo, GraphValidator, Placement};
use crate::key::ServiceId;
use crate::parameter::{ParameterStore, ParameterValue};
use crate::provider::{Provider, ServiceRegistry};
use crate::reference::{InvalidBehavior, Reference};
use crate::registry::{Instance, Resolver, TypeRegistry, downcast};
use crate::scope::Scope;

/// Name of the caching scope registered by [`ScopedContainer::new()`].
pub const CONTAINER_SCOPE: &str = "container";

// ═══════════════════════════════════════════
// Registration state
// ═══════════════════════════════════════════

struct RegisteredScope {
    name: String,
    level: i32,
    scope: Arc<Scope>,
}

#[derive(Default)]
struct Registrations {
    /// Ascending by level; equal levels keep registration order.
    scopes: Vec<RegisteredScope>,
    /// id → index into `scopes`. Derived, see [`Registrations::rebuild`].
    service_map: HashMap<ServiceId, usize>,
    aliases: HashMap<ServiceId, ServiceId>,
    default_scope: Option<String>,
    frozen: bool,
}

impl Registrations {
    fn position(&self, name: &str) -> Option<usize> {
        self.scopes.iter().position(|s| s.name == name)
    }

    fn scope_named(&self, name: &str) -> Result<&RegisteredScope> {
        self.position(name)
            .map(|index| &self.scopes[index])
            .ok_or_else(|| WharfError::UnknownScope {
                name: name.to_string(),
            })
    }

    fn default_index(&self) -> Result<usize> {
        match self.default_scope {
            Some(ref name) => self.position(name).ok_or_else(|| WharfError::UnknownScope {
                name: name.clone(),
            }),
            None if self.scopes.is_empty() => Err(WharfError::NoScopes),
            None => Ok(0),
        }
    }

    fn ensure_mutable(&self, operation: &'static str) -> Result<()> {
        if self.frozen {
            return Err(WharfError::ContainerFrozen { operation });
        }
        Ok(())
    }

    /// Rebuilds the service map from the scopes' declared ids.
    ///
    /// The most global scope claims an id first.
    fn rebuild(&mut self) {
        let mut map = HashMap::new();
        for (index, registered) in self.scopes.iter().enumerate() {
            for id in registered.scope.service_ids() {
                map.entry(id).or_insert(index);
            }
        }
        trace!(services = map.len(), "Rebuilt service map");
        self.service_map = map;
    }

    /// Follows aliases until a non-alias id is reached.
    fn resolve_alias(&self, id: &ServiceId) -> Result<ServiceId> {
        let mut followed: Vec<ServiceId> = Vec::new();
        let mut current = id.clone();

        while let Some(target) = self.aliases.get(&current) {
            followed.push(current.clone());
            if followed.contains(target) {
                warn!(alias = %id, chain = ?followed, "Circular alias detected");
                return Err(WharfError::CircularReference(CircularReferenceError {
                    id: target.clone(),
                    chain: followed,
                    kind: CycleKind::Alias,
                }));
            }
            current = target.clone();
        }

        Ok(current)
    }

    fn known_ids(&self) -> Vec<&str> {
        self.service_map
            .keys()
            .chain(self.aliases.keys())
            .map(ServiceId::as_str)
            .collect()
    }
}

// ═══════════════════════════════════════════
// Resolution context (call-local)
// ═══════════════════════════════════════════

#[derive(Debug, Clone)]
struct Loading {
    id: ServiceId,
    scope: String,
    level: i32,
}

/// State of one top-level lookup, carried down the recursion.
#[derive(Debug, Clone, Default)]
struct ResolutionContext {
    /// Services currently being built, outermost first.
    loading: Vec<Loading>,
    /// The scope governing this lookup, adopted by the outermost call.
    current: Option<(String, i32)>,
}

impl ResolutionContext {
    fn is_loading(&self, id: &ServiceId) -> bool {
        self.loading.iter().any(|l| &l.id == id)
    }

    fn chain(&self) -> Vec<ServiceId> {
        self.loading.iter().map(|l| l.id.clone()).collect()
    }

    fn path(&self) -> Vec<ChainEntry> {
        self.loading
            .iter()
            .map(|l| ChainEntry {
                service: l.id.to_string(),
                scope: l.scope.clone(),
                level: Some(l.level),
            })
            .collect()
    }

    fn child(&self, id: &ServiceId, scope: &str, level: i32) -> Self {
        let mut loading = self.loading.clone();
        loading.push(Loading {
            id: id.clone(),
            scope: scope.to_string(),
            level,
        });

        Self {
            loading,
            current: Some(
                self.current
                    .clone()
                    .unwrap_or_else(|| (scope.to_string(), level)),
            ),
        }
    }
}

// ═══════════════════════════════════════════
// ScopedContainer
// ═══════════════════════════════════════════

/// A service container with named, levelled scopes.
///
/// `Send + Sync`: share it behind an `Arc`. No lock is held while a
/// service is being built, so construction code may freely resolve
/// other services.
pub struct ScopedContainer {
    registrations: RwLock<Registrations>,
    parameters: RwLock<ParameterStore>,
}

impl Default for ScopedContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopedContainer {
    /// A container with the standard caching scope [`CONTAINER_SCOPE`] at
    /// level 0 and an empty type registry.
    pub fn new() -> Self {
        Self::with_types(Arc::new(TypeRegistry::new()))
    }

    /// Like [`new()`](ScopedContainer::new), with `types` backing the
    /// standard scope's builder.
    pub fn with_types(types: Arc<TypeRegistry>) -> Self {
        let container = Self::empty();
        {
            let mut registrations = container.registrations.write();
            registrations.scopes.push(RegisteredScope {
                name: CONTAINER_SCOPE.to_string(),
                level: 0,
                scope: Arc::new(Scope::container(ServiceBuilder::with_types(types))),
            });
        }
        container
    }

    /// A container without any scope.
    pub fn empty() -> Self {
        Self {
            registrations: RwLock::new(Registrations::default()),
            parameters: RwLock::new(ParameterStore::new()),
        }
    }

    /// Seeds the parameter store.
    pub fn with_parameters(self, parameters: ParameterStore) -> Self {
        *self.parameters.write() = parameters;
        self
    }

    // ── Parameters ──

    /// # Errors
    /// [`WharfError::ContainerFrozen`] after [`compile()`](ScopedContainer::compile).
    pub fn set_parameter(&self, name: &str, value: impl Into<ParameterValue>) -> Result<()> {
        self.parameters.write().set(name, value)
    }

    /// Returns a parameter with its placeholders resolved.
    pub fn get_parameter(&self, name: &str) -> Result<ParameterValue> {
        let parameters = self.parameters.read();
        let raw = parameters.get(name)?;
        if parameters.is_frozen() {
            return Ok(raw.clone());
        }
        parameters.resolve_value(raw)
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.read().has(name)
    }

    /// Resolves every parameter and freezes the store.
    pub fn compile_parameters(&self) -> Result<()> {
        self.parameters.write().freeze()
    }

    /// Replaces every placeholder inside `value`.
    pub fn resolve_value(&self, value: &ParameterValue) -> Result<ParameterValue> {
        self.parameters.read().resolve_value(value)
    }

    /// Freezes parameters and registrations.
    ///
    /// Afterwards scopes, descriptors, aliases and parameters can no
    /// longer change. Instances may still be [`set`](ScopedContainer::set).
    #[instrument(skip(self), name = "container_compile")]
    pub fn compile(&self) -> Result<()> {
        self.compile_parameters()?;

        let mut registrations = self.registrations.write();
        registrations.frozen = true;

        info!(
            scopes = registrations.scopes.len(),
            services = registrations.service_map.len(),
            "Container compiled ✓"
        );
        Ok(())
    }

    pub fn is_frozen(&self) -> bool {
        self.registrations.read().frozen
    }

    // ── Scopes ──

    /// Registers a scope at `level`.
    ///
    /// # Errors
    /// - [`WharfError::ContainerFrozen`] after compile
    /// - [`WharfError::DuplicateScope`] if `name` is taken
    pub fn register_scope(&self, name: &str, scope: Scope, level: i32) -> Result<()> {
        let mut registrations = self.registrations.write();
        registrations.ensure_mutable("register a scope")?;

        if registrations.position(name).is_some() {
            return Err(WharfError::DuplicateScope {
                name: name.to_string(),
            });
        }

        debug!(scope = name, kind = %scope.kind(), level, "Registered scope");

        registrations.scopes.push(RegisteredScope {
            name: name.to_string(),
            level,
            scope: Arc::new(scope),
        });
        registrations.scopes.sort_by_key(|s| s.level);
        registrations.rebuild();
        Ok(())
    }

    pub fn has_scope(&self, name: &str) -> bool {
        self.registrations.read().position(name).is_some()
    }

    /// Names of the registered scopes, most global first.
    pub fn scope_names(&self) -> Vec<String> {
        self.registrations
            .read()
            .scopes
            .iter()
            .map(|s| s.name.clone())
            .collect()
    }

    /// Chooses the scope for unscoped descriptors and scope-less `set`.
    pub fn set_default_scope(&self, name: &str) -> Result<()> {
        let mut registrations = self.registrations.write();
        registrations.ensure_mutable("change the default scope")?;
        registrations.scope_named(name)?;
        registrations.default_scope = Some(name.to_string());
        Ok(())
    }

    /// Starts a new frame on a nesting scope.
    pub fn enter_scope(&self, name: &str) -> Result<()> {
        let mut registrations = self.registrations.write();
        registrations.scope_named(name)?.scope.enter();
        registrations.rebuild();
        debug!(scope = name, "Entered scope");
        Ok(())
    }

    /// Discards the frame started by the matching `enter_scope`.
    ///
    /// # Errors
    /// [`WharfError::UnbalancedLeave`] if the scope has no entered frame.
    pub fn leave_scope(&self, name: &str) -> Result<()> {
        let mut registrations = self.registrations.write();
        if !registrations.scope_named(name)?.scope.leave() {
            return Err(WharfError::UnbalancedLeave {
                scope: name.to_string(),
            });
        }
        registrations.rebuild();
        debug!(scope = name, "Left scope");
        Ok(())
    }

    // ── Descriptors ──

    /// Registers a descriptor on its declared scope, or on the default
    /// scope if it declares none. Replaces any descriptor for `id` on
    /// other scopes.
    pub fn register_descriptor(&self, id: &str, descriptor: ServiceDescriptor) -> Result<()> {
        let id = ServiceId::new(id);
        let mut registrations = self.registrations.write();
        registrations.ensure_mutable("register a descriptor")?;

        let index = match descriptor.scope_name() {
            Some(name) => registrations
                .position(name)
                .ok_or_else(|| WharfError::UnknownScope {
                    name: name.to_string(),
                })?,
            None => registrations.default_index()?,
        };

        for (position, registered) in registrations.scopes.iter().enumerate() {
            if position != index {
                registered.scope.builder().remove(&id);
            }
        }

        registrations.aliases.remove(&id);
        registrations.scopes[index].scope.builder().register(id, descriptor);
        registrations.rebuild();
        Ok(())
    }

    /// Removes the descriptor for `id` from whichever scope holds it.
    pub fn remove_descriptor(&self, id: &str) -> Result<Option<Arc<ServiceDescriptor>>> {
        let id = ServiceId::new(id);
        let mut registrations = self.registrations.write();
        registrations.ensure_mutable("remove a descriptor")?;

        let removed = registrations
            .scopes
            .iter()
            .find_map(|s| s.scope.builder().remove(&id));
        registrations.rebuild();
        Ok(removed)
    }

    pub fn has_descriptor(&self, id: &str) -> bool {
        let id = ServiceId::new(id);
        self.registrations
            .read()
            .scopes
            .iter()
            .any(|s| s.scope.builder().has(&id))
    }

    pub fn descriptor(&self, id: &str) -> Option<Arc<ServiceDescriptor>> {
        let id = ServiceId::new(id);
        self.registrations
            .read()
            .scopes
            .iter()
            .find_map(|s| s.scope.builder().descriptor(&id))
    }

    /// All descriptors, ordered by id.
    pub fn descriptors(&self) -> Vec<(ServiceId, Arc<ServiceDescriptor>)> {
        let mut all: Vec<_> = self
            .registrations
            .read()
            .scopes
            .iter()
            .flat_map(|s| s.scope.builder().descriptors())
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    // ── Aliases ──

    /// Makes `alias` resolve to `target`.
    pub fn set_alias(&self, alias: &str, target: &str) -> Result<()> {
        let mut registrations = self.registrations.write();
        registrations.ensure_mutable("set an alias")?;

        let alias = ServiceId::new(alias);
        let target = ServiceId::new(target);
        debug!(alias = %alias, target = %target, "Registered alias");
        registrations.aliases.insert(alias, target);
        Ok(())
    }

    pub fn remove_alias(&self, alias: &str) -> Result<Option<ServiceId>> {
        let mut registrations = self.registrations.write();
        registrations.ensure_mutable("remove an alias")?;
        Ok(registrations.aliases.remove(&ServiceId::new(alias)))
    }

    pub fn has_alias(&self, alias: &str) -> bool {
        self.registrations
            .read()
            .aliases
            .contains_key(&ServiceId::new(alias))
    }

    /// The id `alias` points to directly.
    pub fn alias_target(&self, alias: &str) -> Option<ServiceId> {
        self.registrations
            .read()
            .aliases
            .get(&ServiceId::new(alias))
            .cloned()
    }

    // ── Lookup ──

    /// Returns `true` if `id` (or the id an alias points to) can be served.
    pub fn has(&self, id: &str) -> bool {
        self.has_id(&ServiceId::new(id))
    }

    fn has_id(&self, id: &ServiceId) -> bool {
        let registrations = self.registrations.read();
        match registrations.resolve_alias(id) {
            Ok(target) => registrations.service_map.contains_key(&target),
            Err(_) => false,
        }
    }

    /// Looks up a service.
    ///
    /// Returns `Ok(None)` only when `id` is unknown and `behavior` is not
    /// [`InvalidBehavior::Fail`].
    ///
    /// # Errors
    /// - [`WharfError::UnknownService`]: unknown id with `Fail`
    /// - [`WharfError::CircularReference`]: `id` is already being built
    /// - [`WharfError::InaccessibleScope`]: never softened by `behavior`
    pub fn get(&self, id: &str, behavior: InvalidBehavior) -> Result<Option<Instance>> {
        self.get_in(&ServiceId::new(id), behavior, &ResolutionContext::default())
    }

    /// Looks up a service and downcasts it.
    pub fn get_as<T: Any + Send + Sync>(&self, id: &str) -> Result<Arc<T>> {
        let root = ContainerResolver {
            container: self,
            context: ResolutionContext::default(),
        };
        crate::registry::resolve(&root, id)
    }

    fn get_in(
        &self,
        id: &ServiceId,
        behavior: InvalidBehavior,
        context: &ResolutionContext,
    ) -> Result<Option<Instance>> {
        let (id, name, level, scope) = {
            let registrations = self.registrations.read();
            let id = registrations.resolve_alias(id)?;

            if context.is_loading(&id) {
                let chain = context.chain();
                warn!(id = %id, chain = ?chain, "Circular reference detected");
                return Err(WharfError::CircularReference(CircularReferenceError {
                    id,
                    chain,
                    kind: CycleKind::Construction,
                }));
            }

            let Some(&index) = registrations.service_map.get(&id) else {
                if !behavior.is_fail() {
                    trace!(id = %id, behavior = %behavior, "Unknown service tolerated");
                    return Ok(None);
                }
                return Err(WharfError::UnknownService(UnknownServiceError {
                    suggestions: suggest_similar(id.as_str(), &registrations.known_ids(), 3),
                    required_by: context.loading.last().map(|l| l.id.clone()),
                    id,
                }));
            };

            let registered = &registrations.scopes[index];
            (
                id,
                registered.name.clone(),
                registered.level,
                registered.scope.clone(),
            )
        };

        if let Some((current_scope, current_level)) = &context.current {
            if level > *current_level {
                warn!(
                    id = %id,
                    scope = %name,
                    current_scope = %current_scope,
                    "Scope violation detected"
                );
                let mut path = context.path();
                path.push(ChainEntry {
                    service: id.to_string(),
                    scope: name.clone(),
                    level: Some(level),
                });
                return Err(WharfError::InaccessibleScope(InaccessibleScopeError {
                    id,
                    scope: name,
                    level,
                    current_scope: current_scope.clone(),
                    current_level: *current_level,
                    path,
                }));
            }
        }

        trace!(id = %id, scope = %name, depth = context.loading.len(), "Resolving");

        let resolver = ContainerResolver {
            container: self,
            context: context.child(&id, &name, level),
        };
        scope.get(&id, behavior, &resolver)
    }

    /// Pins an instance.
    ///
    /// Without `scope`, the instance goes to the scope `id` is already
    /// mapped to, else to the default scope. Setting an id clears an
    /// alias of the same name.
    ///
    /// # Errors
    /// - [`WharfError::UnknownScope`] if `scope` is not registered
    /// - [`WharfError::NoScopes`] if no scope is registered at all
    /// - [`WharfError::ScopeMismatch`] if `id` is mapped to another scope
    pub fn set(&self, id: &str, instance: Instance, scope: Option<&str>) -> Result<()> {
        let id = ServiceId::new(id);
        let mut registrations = self.registrations.write();
        let mapped = registrations.service_map.get(&id).copied();

        let index = match (scope, mapped) {
            (Some(name), mapped) => {
                let index = registrations.position(name).ok_or_else(|| {
                    WharfError::UnknownScope {
                        name: name.to_string(),
                    }
                })?;
                if let Some(mapped) = mapped.filter(|&m| m != index) {
                    return Err(WharfError::ScopeMismatch(ScopeMismatchError {
                        id,
                        mapped_scope: registrations.scopes[mapped].name.clone(),
                        requested_scope: name.to_string(),
                    }));
                }
                index
            }
            (None, Some(mapped)) => mapped,
            // An id shadowed by an entered frame still belongs to its scope.
            (None, None) => match registrations
                .scopes
                .iter()
                .position(|s| s.scope.remembers(&id))
            {
                Some(index) => index,
                None => registrations.default_index()?,
            },
        };

        trace!(id = %id, scope = %registrations.scopes[index].name, "Set instance");

        registrations.aliases.remove(&id);
        registrations.scopes[index].scope.set(&id, instance);
        registrations.rebuild();
        Ok(())
    }

    /// Every id the container can serve, aliases included, sorted.
    pub fn service_ids(&self) -> Vec<ServiceId> {
        let registrations = self.registrations.read();
        let mut ids: Vec<ServiceId> = registrations
            .service_map
            .keys()
            .chain(registrations.aliases.keys())
            .cloned()
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    // ── Providers & validation ──

    /// Lets a [`Provider`] register its descriptors, parameters and aliases.
    pub fn add_provider(&self, provider: &dyn Provider) -> Result<()> {
        debug!(provider = provider.name(), "Adding provider");
        let mut registry = self;
        provider.register(&mut registry)
    }

    /// Checks the whole descriptor graph without building anything.
    ///
    /// Reports `Fail` references to unknown ids, reference cycles and
    /// references from a more global scope into a more local one.
    #[instrument(skip(self), name = "container_validate")]
    pub fn validate(&self) -> Result<()> {
        let registrations = self.registrations.read();

        let placements: HashMap<ServiceId, Placement> = registrations
            .service_map
            .iter()
            .map(|(id, &index)| {
                let registered = &registrations.scopes[index];
                (
                    id.clone(),
                    Placement {
                        scope: registered.name.clone(),
                        level: registered.level,
                    },
                )
            })
            .collect();

        let mut described = HashMap::new();
        for (id, &index) in &registrations.service_map {
            let registered = &registrations.scopes[index];
            let Some(descriptor) = registered.scope.builder().descriptor(id) else {
                continue;
            };

            let mut dependencies = Vec::new();
            for reference in declared_references(&descriptor) {
                let target = registrations.resolve_alias(reference.id())?;
                dependencies.push(Reference::with_behavior(target, reference.on_missing()));
            }

            described.insert(
                id.clone(),
                DependencyInfo {
                    id: id.clone(),
                    dependencies,
                    scope: registered.name.clone(),
                    level: registered.level,
                },
            );
        }

        GraphValidator::new(described, placements).validate()
    }
}

/// References of a descriptor, plus its factory service when the id is
/// literal.
fn declared_references(descriptor: &ServiceDescriptor) -> Vec<Reference> {
    let mut references: Vec<Reference> = descriptor.references().into_iter().cloned().collect();
    if let Some(Factory::Service { service, .. }) = descriptor.get_factory() {
        if !service.contains('%') {
            references.insert(0, Reference::new(service.as_str()));
        }
    }
    references
}

impl fmt::Debug for ScopedContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registrations = self.registrations.read();
        let scopes: Vec<String> = registrations
            .scopes
            .iter()
            .map(|s| match s.scope.depth() {
                0 => format!("{}@{}", s.name, s.level),
                depth => format!("{}@{}+{depth}", s.name, s.level),
            })
            .collect();

        f.debug_struct("ScopedContainer")
            .field("scopes", &scopes)
            .field("services", &registrations.service_map.len())
            .field("aliases", &registrations.aliases.len())
            .field("parameters", &self.parameters.read().len())
            .field("frozen", &registrations.frozen)
            .finish()
    }
}

impl ServiceRegistry for &ScopedContainer {
    fn register_descriptor(&mut self, id: &str, descriptor: ServiceDescriptor) -> Result<()> {
        ScopedContainer::register_descriptor(self, id, descriptor)
    }

    fn set_parameter(&mut self, name: &str, value: ParameterValue) -> Result<()> {
        ScopedContainer::set_parameter(self, name, value)
    }

    fn set_alias(&mut self, alias: &str, target: &str) -> Result<()> {
        ScopedContainer::set_alias(self, alias, target)
    }
}

// ═══════════════════════════════════════════
// ContainerResolver (internal bridge)
// ═══════════════════════════════════════════

/// Resolver handed to construction code; carries the lookup's context.
struct ContainerResolver<'a> {
    container: &'a ScopedContainer,
    context: ResolutionContext,
}

impl Resolver for ContainerResolver<'_> {
    fn get(&self, id: &ServiceId, behavior: InvalidBehavior) -> Result<Option<Instance>> {
        self.container.get_in(id, behavior, &self.context)
    }

    fn has(&self, id: &ServiceId) -> bool {
        self.container.has_id(id)
    }

    fn resolve_value(&self, value: &ParameterValue) -> Result<ParameterValue> {
        self.container.resolve_value(value)
    }
}

/// Downcasts the result of [`ScopedContainer::get`].
///
/// `None` stays `None`; a type mismatch is an error.
pub fn typed<T: Any + Send + Sync>(id: &str, instance: Option<Instance>) -> Result<Option<Arc<T>>> {
    instance
        .map(|instance| downcast(&ServiceId::new(id), instance))
        .transpose()
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{CONTAINER_SCOPE, ScopedContainer, typed};
    pub use crate::argument::{Argument, Arguments};
    pub use crate::builder::ServiceBuilder;
    pub use crate::descriptor::ServiceDescriptor;
    pub use crate::error::{Result, WharfError};
    pub use crate::key::ServiceId;
    pub use crate::parameter::{ParameterStore, ParameterValue};
    pub use crate::provider::{Provider, ServiceRegistry};
    pub use crate::reference::{InvalidBehavior, Reference};
    pub use crate::registry::{Instance, Resolver, TypeRegistry, resolve};
    pub use crate::scope::{Scope, ScopeKind};
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
