//! Service lifecycle scopes.
//!
//! A scope decides when an instance may be reused:
//! - [`ScopeKind::Container`]: one instance per scope, cached until dropped
//! - [`ScopeKind::Nesting`]: like `Container`, but [`Scope::enter`] starts
//!   a fresh cache frame and [`Scope::leave`] discards it again
//! - [`ScopeKind::Transient`]: new instance on every lookup
//!
//! # Examples
//! ```
//! use std::sync::Arc;
//! use wharf_container::builder::ServiceBuilder;
//! use wharf_container::key::ServiceId;
//! use wharf_container::registry::Instance;
//! use wharf_container::scope::Scope;
//!
//! let request = Scope::nesting(ServiceBuilder::new());
//! let outer: Instance = Arc::new("outer");
//! request.set(&ServiceId::new("req"), outer);
//!
//! request.enter();
//! assert!(!request.has(&ServiceId::new("req")));
//! assert!(request.leave());
//! assert!(request.has(&ServiceId::new("req")));
//! ```

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::builder::ServiceBuilder;
use crate::error::{Result, UnknownServiceError, WharfError};
use crate::key::ServiceId;
use crate::reference::InvalidBehavior;
use crate::registry::{Instance, Resolver};

/// The lifecycle policy of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// One instance per id, shared until the scope is dropped.
    ///
    /// # When to use
    /// - Database connection pools
    /// - Configuration objects
    Container,

    /// One instance per id per entered frame.
    ///
    /// # When to use
    /// - Per-request services
    /// - Transaction-bound repositories
    Nesting,

    /// Never cached. Each lookup builds a fresh instance.
    ///
    /// # When to use
    /// - Stateless helpers
    /// - Per-call builders and value objects
    Transient,
}

impl ScopeKind {
    /// Returns `true` if this kind caches instances.
    #[inline]
    pub fn is_cached(&self) -> bool {
        matches!(self, ScopeKind::Container | ScopeKind::Nesting)
    }

    #[inline]
    pub fn is_nesting(&self) -> bool {
        matches!(self, ScopeKind::Nesting)
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKind::Container => write!(f, "container"),
            ScopeKind::Nesting => write!(f, "nesting"),
            ScopeKind::Transient => write!(f, "transient"),
        }
    }
}

type Frame = HashMap<ServiceId, Instance>;

#[derive(Default)]
struct Frames {
    current: Frame,
    saved: Vec<Frame>,
}

/// A lifecycle policy plus the builder for the services it owns.
///
/// The scope exclusively owns its cache; the container only talks to it
/// through the methods below.
pub struct Scope {
    kind: ScopeKind,
    builder: ServiceBuilder,
    frames: Mutex<Frames>,
}

impl Scope {
    pub fn new(kind: ScopeKind, builder: ServiceBuilder) -> Self {
        Self {
            kind,
            builder,
            frames: Mutex::new(Frames::default()),
        }
    }

    pub fn container(builder: ServiceBuilder) -> Self {
        Self::new(ScopeKind::Container, builder)
    }

    pub fn nesting(builder: ServiceBuilder) -> Self {
        Self::new(ScopeKind::Nesting, builder)
    }

    pub fn transient(builder: ServiceBuilder) -> Self {
        Self::new(ScopeKind::Transient, builder)
    }

    #[inline]
    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn builder(&self) -> &ServiceBuilder {
        &self.builder
    }

    /// Starts a fresh cache frame. No-op unless nesting.
    pub fn enter(&self) {
        if self.kind.is_nesting() {
            let mut frames = self.frames.lock();
            let parent = std::mem::take(&mut frames.current);
            frames.saved.push(parent);
            debug!(depth = frames.saved.len(), "Entered nested frame");
        }
    }

    /// Discards the frame started by the matching [`enter()`](Scope::enter).
    ///
    /// Returns `false` if a nesting scope has no entered frame.
    pub fn leave(&self) -> bool {
        if !self.kind.is_nesting() {
            return true;
        }

        let mut frames = self.frames.lock();
        match frames.saved.pop() {
            Some(parent) => {
                frames.current = parent;
                debug!(depth = frames.saved.len(), "Left nested frame");
                true
            }
            None => false,
        }
    }

    /// Number of frames currently entered.
    pub fn depth(&self) -> usize {
        self.frames.lock().saved.len()
    }

    /// Whether any frame, entered or saved, holds an instance for `id`.
    pub(crate) fn remembers(&self, id: &ServiceId) -> bool {
        let frames = self.frames.lock();
        frames.current.contains_key(id) || frames.saved.iter().any(|f| f.contains_key(id))
    }

    pub fn has(&self, id: &ServiceId) -> bool {
        (self.kind.is_cached() && self.frames.lock().current.contains_key(id)) || self.builder.has(id)
    }

    /// Returns the cached instance or builds one.
    ///
    /// Re-entrant: no lock is held while the builder runs, so the builder
    /// may resolve other services of this scope through `resolver`.
    pub fn get(
        &self,
        id: &ServiceId,
        behavior: InvalidBehavior,
        resolver: &dyn Resolver,
    ) -> Result<Option<Instance>> {
        if self.kind.is_cached() {
            if let Some(instance) = self.frames.lock().current.get(id) {
                trace!(id = %id, "Cache hit");
                return Ok(Some(instance.clone()));
            }
        }

        match self.builder.create(id, resolver)? {
            Some(instance) if self.kind.is_cached() => {
                let mut frames = self.frames.lock();
                let kept = frames.current.entry(id.clone()).or_insert(instance);
                Ok(Some(kept.clone()))
            }
            Some(instance) => Ok(Some(instance)),
            None if behavior.is_fail() => Err(WharfError::UnknownService(UnknownServiceError {
                id: id.clone(),
                required_by: None,
                suggestions: vec![],
            })),
            None => Ok(None),
        }
    }

    /// Pins an instance into the current frame, bypassing the builder.
    ///
    /// Transient scopes cannot hold instances; the call is ignored.
    pub fn set(&self, id: &ServiceId, instance: Instance) {
        if !self.kind.is_cached() {
            debug!(id = %id, "Ignoring set on a transient scope");
            return;
        }
        self.frames.lock().current.insert(id.clone(), instance);
    }

    /// Ids of explicitly set instances and of known descriptors.
    pub fn service_ids(&self) -> Vec<ServiceId> {
        let mut ids = self.builder.service_ids();
        if self.kind.is_cached() {
            ids.extend(self.frames.lock().current.keys().cloned());
        }
        ids.sort();
        ids.dedup();
        ids
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frames = self.frames.lock();
        f.debug_struct("Scope")
            .field("kind", &self.kind)
            .field("cached", &frames.current.len())
            .field("depth", &frames.saved.len())
            .field("builder", &self.builder)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ServiceDescriptor;
    use crate::parameter::ParameterValue;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// A resolver with no services; enough for descriptors without references.
    struct NoServices;

    impl Resolver for NoServices {
        fn get(&self, _id: &ServiceId, _behavior: InvalidBehavior) -> Result<Option<Instance>> {
            Ok(None)
        }

        fn has(&self, _id: &ServiceId) -> bool {
            false
        }

        fn resolve_value(&self, value: &ParameterValue) -> Result<ParameterValue> {
            Ok(value.clone())
        }
    }

    fn counting_builder(counter: &Arc<AtomicU32>) -> ServiceBuilder {
        let counter = counter.clone();
        ServiceBuilder::new().with_descriptor(
            "counter",
            ServiceDescriptor::from_fn(move |_| Ok(counter.fetch_add(1, Ordering::SeqCst))),
        )
    }

    fn id(s: &str) -> ServiceId {
        ServiceId::new(s)
    }

    #[test]
    fn kind_properties() {
        assert!(ScopeKind::Container.is_cached());
        assert!(ScopeKind::Nesting.is_cached());
        assert!(!ScopeKind::Transient.is_cached());
        assert_eq!(format!("{}", ScopeKind::Nesting), "nesting");
    }

    #[test]
    fn container_scope_caches() {
        let counter = Arc::new(AtomicU32::new(0));
        let scope = Scope::container(counting_builder(&counter));

        let a = scope.get(&id("counter"), InvalidBehavior::Fail, &NoServices).unwrap().unwrap();
        let b = scope.get(&id("counter"), InvalidBehavior::Fail, &NoServices).unwrap().unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn transient_scope_rebuilds_and_ignores_set() {
        let counter = Arc::new(AtomicU32::new(0));
        let scope = Scope::transient(counting_builder(&counter));

        let a = scope.get(&id("counter"), InvalidBehavior::Fail, &NoServices).unwrap().unwrap();
        let b = scope.get(&id("counter"), InvalidBehavior::Fail, &NoServices).unwrap().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));

        scope.set(&id("pinned"), Arc::new(1u8));
        assert!(!scope.has(&id("pinned")));
        assert_eq!(scope.service_ids(), vec![id("counter")]);

        scope.enter();
        assert!(scope.leave());
    }

    #[test]
    fn nesting_isolation() {
        let scope = Scope::nesting(ServiceBuilder::new());
        let a: Instance = Arc::new("A");
        let b: Instance = Arc::new("B");

        scope.set(&id("x"), a.clone());
        scope.enter();
        scope.set(&id("x"), b.clone());
        let inner = scope.get(&id("x"), InvalidBehavior::Fail, &NoServices).unwrap().unwrap();
        assert!(Arc::ptr_eq(&inner, &b));

        assert!(scope.leave());
        let outer = scope.get(&id("x"), InvalidBehavior::Fail, &NoServices).unwrap().unwrap();
        assert!(Arc::ptr_eq(&outer, &a));
    }

    #[test]
    fn built_instances_vanish_on_leave() {
        let counter = Arc::new(AtomicU32::new(0));
        let scope = Scope::nesting(counting_builder(&counter));

        scope.enter();
        scope.get(&id("counter"), InvalidBehavior::Fail, &NoServices).unwrap();
        scope.get(&id("counter"), InvalidBehavior::Fail, &NoServices).unwrap();
        assert!(scope.leave());

        scope.enter();
        scope.get(&id("counter"), InvalidBehavior::Fail, &NoServices).unwrap();
        assert!(scope.leave());

        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unbalanced_leave_is_reported() {
        let scope = Scope::nesting(ServiceBuilder::new());
        assert!(!scope.leave());

        scope.enter();
        scope.enter();
        assert_eq!(scope.depth(), 2);
        assert!(scope.leave());
        assert!(scope.leave());
        assert!(!scope.leave());
    }

    #[test]
    fn saved_frames_are_remembered() {
        let scope = Scope::nesting(ServiceBuilder::new());
        assert!(!scope.remembers(&id("x")));

        scope.set(&id("x"), Arc::new(1u8));
        scope.enter();
        assert!(!scope.has(&id("x")));
        assert!(scope.remembers(&id("x")));

        assert!(scope.leave());
        assert!(scope.has(&id("x")));
    }

    #[test]
    fn missing_service_honors_behavior() {
        let scope = Scope::container(ServiceBuilder::new());

        assert!(scope.get(&id("nope"), InvalidBehavior::ReturnEmpty, &NoServices).unwrap().is_none());
        assert!(scope.get(&id("nope"), InvalidBehavior::Ignore, &NoServices).unwrap().is_none());
        match scope.get(&id("nope"), InvalidBehavior::Fail, &NoServices) {
            Err(WharfError::UnknownService(err)) => assert_eq!(err.id, id("nope")),
            other => panic!("Expected UnknownService, got: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn service_ids_union_set_and_declared() {
        let counter = Arc::new(AtomicU32::new(0));
        let scope = Scope::container(counting_builder(&counter));
        scope.set(&id("Config"), Arc::new(()));
        scope.set(&id("counter"), Arc::new(7u32));

        assert_eq!(scope.service_ids(), vec![id("config"), id("counter")]);
    }
}
