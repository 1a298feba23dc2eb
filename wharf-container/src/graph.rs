//! Static validation of the service graph.
//!
//! [`ScopedContainer::validate()`](crate::container::ScopedContainer::validate)
//! walks every descriptor before the first lookup and reports:
//! - `Fail` references to ids nothing provides
//! - reference cycles
//! - references from a more global scope into a more local one
//!
//! The check is pairwise (consumer against each dependency), so it is
//! stricter than the lookup-time rule, which compares against the
//! outermost scope of a resolution only.

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument, warn};
use wharf_support::rendering::{ChainEntry, suggest_similar};

use crate::error::{
    CircularReferenceError, CycleKind, InaccessibleScopeError, UnknownServiceError, WharfError,
};
use crate::key::ServiceId;
use crate::reference::{InvalidBehavior, Reference};

/// Information about a described service needed for validation.
#[derive(Debug, Clone)]
pub(crate) struct DependencyInfo {
    pub id: ServiceId,
    /// References declared by the descriptor, aliases already followed
    pub dependencies: Vec<Reference>,
    pub scope: String,
    pub level: i32,
}

/// Where an id lives, for every id the container can serve.
#[derive(Debug, Clone)]
pub(crate) struct Placement {
    pub scope: String,
    pub level: i32,
}

/// Depth-first validator with a "path" set for cycle detection.
pub(crate) struct GraphValidator {
    described: HashMap<ServiceId, DependencyInfo>,
    placements: HashMap<ServiceId, Placement>,
    visiting: HashSet<ServiceId>,
    validated: HashSet<ServiceId>,
    path: Vec<ServiceId>,
}

impl GraphValidator {
    pub fn new(
        described: HashMap<ServiceId, DependencyInfo>,
        placements: HashMap<ServiceId, Placement>,
    ) -> Self {
        Self {
            described,
            placements,
            visiting: HashSet::new(),
            validated: HashSet::new(),
            path: Vec::new(),
        }
    }

    /// Validates the entire graph.
    ///
    /// # Errors
    /// - [`WharfError::CircularReference`]: cycle detected
    /// - [`WharfError::UnknownService`]: `Fail` reference to a missing id
    /// - [`WharfError::InaccessibleScope`]: level violation
    #[instrument(skip(self), name = "graph_validation")]
    pub fn validate(&mut self) -> Result<(), WharfError> {
        let mut ids: Vec<ServiceId> = self.described.keys().cloned().collect();
        ids.sort();

        debug!(service_count = ids.len(), "Starting service graph validation");

        for id in ids {
            self.validate_id(&id)?;
        }

        debug!("Service graph validation passed");
        Ok(())
    }

    fn validate_id(&mut self, id: &ServiceId) -> Result<(), WharfError> {
        if self.validated.contains(id) {
            return Ok(());
        }

        if self.visiting.contains(id) {
            let start = self.path.iter().position(|k| k == id).unwrap_or(0);
            let chain = self.path[start..].to_vec();
            warn!(cycle = ?chain, "Circular reference detected");

            return Err(WharfError::CircularReference(CircularReferenceError {
                id: id.clone(),
                chain,
                kind: CycleKind::Construction,
            }));
        }

        // Instances set directly have no descriptor to walk.
        let Some(info) = self.described.get(id).cloned() else {
            self.validated.insert(id.clone());
            return Ok(());
        };

        self.visiting.insert(id.clone());
        self.path.push(id.clone());

        for dependency in &info.dependencies {
            let Some(placement) = self.placements.get(dependency.id()).cloned() else {
                if dependency.on_missing() == InvalidBehavior::Fail {
                    return Err(self.unknown(dependency.id(), id));
                }
                continue;
            };

            if placement.level > info.level {
                warn!(
                    consumer = %info.id,
                    dependency = %dependency.id(),
                    "Scope violation detected"
                );
                return Err(WharfError::InaccessibleScope(InaccessibleScopeError {
                    id: dependency.id().clone(),
                    scope: placement.scope,
                    level: placement.level,
                    current_scope: info.scope.clone(),
                    current_level: info.level,
                    path: self.chain_entries(),
                }));
            }

            self.validate_id(dependency.id())?;
        }

        self.path.pop();
        self.visiting.remove(id);
        self.validated.insert(id.clone());

        Ok(())
    }

    fn unknown(&self, missing: &ServiceId, required_by: &ServiceId) -> WharfError {
        let known: Vec<&str> = self.placements.keys().map(ServiceId::as_str).collect();
        WharfError::UnknownService(UnknownServiceError {
            id: missing.clone(),
            required_by: Some(required_by.clone()),
            suggestions: suggest_similar(missing.as_str(), &known, 3),
        })
    }

    fn chain_entries(&self) -> Vec<ChainEntry> {
        self.path
            .iter()
            .filter_map(|id| {
                let placement = self.placements.get(id)?;
                Some(ChainEntry {
                    service: id.to_string(),
                    scope: placement.scope.clone(),
                    level: Some(placement.level),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ServiceId {
        ServiceId::new(s)
    }

    fn info(name: &str, scope: &str, level: i32, deps: Vec<Reference>) -> DependencyInfo {
        DependencyInfo {
            id: id(name),
            dependencies: deps,
            scope: scope.to_string(),
            level,
        }
    }

    fn validator(infos: Vec<DependencyInfo>, extra: &[(&str, &str, i32)]) -> GraphValidator {
        let mut placements: HashMap<ServiceId, Placement> = infos
            .iter()
            .map(|i| {
                (
                    i.id.clone(),
                    Placement {
                        scope: i.scope.clone(),
                        level: i.level,
                    },
                )
            })
            .collect();
        for (name, scope, level) in extra {
            placements.insert(
                id(name),
                Placement {
                    scope: scope.to_string(),
                    level: *level,
                },
            );
        }
        let described = infos.into_iter().map(|i| (i.id.clone(), i)).collect();
        GraphValidator::new(described, placements)
    }

    #[test]
    fn valid_simple_graph() {
        let mut v = validator(
            vec![
                info("database", "container", 0, vec![]),
                info("repo", "container", 0, vec![Reference::new("database")]),
                info("handler", "request", 1, vec![Reference::new("repo")]),
            ],
            &[],
        );
        assert!(v.validate().is_ok());
    }

    #[test]
    fn detect_cycle() {
        let mut v = validator(
            vec![
                info("a", "container", 0, vec![Reference::new("b")]),
                info("b", "container", 0, vec![Reference::new("c")]),
                info("c", "container", 0, vec![Reference::new("a")]),
            ],
            &[],
        );

        match v.validate() {
            Err(WharfError::CircularReference(err)) => {
                assert_eq!(err.chain, vec![id("a"), id("b"), id("c")]);
                assert_eq!(err.id, id("a"));
            }
            other => panic!("Expected CircularReference, got: {other:?}"),
        }
    }

    #[test]
    fn detect_self_reference() {
        let mut v = validator(vec![info("a", "container", 0, vec![Reference::new("a")])], &[]);
        assert!(v.validate().is_err());
    }

    #[test]
    fn missing_fail_reference() {
        let mut v = validator(vec![info("a", "container", 0, vec![Reference::new("logr")])], &[("logger", "container", 0)]);

        match v.validate() {
            Err(WharfError::UnknownService(err)) => {
                assert_eq!(err.id, id("logr"));
                assert_eq!(err.required_by, Some(id("a")));
                assert_eq!(err.suggestions, vec!["logger".to_string()]);
            }
            other => panic!("Expected UnknownService, got: {other:?}"),
        }
    }

    #[test]
    fn missing_tolerant_reference_is_fine() {
        let mut v = validator(
            vec![info(
                "a",
                "container",
                0,
                vec![Reference::new("x").or_ignore(), Reference::new("y").or_empty()],
            )],
            &[],
        );
        assert!(v.validate().is_ok());
    }

    #[test]
    fn detect_scope_violation() {
        let mut v = validator(
            vec![
                info("request", "request", 1, vec![]),
                info("mailer", "container", 0, vec![Reference::new("request")]),
            ],
            &[],
        );

        match v.validate() {
            Err(WharfError::InaccessibleScope(err)) => {
                assert_eq!(err.current_scope, "container");
                assert_eq!(err.scope, "request");
            }
            other => panic!("Expected InaccessibleScope, got: {other:?}"),
        }
    }

    #[test]
    fn set_instances_are_leaves() {
        let mut v = validator(
            vec![info("mailer", "container", 0, vec![Reference::new("config")])],
            &[("config", "container", 0)],
        );
        assert!(v.validate().is_ok());
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let mut v = validator(
            vec![
                info("d", "container", 0, vec![]),
                info("b", "container", 0, vec![Reference::new("d")]),
                info("c", "container", 0, vec![Reference::new("d")]),
                info("a", "container", 0, vec![Reference::new("b"), Reference::new("c")]),
            ],
            &[],
        );
        assert!(v.validate().is_ok());
    }
}
