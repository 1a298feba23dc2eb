//! Error types for Wharf container operations.
//!
//! Every error here is a programmer or configuration error. Nothing is
//! retried internally; errors propagate to the caller of `get`, `set` or
//! `register_scope`. The only softening is the
//! [`InvalidBehavior`](crate::reference::InvalidBehavior) of a lookup, which
//! may turn [`WharfError::UnknownService`] into an empty result.

use std::fmt;

use wharf_support::rendering::{ChainEntry, render_chain, render_chain_vertical};

use crate::key::ServiceId;

/// Main error type for all Wharf operations.
#[derive(Debug, thiserror::Error)]
pub enum WharfError {
    /// Requested service has no descriptor, no cached instance and no alias.
    #[error("{}", .0)]
    UnknownService(UnknownServiceError),

    /// A service (or alias) was requested while it was already loading.
    #[error("{}", .0)]
    CircularReference(CircularReferenceError),

    /// A more global scope tried to pull a service from a more local one.
    #[error("{}", .0)]
    InaccessibleScope(InaccessibleScopeError),

    /// Operation referenced a scope that was never registered.
    #[error("There is no \"{name}\" scope.")]
    UnknownScope { name: String },

    /// `set` without a scope name while no scope is registered at all.
    #[error("There are no scopes registered")]
    NoScopes,

    /// A scope with the same name is already registered.
    #[error("There is already a \"{name}\" scope registered.")]
    DuplicateScope { name: String },

    /// `set` targeted a scope other than the one the id is mapped to.
    #[error("{}", .0)]
    ScopeMismatch(ScopeMismatchError),

    /// The builder could not produce an instance.
    #[error("Failed to construct \"{id}\": {reason}")]
    Construction { id: ServiceId, reason: String },

    /// User construction code returned an error.
    #[error("Failed to construct \"{id}\": {source}")]
    ConstructionFailed {
        id: ServiceId,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The declared factory cannot be invoked.
    #[error("Invalid factory for \"{id}\": {reason}")]
    InvalidFactory { id: ServiceId, reason: String },

    /// The declared configurator cannot be invoked.
    #[error("The configurator for \"{id}\" is not callable: {reason}")]
    InvalidConfigurator { id: ServiceId, reason: String },

    /// Mutation attempted after `compile()`.
    #[error("Container is frozen: cannot {operation} after compile()")]
    ContainerFrozen { operation: &'static str },

    /// A parameter (or placeholder) names an unknown parameter.
    #[error("{}", .0)]
    ParameterNotFound(ParameterNotFoundError),

    /// A placeholder chain revisited a parameter already being resolved.
    #[error(
        "Circular reference detected for parameter \"{}\" ({})",
        .chain.last().map(String::as_str).unwrap_or_default(),
        render_chain(.chain)
    )]
    CircularParameter { chain: Vec<String> },

    /// A parameter value cannot be used where it was placed.
    #[error("Invalid value for parameter \"{name}\": {reason}")]
    InvalidParameter { name: String, reason: String },

    /// `leave` on a nesting scope that has no entered frame.
    #[error("Cannot leave the \"{scope}\" scope: it has no entered frame")]
    UnbalancedLeave { scope: String },

    /// A construction function received an argument of the wrong shape.
    #[error("{}", .0)]
    Argument(ArgumentError),

    /// An error raised by user code outside a known service.
    #[error("{source}")]
    Other {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl WharfError {
    /// Wraps any error raised by user construction code.
    ///
    /// The builder attaches the service id when the error surfaces
    /// from a construction function.
    pub fn other(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        WharfError::Other { source: source.into() }
    }

    /// Returns `true` if an [`InvalidBehavior`](crate::reference::InvalidBehavior)
    /// other than `Fail` may turn this error into an empty result.
    ///
    /// Cycles, scope violations and construction failures are never soft.
    pub fn is_soft(&self) -> bool {
        matches!(self, WharfError::UnknownService(_))
    }

    /// Attaches a service id to errors raised by construction code.
    pub(crate) fn within(self, id: &ServiceId) -> Self {
        match self {
            WharfError::Other { source } => WharfError::ConstructionFailed {
                id: id.clone(),
                source,
            },
            WharfError::Argument(err) => WharfError::Construction {
                id: id.clone(),
                reason: err.to_string(),
            },
            other => other,
        }
    }
}

/// Error when a service id is not known to the container.
#[derive(Debug)]
pub struct UnknownServiceError {
    /// The id that was requested
    pub id: ServiceId,
    /// The service whose construction required it (if known)
    pub required_by: Option<ServiceId>,
    /// Similar ids that ARE registered
    pub suggestions: Vec<String>,
}

impl fmt::Display for UnknownServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "The service \"{}\" does not exist.", self.id)?;

        if let Some(ref parent) = self.required_by {
            write!(f, "\n  Required by: {parent}")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: register a descriptor for \"{}\" or set an instance before looking it up",
            self.id
        )
    }
}

/// Which kind of chain revisited itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    /// A service was requested again while it was being constructed.
    Construction,
    /// An alias chain points back to itself.
    Alias,
}

/// Error when a circular reference is detected.
///
/// Shows the full in-flight chain so you can see WHERE the cycle is.
#[derive(Debug)]
pub struct CircularReferenceError {
    /// The id that closed the cycle
    pub id: ServiceId,
    /// The ids in flight when the cycle was found, outermost first
    pub chain: Vec<ServiceId>,
    pub kind: CycleKind,
}

impl fmt::Display for CircularReferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let loading: Vec<&str> = self.chain.iter().map(ServiceId::as_str).collect();
        let mut closed = loading.clone();
        closed.push(self.id.as_str());

        match self.kind {
            CycleKind::Construction => write!(
                f,
                "Circular reference detected for service \"{}\" (services currently loading: {})",
                self.id,
                loading.join(", "),
            )?,
            CycleKind::Alias => write!(
                f,
                "Circular alias detected for \"{}\" (aliases followed: {})",
                self.id,
                loading.join(", "),
            )?,
        }

        write!(f, "\n  {}", render_chain(&closed))?;
        write!(
            f,
            "\n  Hint: break the cycle with a setter call or an Ignore reference"
        )
    }
}

/// Error when a more global scope reaches into a more local one.
///
/// A service cached in a long-lived scope would keep a stale reference
/// to a short-lived one.
#[derive(Debug)]
pub struct InaccessibleScopeError {
    /// The service that was requested
    pub id: ServiceId,
    pub scope: String,
    pub level: i32,
    /// The scope that governs the current resolution
    pub current_scope: String,
    pub current_level: i32,
    /// The in-flight chain, outermost first
    pub path: Vec<ChainEntry>,
}

impl fmt::Display for InaccessibleScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Services in the \"{}\" scope (i.e. \"{}\") are not available to services in the \"{}\" scope.",
            self.scope, self.id, self.current_scope,
        )?;

        if !self.path.is_empty() {
            write!(f, "\n{}", render_chain_vertical(&self.path).trim_end())?;
        }

        write!(
            f,
            "\n  Hint: move \"{}\" to the \"{}\" scope (level {}) or a more global one",
            self.id, self.current_scope, self.current_level,
        )
    }
}

/// Error when `set` names a scope other than the id's mapped scope.
#[derive(Debug)]
pub struct ScopeMismatchError {
    pub id: ServiceId,
    /// The scope the id is already mapped to
    pub mapped_scope: String,
    /// The scope the caller asked for
    pub requested_scope: String,
}

impl fmt::Display for ScopeMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "There is already a \"{}\" service set on the \"{}\" scope.",
            self.id, self.mapped_scope,
        )?;
        write!(
            f,
            "\n  Hint: set it on \"{}\" or omit the scope name instead of \"{}\"",
            self.mapped_scope, self.requested_scope,
        )
    }
}

/// Error when a parameter is not defined.
#[derive(Debug)]
pub struct ParameterNotFoundError {
    pub name: String,
    /// The parameter whose value referenced it (if any)
    pub required_by: Option<String>,
    pub suggestions: Vec<String>,
}

impl fmt::Display for ParameterNotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.required_by {
            Some(ref parent) => write!(
                f,
                "The parameter \"{parent}\" has a dependency on a non-existent parameter \"{}\".",
                self.name
            )?,
            None => write!(f, "You have requested a non-existent parameter \"{}\".", self.name)?,
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        Ok(())
    }
}

/// Error when a construction function reads an argument of the wrong kind.
#[derive(Debug)]
pub struct ArgumentError {
    /// Position of the argument in the resolved list
    pub index: usize,
    pub expected: String,
    pub found: String,
}

impl fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Argument #{}: expected {}, found {}",
            self.index, self.expected, self.found,
        )
    }
}

/// Convenient Result type for Wharf operations.
pub type Result<T> = std::result::Result<T, WharfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_service_error_display() {
        let err = WharfError::UnknownService(UnknownServiceError {
            id: ServiceId::from("mailer"),
            required_by: Some(ServiceId::from("newsletter")),
            suggestions: vec!["mailer.transport".to_string()],
        });

        let msg = format!("{err}");
        assert!(msg.contains("\"mailer\" does not exist"));
        assert!(msg.contains("Required by: newsletter"));
        assert!(msg.contains("mailer.transport"));
        assert!(err.is_soft());
    }

    #[test]
    fn circular_reference_error_display() {
        let err = WharfError::CircularReference(CircularReferenceError {
            id: ServiceId::from("a"),
            chain: vec![ServiceId::from("a"), ServiceId::from("b")],
            kind: CycleKind::Construction,
        });

        let msg = format!("{err}");
        assert!(msg.contains("services currently loading: a, b"));
        assert!(msg.contains("a → b → a"));
        assert!(!err.is_soft());
    }

    #[test]
    fn inaccessible_scope_error_display() {
        let err = WharfError::InaccessibleScope(InaccessibleScopeError {
            id: ServiceId::from("request"),
            scope: "request".into(),
            level: 1,
            current_scope: "container".into(),
            current_level: 0,
            path: vec![ChainEntry {
                service: "mailer".into(),
                scope: "container".into(),
                level: Some(0),
            }],
        });

        let msg = format!("{err}");
        assert!(msg.contains("\"request\" scope"));
        assert!(msg.contains("[container] mailer"));
        assert!(!err.is_soft());
    }

    #[test]
    fn circular_parameter_display() {
        let err = WharfError::CircularParameter {
            chain: vec!["a".into(), "b".into(), "a".into()],
        };
        let msg = format!("{err}");
        assert!(msg.contains("parameter \"a\""));
        assert!(msg.contains("a → b → a"));
    }

    #[test]
    fn other_is_attached_to_service() {
        let err = WharfError::other("connection refused").within(&ServiceId::from("db"));
        match err {
            WharfError::ConstructionFailed { id, source } => {
                assert_eq!(id.as_str(), "db");
                assert_eq!(source.to_string(), "connection refused");
            }
            other => panic!("Expected ConstructionFailed, got: {other:?}"),
        }
    }
}
