//! RAII guard around a nesting scope.

use tracing::{debug, warn};
use wharf_container::{Result, ScopedContainer};

/// Enters a scope on creation and leaves it on drop.
///
/// Everything set or built in the scope during the session is discarded
/// when the guard goes out of scope, even on early return.
#[must_use = "the scope is left as soon as the session is dropped"]
pub struct Session<'a> {
    container: &'a ScopedContainer,
    scope: String,
}

impl<'a> Session<'a> {
    /// # Errors
    /// [`WharfError::UnknownScope`](wharf_container::WharfError::UnknownScope)
    /// if `scope` is not registered.
    pub fn enter(container: &'a ScopedContainer, scope: &str) -> Result<Self> {
        container.enter_scope(scope)?;
        debug!(scope, "Session started");
        Ok(Self {
            container,
            scope: scope.to_string(),
        })
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.container.leave_scope(&self.scope) {
            warn!(scope = %self.scope, error = %err, "Failed to leave scope");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use wharf_container::builder::ServiceBuilder;
    use wharf_container::descriptor::ServiceDescriptor;
    use wharf_container::registry::Instance;
    use wharf_container::scope::Scope;
    use wharf_container::{InvalidBehavior, WharfError};

    fn container() -> ScopedContainer {
        let container = ScopedContainer::new();
        container
            .register_scope("request", Scope::nesting(ServiceBuilder::new()), 1)
            .unwrap();
        container
            .register_descriptor(
                "handler",
                ServiceDescriptor::from_fn(|_| Ok(String::from("handler"))).scope("request"),
            )
            .unwrap();
        container
    }

    #[test]
    fn session_discards_instances_on_drop() {
        let container = container();
        let outer = container.get("handler", InvalidBehavior::Fail).unwrap().unwrap();

        {
            let session = Session::enter(&container, "request").unwrap();
            assert_eq!(session.scope(), "request");

            let user: Instance = Arc::new("alice");
            container.set("user", user, Some("request")).unwrap();

            let inner = container.get("handler", InvalidBehavior::Fail).unwrap().unwrap();
            assert!(!Arc::ptr_eq(&outer, &inner));
        }

        assert!(!container.has("user"));
        let again = container.get("handler", InvalidBehavior::Fail).unwrap().unwrap();
        assert!(Arc::ptr_eq(&outer, &again));
    }

    #[test]
    fn sessions_nest() {
        let container = container();

        let _outer = Session::enter(&container, "request").unwrap();
        let first = container.get("handler", InvalidBehavior::Fail).unwrap().unwrap();
        {
            let _inner = Session::enter(&container, "request").unwrap();
            let second = container.get("handler", InvalidBehavior::Fail).unwrap().unwrap();
            assert!(!Arc::ptr_eq(&first, &second));
        }
        let after = container.get("handler", InvalidBehavior::Fail).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &after));
    }

    #[test]
    fn unknown_scope_is_rejected() {
        let container = container();
        match Session::enter(&container, "session") {
            Err(WharfError::UnknownScope { name }) => assert_eq!(name, "session"),
            other => panic!("Expected UnknownScope, got: {:?}", other.map(|s| s.scope().to_string())),
        }
    }
}
