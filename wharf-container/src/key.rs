//! Service identification keys.
//!
//! [`ServiceId`] identifies a service within the container. Ids are
//! compared case-insensitively, so every id is normalized to lowercase
//! when the key is created.

use std::borrow::Borrow;
use std::fmt;

/// Uniquely identifies a service in the container.
///
/// # Examples
/// ```
/// use wharf_container::key::ServiceId;
///
/// let id = ServiceId::new("Mailer.Transport");
/// assert_eq!(id.as_str(), "mailer.transport");
/// assert_eq!(id, ServiceId::from("MAILER.transport"));
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceId(String);

impl ServiceId {
    /// Creates a normalized key from any string-like id.
    #[inline]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().to_lowercase())
    }

    /// Returns the normalized id.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ServiceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ServiceId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<&ServiceId> for ServiceId {
    fn from(id: &ServiceId) -> Self {
        id.clone()
    }
}

impl AsRef<str> for ServiceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ServiceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceId({:?})", self.0)
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
