//! Forward references to other services.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::key::ServiceId;

/// What a lookup does when the requested id is unknown.
///
/// The numeric codes are stable and match existing configuration formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum InvalidBehavior {
    /// Fail with [`WharfError::UnknownService`](crate::error::WharfError::UnknownService).
    #[default]
    Fail = 1,
    /// Return an empty result.
    ReturnEmpty = 2,
    /// Treat the reference as absent; a method call holding such a
    /// reference is skipped entirely.
    Ignore = 3,
}

impl InvalidBehavior {
    /// Returns the stable numeric code.
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Parses a stable numeric code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(InvalidBehavior::Fail),
            2 => Some(InvalidBehavior::ReturnEmpty),
            3 => Some(InvalidBehavior::Ignore),
            _ => None,
        }
    }

    #[inline]
    pub fn is_fail(self) -> bool {
        matches!(self, InvalidBehavior::Fail)
    }
}

impl fmt::Display for InvalidBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidBehavior::Fail => write!(f, "fail"),
            InvalidBehavior::ReturnEmpty => write!(f, "return-empty"),
            InvalidBehavior::Ignore => write!(f, "ignore"),
        }
    }
}

/// A pointer from one service's arguments to another service id.
///
/// # Examples
/// ```
/// use wharf_container::reference::{InvalidBehavior, Reference};
///
/// let logger = Reference::new("Logger").or_ignore();
/// assert_eq!(logger.id().as_str(), "logger");
/// assert_eq!(logger.on_missing(), InvalidBehavior::Ignore);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    id: ServiceId,
    on_missing: InvalidBehavior,
}

impl Reference {
    /// A reference that fails when the target is missing.
    pub fn new(id: impl Into<ServiceId>) -> Self {
        Self {
            id: id.into(),
            on_missing: InvalidBehavior::Fail,
        }
    }

    pub fn with_behavior(id: impl Into<ServiceId>, on_missing: InvalidBehavior) -> Self {
        Self {
            id: id.into(),
            on_missing,
        }
    }

    /// Resolves to an empty argument when the target is missing.
    pub fn or_empty(mut self) -> Self {
        self.on_missing = InvalidBehavior::ReturnEmpty;
        self
    }

    /// Skips the enclosing method call when the target is missing.
    pub fn or_ignore(mut self) -> Self {
        self.on_missing = InvalidBehavior::Ignore;
        self
    }

    #[inline]
    pub fn id(&self) -> &ServiceId {
        &self.id
    }

    #[inline]
    pub fn on_missing(&self) -> InvalidBehavior {
        self.on_missing
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.id)?;
        match self.on_missing {
            InvalidBehavior::Fail => Ok(()),
            InvalidBehavior::ReturnEmpty => write!(f, "?"),
            InvalidBehavior::Ignore => write!(f, "?!"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(InvalidBehavior::Fail.code(), 1);
        assert_eq!(InvalidBehavior::ReturnEmpty.code(), 2);
        assert_eq!(InvalidBehavior::Ignore.code(), 3);
        assert_eq!(InvalidBehavior::from_code(3), Some(InvalidBehavior::Ignore));
        assert_eq!(InvalidBehavior::from_code(0), None);
    }

    #[test]
    fn behavior_serializes_by_name() {
        let behavior: InvalidBehavior = serde_json::from_str(r#""ReturnEmpty""#).unwrap();
        assert_eq!(behavior, InvalidBehavior::ReturnEmpty);

        for behavior in [
            InvalidBehavior::Fail,
            InvalidBehavior::ReturnEmpty,
            InvalidBehavior::Ignore,
        ] {
            let json = serde_json::to_string(&behavior).unwrap();
            assert_eq!(serde_json::from_str::<InvalidBehavior>(&json).unwrap(), behavior);
        }
        assert!(serde_json::from_str::<InvalidBehavior>(r#""Skip""#).is_err());
    }

    #[test]
    fn default_is_fail() {
        assert_eq!(InvalidBehavior::default(), InvalidBehavior::Fail);
        assert_eq!(Reference::new("a").on_missing(), InvalidBehavior::Fail);
    }

    #[test]
    fn reference_display() {
        assert_eq!(Reference::new("Mailer").to_string(), "@mailer");
        assert_eq!(Reference::new("logger").or_empty().to_string(), "@logger?");
        assert_eq!(Reference::new("logger").or_ignore().to_string(), "@logger?!");
    }
}
