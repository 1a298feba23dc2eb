//! Parameter store with `%name%` placeholder interpolation.
//!
//! Parameters are named configuration values. A string value may embed
//! other parameters as `%name%` placeholders; `%%` is an escaped `%`.
//!
//! # Examples
//! ```
//! use wharf_container::parameter::{ParameterStore, ParameterValue};
//!
//! let mut params = ParameterStore::new();
//! params.set("db.name", "app").unwrap();
//! params.set("db.dsn", "mysql://%db.name%").unwrap();
//!
//! let dsn = params.resolve_value(&"%db.dsn%".into()).unwrap();
//! assert_eq!(dsn, ParameterValue::from("mysql://app"));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use wharf_support::rendering::suggest_similar;

use crate::error::{ParameterNotFoundError, Result, WharfError};

/// A configuration value.
///
/// Untagged so that loaders can deserialize plain documents into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<ParameterValue>),
    Map(BTreeMap<String, ParameterValue>),
}

impl ParameterValue {
    /// Returns the string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParameterValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as a float; integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParameterValue::Float(f) => Some(*f),
            ParameterValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ParameterValue]> {
        match self {
            ParameterValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, ParameterValue>> {
        match self {
            ParameterValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ParameterValue::Null)
    }

    /// Short name of the value kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ParameterValue::Null => "null",
            ParameterValue::Bool(_) => "bool",
            ParameterValue::Int(_) => "int",
            ParameterValue::Float(_) => "float",
            ParameterValue::String(_) => "string",
            ParameterValue::List(_) => "list",
            ParameterValue::Map(_) => "map",
        }
    }

    /// Renders a scalar for substitution inside a larger string.
    fn to_embedded(&self, name: &str) -> Result<String> {
        match self {
            ParameterValue::Null => Ok(String::new()),
            ParameterValue::Bool(b) => Ok(b.to_string()),
            ParameterValue::Int(i) => Ok(i.to_string()),
            ParameterValue::Float(f) => Ok(f.to_string()),
            ParameterValue::String(s) => Ok(s.clone()),
            ParameterValue::List(_) | ParameterValue::Map(_) => Err(WharfError::InvalidParameter {
                name: name.to_string(),
                reason: format!(
                    "a {} cannot be embedded inside a string; use \"%{name}%\" on its own",
                    self.kind()
                ),
            }),
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Null => f.write_str("null"),
            ParameterValue::Bool(b) => write!(f, "{b}"),
            ParameterValue::Int(i) => write!(f, "{i}"),
            ParameterValue::Float(x) => write!(f, "{x}"),
            ParameterValue::String(s) => f.write_str(s),
            ParameterValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            ParameterValue::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::String(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::String(value)
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Bool(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Int(value)
    }
}

impl From<i32> for ParameterValue {
    fn from(value: i32) -> Self {
        ParameterValue::Int(value.into())
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Float(value)
    }
}

impl<T: Into<ParameterValue>> From<Vec<T>> for ParameterValue {
    fn from(values: Vec<T>) -> Self {
        ParameterValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, ParameterValue>> for ParameterValue {
    fn from(map: BTreeMap<String, ParameterValue>) -> Self {
        ParameterValue::Map(map)
    }
}

/// Named configuration values.
///
/// Mutable until [`freeze()`](ParameterStore::freeze); after that every
/// value is fully resolved and [`set()`](ParameterStore::set) fails.
/// Names are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct ParameterStore {
    values: BTreeMap<String, ParameterValue>,
    frozen: bool,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw (possibly unresolved) value of a parameter.
    ///
    /// # Errors
    /// [`WharfError::ParameterNotFound`] if the name is not defined.
    pub fn get(&self, name: &str) -> Result<&ParameterValue> {
        let name = name.to_lowercase();
        self.values
            .get(&name)
            .ok_or_else(|| self.not_found(name, None))
    }

    /// Sets a parameter.
    ///
    /// # Errors
    /// [`WharfError::ContainerFrozen`] once the store is frozen.
    pub fn set(&mut self, name: &str, value: impl Into<ParameterValue>) -> Result<()> {
        if self.frozen {
            return Err(WharfError::ContainerFrozen {
                operation: "set a parameter",
            });
        }

        let name = name.to_lowercase();
        let value = value.into();
        trace!(name = %name, kind = value.kind(), "Set parameter");
        self.values.insert(name, value);
        Ok(())
    }

    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Resolves every stored value in place.
    ///
    /// # Errors
    /// - [`WharfError::CircularParameter`] if a placeholder chain loops
    /// - [`WharfError::ParameterNotFound`] for a dangling placeholder
    pub fn resolve(&mut self) -> Result<()> {
        if self.frozen {
            return Ok(());
        }

        let mut resolved = BTreeMap::new();
        for (name, value) in &self.values {
            let mut resolving = vec![name.clone()];
            resolved.insert(name.clone(), self.resolve_inner(value, &mut resolving)?);
        }

        self.values = resolved;
        Ok(())
    }

    /// Resolves all values and makes the store read-only.
    pub fn freeze(&mut self) -> Result<()> {
        self.resolve()?;
        self.frozen = true;
        debug!(parameters = self.values.len(), "Parameters frozen");
        Ok(())
    }

    /// Replaces every placeholder inside `value`, walking lists and maps.
    ///
    /// A string that is exactly one placeholder (`"%port%"`) yields the
    /// referenced value unchanged, so non-string parameters keep their
    /// type. Placeholders embedded in longer strings are stringified.
    pub fn resolve_value(&self, value: &ParameterValue) -> Result<ParameterValue> {
        self.resolve_inner(value, &mut Vec::new())
    }

    /// Shorthand for resolving a single string.
    pub fn resolve_str(&self, value: &str) -> Result<ParameterValue> {
        self.resolve_string(value, &mut Vec::new())
    }

    fn resolve_inner(
        &self,
        value: &ParameterValue,
        resolving: &mut Vec<String>,
    ) -> Result<ParameterValue> {
        match value {
            ParameterValue::String(s) => self.resolve_string(s, resolving),
            ParameterValue::List(items) => items
                .iter()
                .map(|item| self.resolve_inner(item, resolving))
                .collect::<Result<Vec<_>>>()
                .map(ParameterValue::List),
            ParameterValue::Map(map) => {
                let mut out = BTreeMap::new();
                for (key, item) in map {
                    let key = match self.resolve_string(key, resolving)? {
                        ParameterValue::String(s) => s,
                        other => other.to_embedded(key)?,
                    };
                    out.insert(key, self.resolve_inner(item, resolving)?);
                }
                Ok(ParameterValue::Map(out))
            }
            scalar => Ok(scalar.clone()),
        }
    }

    fn resolve_string(&self, value: &str, resolving: &mut Vec<String>) -> Result<ParameterValue> {
        if let Some(name) = whole_placeholder(value) {
            return self.lookup(name, resolving);
        }

        let mut out = String::with_capacity(value.len());
        let mut rest = value;

        while let Some(start) = rest.find('%') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];

            if let Some(tail) = after.strip_prefix('%') {
                out.push('%');
                rest = tail;
                continue;
            }

            match after.find('%') {
                Some(end) if is_placeholder_name(&after[..end]) => {
                    let name = &after[..end];
                    let resolved = self.lookup(name, resolving)?;
                    out.push_str(&resolved.to_embedded(name)?);
                    rest = &after[end + 1..];
                }
                _ => {
                    out.push('%');
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        Ok(ParameterValue::String(out))
    }

    fn lookup(&self, name: &str, resolving: &mut Vec<String>) -> Result<ParameterValue> {
        let name = name.to_lowercase();

        if resolving.contains(&name) {
            let mut chain = resolving.clone();
            chain.push(name);
            return Err(WharfError::CircularParameter { chain });
        }

        let raw = self
            .values
            .get(&name)
            .ok_or_else(|| self.not_found(name.clone(), resolving.last().cloned()))?;

        if self.frozen {
            return Ok(raw.clone());
        }

        resolving.push(name);
        let resolved = self.resolve_inner(raw, resolving);
        resolving.pop();
        resolved
    }

    fn not_found(&self, name: String, required_by: Option<String>) -> WharfError {
        let known: Vec<&str> = self.values.keys().map(String::as_str).collect();
        let suggestions = suggest_similar(&name, &known, 3);

        WharfError::ParameterNotFound(ParameterNotFoundError {
            name,
            required_by,
            suggestions,
        })
    }
}

impl<K: AsRef<str>, V: Into<ParameterValue>> FromIterator<(K, V)> for ParameterStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let values = iter
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_lowercase(), v.into()))
            .collect();
        Self { values, frozen: false }
    }
}

/// Returns the name if `value` is exactly one `%name%` placeholder.
fn whole_placeholder(value: &str) -> Option<&str> {
    let inner = value.strip_prefix('%')?.strip_suffix('%')?;
    is_placeholder_name(inner).then_some(inner)
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('%') && !name.chars().any(char::is_whitespace)
}
