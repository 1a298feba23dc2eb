//! Declared and resolved construction arguments.
//!
//! A descriptor declares [`Argument`]s; the builder resolves them into
//! [`Arg`]s (parameters substituted, references replaced by instances)
//! and hands them to construction functions as [`Arguments`].

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use wharf_support::rendering::shorten_type_name;

use crate::error::{ArgumentError, Result, WharfError};
use crate::parameter::ParameterValue;
use crate::reference::Reference;
use crate::registry::Instance;

/// A declared argument, as written by a configuration loader.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// A literal; strings are interpolated against the parameter store.
    Value(ParameterValue),
    /// Another service.
    Reference(Reference),
    /// A nested list of arguments.
    List(Vec<Argument>),
}

impl Argument {
    /// A `%name%` placeholder for a single parameter.
    pub fn parameter(name: &str) -> Self {
        Argument::Value(ParameterValue::String(format!("%{name}%")))
    }

    /// A reference that fails when the target is missing.
    pub fn service(id: &str) -> Self {
        Argument::Reference(Reference::new(id))
    }

    /// Collects every reference, descending into lists.
    pub fn references(&self) -> Vec<&Reference> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a Reference>) {
        match self {
            Argument::Reference(r) => out.push(r),
            Argument::List(items) => {
                for item in items {
                    item.collect_references(out);
                }
            }
            Argument::Value(_) => {}
        }
    }
}

impl From<ParameterValue> for Argument {
    fn from(value: ParameterValue) -> Self {
        Argument::Value(value)
    }
}

impl From<Reference> for Argument {
    fn from(reference: Reference) -> Self {
        Argument::Reference(reference)
    }
}

impl From<&str> for Argument {
    fn from(value: &str) -> Self {
        Argument::Value(value.into())
    }
}

impl From<String> for Argument {
    fn from(value: String) -> Self {
        Argument::Value(value.into())
    }
}

impl From<i64> for Argument {
    fn from(value: i64) -> Self {
        Argument::Value(value.into())
    }
}

impl From<i32> for Argument {
    fn from(value: i32) -> Self {
        Argument::Value(value.into())
    }
}

impl From<bool> for Argument {
    fn from(value: bool) -> Self {
        Argument::Value(value.into())
    }
}

impl From<f64> for Argument {
    fn from(value: f64) -> Self {
        Argument::Value(value.into())
    }
}

impl From<Vec<Argument>> for Argument {
    fn from(items: Vec<Argument>) -> Self {
        Argument::List(items)
    }
}

/// A resolved argument.
#[derive(Clone)]
pub enum Arg {
    Value(ParameterValue),
    Service(Instance),
    /// A reference whose target was missing and tolerated.
    Empty,
    List(Vec<Arg>),
}

impl Arg {
    fn kind(&self) -> String {
        match self {
            Arg::Value(v) => v.kind().to_string(),
            Arg::Service(_) => "service instance".to_string(),
            Arg::Empty => "empty reference".to_string(),
            Arg::List(_) => "list".to_string(),
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Arg::Service(_) => f.write_str("Service(..)"),
            Arg::Empty => f.write_str("Empty"),
            Arg::List(items) => f.debug_tuple("List").field(items).finish(),
        }
    }
}

/// Resolved arguments handed to construction functions.
///
/// Typed accessors fail with [`WharfError::Argument`] when the argument
/// at `index` is missing or of another kind.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    args: Vec<Arg>,
}

impl Arguments {
    pub fn new(args: Vec<Arg>) -> Self {
        Self { args }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arg> {
        self.args.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arg> {
        self.args.iter()
    }

    pub fn value(&self, index: usize) -> Result<&ParameterValue> {
        match self.required(index, "value")? {
            Arg::Value(v) => Ok(v),
            other => Err(mismatch(index, "value", other)),
        }
    }

    pub fn string(&self, index: usize) -> Result<String> {
        let value = self.value(index)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch(index, "string", &Arg::Value(value.clone())))
    }

    pub fn int(&self, index: usize) -> Result<i64> {
        let value = self.value(index)?;
        value
            .as_int()
            .ok_or_else(|| mismatch(index, "int", &Arg::Value(value.clone())))
    }

    pub fn float(&self, index: usize) -> Result<f64> {
        let value = self.value(index)?;
        value
            .as_float()
            .ok_or_else(|| mismatch(index, "float", &Arg::Value(value.clone())))
    }

    pub fn bool(&self, index: usize) -> Result<bool> {
        let value = self.value(index)?;
        value
            .as_bool()
            .ok_or_else(|| mismatch(index, "bool", &Arg::Value(value.clone())))
    }

    /// Returns the untyped instance at `index`.
    pub fn instance(&self, index: usize) -> Result<Instance> {
        match self.required(index, "service instance")? {
            Arg::Service(instance) => Ok(instance.clone()),
            other => Err(mismatch(index, "service instance", other)),
        }
    }

    /// Returns the service at `index` downcast to `T`.
    pub fn service<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>> {
        let instance = self.instance(index)?;
        instance.downcast::<T>().map_err(|_| {
            WharfError::Argument(ArgumentError {
                index,
                expected: shorten_type_name(type_name::<T>()),
                found: "service of another type".to_string(),
            })
        })
    }

    /// Like [`service()`](Arguments::service) but maps an empty
    /// reference to `None`.
    pub fn optional_service<T: Any + Send + Sync>(&self, index: usize) -> Result<Option<Arc<T>>> {
        match self.args.get(index) {
            None | Some(Arg::Empty) => Ok(None),
            Some(_) => self.service(index).map(Some),
        }
    }

    pub fn list(&self, index: usize) -> Result<&[Arg]> {
        match self.required(index, "list")? {
            Arg::List(items) => Ok(items),
            other => Err(mismatch(index, "list", other)),
        }
    }

    fn required(&self, index: usize, expected: &str) -> Result<&Arg> {
        self.args.get(index).ok_or_else(|| {
            WharfError::Argument(ArgumentError {
                index,
                expected: expected.to_string(),
                found: format!("only {} argument(s)", self.args.len()),
            })
        })
    }
}

impl From<Vec<Arg>> for Arguments {
    fn from(args: Vec<Arg>) -> Self {
        Self::new(args)
    }
}

fn mismatch(index: usize, expected: &str, found: &Arg) -> WharfError {
    WharfError::Argument(ArgumentError {
        index,
        expected: expected.to_string(),
        found: found.kind(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Logger;

    fn sample() -> Arguments {
        Arguments::new(vec![
            Arg::Value("smtp".into()),
            Arg::Value(25.into()),
            Arg::Service(Arc::new(Logger)),
            Arg::Empty,
        ])
    }

    #[test]
    fn typed_accessors() {
        let args = sample();
        assert_eq!(args.string(0).unwrap(), "smtp");
        assert_eq!(args.int(1).unwrap(), 25);
        assert_eq!(args.float(1).unwrap(), 25.0);
        assert!(args.service::<Logger>(2).is_ok());
        assert!(args.optional_service::<Logger>(3).unwrap().is_none());
        assert!(args.optional_service::<Logger>(9).unwrap().is_none());
    }

    #[test]
    fn wrong_kind_is_reported() {
        let args = sample();
        match args.int(0) {
            Err(WharfError::Argument(err)) => {
                assert_eq!(err.index, 0);
                assert_eq!(err.expected, "int");
                assert_eq!(err.found, "string");
            }
            other => panic!("Expected Argument error, got: {other:?}"),
        }
        assert!(args.service::<String>(2).is_err());
        assert!(args.string(7).is_err());
    }

    #[test]
    fn references_are_collected_from_lists() {
        let arg = Argument::List(vec![
            Argument::service("a"),
            "literal".into(),
            Argument::List(vec![Reference::new("b").or_ignore().into()]),
        ]);

        let ids: Vec<&str> = arg.references().iter().map(|r| r.id().as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn parameter_argument_is_placeholder() {
        assert_eq!(
            Argument::parameter("db.name"),
            Argument::Value(ParameterValue::from("%db.name%"))
        );
    }
}
