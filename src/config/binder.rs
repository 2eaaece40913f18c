//! Declarative environment-variable binding.
//!
//! # Responsibilities
//! - Walk a configuration tree described by [`EnvBound`] field tables
//! - Resolve each leaf to exactly one environment lookup
//! - Enforce per-field `required` semantics
//!
//! # Design Decisions
//! - No runtime introspection: every bound field is listed explicitly by the
//!   configuration owner as a [`Binding`]
//! - Depth-first, parent-to-child, siblings in declaration order
//! - Empty values count as missing
//! - [`EnvBinder::bind`] stops at the first failure, [`EnvBinder::bind_all`]
//!   reports every failing leaf

use std::collections::HashMap;
use std::fmt;

/// Source of environment values.
pub trait EnvSource {
    /// Look up a variable. Implementations return `None` for unset keys.
    fn lookup(&self, key: &str) -> Option<String>;
}

/// Reads from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl EnvSource for HashMap<&str, &str> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.to_string())
    }
}

/// Scalar kind of a leaf field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Boolean,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Text => write!(f, "string"),
            FieldKind::Integer => write!(f, "integer"),
            FieldKind::Boolean => write!(f, "boolean"),
        }
    }
}

/// Mutable target of a leaf binding.
pub enum Slot<'a> {
    Text(&'a mut String),
    Integer(&'a mut i64),
    Boolean(&'a mut bool),
}

impl Slot<'_> {
    pub fn kind(&self) -> FieldKind {
        match self {
            Slot::Text(_) => FieldKind::Text,
            Slot::Integer(_) => FieldKind::Integer,
            Slot::Boolean(_) => FieldKind::Boolean,
        }
    }

    fn set_zero(&mut self) {
        match self {
            Slot::Text(v) => v.clear(),
            Slot::Integer(v) => **v = 0,
            Slot::Boolean(v) => **v = false,
        }
    }

    fn assign(&mut self, raw: &str) -> Result<(), String> {
        match self {
            Slot::Text(v) => {
                **v = raw.to_string();
                Ok(())
            }
            Slot::Integer(v) => {
                **v = raw.parse::<i64>().map_err(|e| e.to_string())?;
                Ok(())
            }
            Slot::Boolean(v) => {
                **v = parse_bool(raw)?;
                Ok(())
            }
        }
    }
}

/// One entry of a configuration field table.
pub enum Binding<'a> {
    /// A scalar field bound to a single environment variable.
    Leaf {
        key: &'static str,
        required: bool,
        slot: Slot<'a>,
    },
    /// A nested group, recursed into before its siblings that follow it.
    Group {
        name: &'static str,
        fields: Vec<Binding<'a>>,
    },
}

impl<'a> Binding<'a> {
    pub fn text(key: &'static str, required: bool, target: &'a mut String) -> Self {
        Binding::Leaf { key, required, slot: Slot::Text(target) }
    }

    pub fn integer(key: &'static str, required: bool, target: &'a mut i64) -> Self {
        Binding::Leaf { key, required, slot: Slot::Integer(target) }
    }

    pub fn boolean(key: &'static str, required: bool, target: &'a mut bool) -> Self {
        Binding::Leaf { key, required, slot: Slot::Boolean(target) }
    }

    pub fn group<T: EnvBound>(name: &'static str, target: &'a mut T) -> Self {
        Binding::Group { name, fields: target.bindings() }
    }
}

/// A configuration value that can describe its own field table.
pub trait EnvBound {
    /// Field table in declaration order.
    fn bindings(&mut self) -> Vec<Binding<'_>>;
}

/// Binding failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error("environment variable '{key}' is missing or blank")]
    MissingVariable { key: String },

    #[error("error parsing environment variable '{key}' as {target}: {cause}")]
    Parse {
        key: String,
        target: FieldKind,
        cause: String,
    },

    #[error("{} environment variables failed to bind: {}", .0.len(), join_errors(.0))]
    Multiple(Vec<BindError>),
}

fn join_errors(errors: &[BindError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl BindError {
    /// Key of the offending variable, when there is exactly one.
    pub fn key(&self) -> Option<&str> {
        match self {
            BindError::MissingVariable { key } | BindError::Parse { key, .. } => Some(key),
            BindError::Multiple(_) => None,
        }
    }
}

/// Treatment of a present but unparsable value on an optional field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptionalParse {
    /// Fail with [`BindError::Parse`], same as a required field.
    #[default]
    Reject,
    /// Substitute the zero value and keep going.
    ZeroValue,
}

/// Populates [`EnvBound`] values from an [`EnvSource`].
pub struct EnvBinder<S> {
    source: S,
    optional_parse: OptionalParse,
}

impl<S: EnvSource> EnvBinder<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            optional_parse: OptionalParse::default(),
        }
    }

    pub fn optional_parse(mut self, policy: OptionalParse) -> Self {
        self.optional_parse = policy;
        self
    }

    /// Bind every field, stopping at the first failure.
    pub fn bind<T: EnvBound>(&self, target: &mut T) -> Result<(), BindError> {
        let mut fields = target.bindings();
        for binding in fields.iter_mut() {
            self.walk(binding, &mut |err| Err(err))?;
        }
        Ok(())
    }

    /// Bind every field, collecting all failures.
    pub fn bind_all<T: EnvBound>(&self, target: &mut T) -> Result<(), BindError> {
        let mut failures = Vec::new();
        let mut fields = target.bindings();
        for binding in fields.iter_mut() {
            // Collector never short-circuits.
            let _ = self.walk(binding, &mut |err| {
                failures.push(err);
                Ok(())
            });
        }

        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            _ => Err(BindError::Multiple(failures)),
        }
    }

    fn walk<F>(&self, binding: &mut Binding<'_>, on_error: &mut F) -> Result<(), BindError>
    where
        F: FnMut(BindError) -> Result<(), BindError>,
    {
        match binding {
            Binding::Group { name, fields } => {
                tracing::trace!(group = *name, "Binding configuration group");
                for field in fields.iter_mut() {
                    self.walk(field, on_error)?;
                }
                Ok(())
            }
            Binding::Leaf { key, required, slot } => {
                match self.bind_leaf(key, *required, slot) {
                    Ok(()) => Ok(()),
                    Err(err) => {
                        slot.set_zero();
                        on_error(err)
                    }
                }
            }
        }
    }

    fn bind_leaf(&self, key: &str, required: bool, slot: &mut Slot<'_>) -> Result<(), BindError> {
        let raw = match self.source.lookup(key).filter(|v| !v.is_empty()) {
            Some(raw) => raw,
            None if required => {
                return Err(BindError::MissingVariable { key: key.to_string() });
            }
            None => {
                slot.set_zero();
                return Ok(());
            }
        };

        match slot.assign(&raw) {
            Ok(()) => Ok(()),
            Err(cause) if required || self.optional_parse == OptionalParse::Reject => {
                Err(BindError::Parse {
                    key: key.to_string(),
                    target: slot.kind(),
                    cause,
                })
            }
            Err(cause) => {
                tracing::warn!(
                    key = %key,
                    target = %slot.kind(),
                    error = %cause,
                    "Ignoring unparsable optional variable, using zero value"
                );
                slot.set_zero();
                Ok(())
            }
        }
    }
}

/// Parse the boolean tokens accepted in environment files.
pub fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        other => Err(format!("invalid boolean token '{}'", other)),
    }
}
