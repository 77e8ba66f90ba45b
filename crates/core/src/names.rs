//! Canonical type names.
//!
//! JVM code refers to types in two spellings: the source form
//! (`com.example.Widget`) and the internal/binary form (`com/example/Widget`).
//! `TypeName` accepts either and always stores the internal form, so lookups
//! and comparisons never depend on which spelling the caller used.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error raised when a string cannot be used as a type name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("type name must not be empty")]
    Empty,
    #[error("malformed type name '{name}': {reason}")]
    Malformed { name: String, reason: &'static str },
}

/// Fully qualified type name in internal (slash separated) form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeName(String);

impl TypeName {
    /// Normalize a source-style or binary-style name.
    pub fn new(name: &str) -> Result<Self, NameError> {
        if name.is_empty() {
            return Err(NameError::Empty);
        }
        let malformed = |reason| NameError::Malformed { name: name.to_string(), reason };

        if name.contains(['[', ';']) {
            return Err(malformed("array and descriptor syntax is not a type name"));
        }
        if name.contains('.') && name.contains('/') {
            return Err(malformed("mixes '.' and '/' separators"));
        }

        let internal = name.replace('.', "/");
        if internal.split('/').any(str::is_empty) {
            return Err(malformed("empty package or class segment"));
        }
        Ok(Self(internal))
    }

    /// Internal form, e.g. `com/example/Widget`.
    pub fn as_internal(&self) -> &str {
        &self.0
    }

    /// Source form, e.g. `com.example.Widget`.
    pub fn java_name(&self) -> String {
        self.0.replace('/', ".")
    }

    /// Last segment of the name (nested types keep their `$` suffix).
    pub fn simple_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Package in internal form, `None` for the unnamed package.
    pub fn package(&self) -> Option<&str> {
        self.0.rsplit_once('/').map(|(package, _)| package)
    }

    /// Resource path of the compiled form, e.g. `com/example/Widget.class`.
    pub fn resource_path(&self) -> String {
        format!("{}.class", self.0)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.java_name())
    }
}

impl FromStr for TypeName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TypeName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<TypeName> for String {
    fn from(name: TypeName) -> Self {
        name.0
    }
}
