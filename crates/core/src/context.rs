//! Interfaces to the host runtime.
//!
//! The set of types a process has already loaded, and the resource search
//! paths of its loaders, belong to the host. This crate only queries them
//! through [`ResolutionContext`] and never mirrors or caches that state.

use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};

use crate::classpath::ResourceJar;
use crate::names::TypeName;

/// Handle naming one loader's search space. Operations take
/// `Option<&LoadingScope>`; `None` is the bootstrap scope, which has no
/// loader object of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadingScope(String);

impl LoadingScope {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LoadingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Label for an optional scope in log output.
pub(crate) fn scope_label(scope: Option<&LoadingScope>) -> &str {
    scope.map(LoadingScope::name).unwrap_or("<bootstrap>")
}

/// Field or method as reported by the runtime's reflection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectedMember {
    pub access: u16,
    pub name: String,
    pub descriptor: String,
}

impl ReflectedMember {
    pub fn new(access: u16, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self { access, name: name.into(), descriptor: descriptor.into() }
    }
}

/// Shape of a type the runtime has already materialized. Reflection exposes
/// declarations only, never bytecode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectedClass {
    pub name: TypeName,
    pub access: u16,
    pub super_name: Option<TypeName>,
    #[serde(default)]
    pub interfaces: Vec<TypeName>,
    #[serde(default)]
    pub fields: Vec<ReflectedMember>,
    #[serde(default)]
    pub methods: Vec<ReflectedMember>,
}

/// Queries a resolution needs from the host runtime. Implementations must be
/// safe for concurrent reads; resolution may run on many loading threads at
/// once.
pub trait ResolutionContext: Send + Sync {
    /// Reflected shape of `name` if it is already loaded and visible from
    /// `scope`.
    fn loaded_class(&self, scope: Option<&LoadingScope>, name: &TypeName) -> Option<ReflectedClass>;

    /// Read `resource` (e.g. `com/example/Widget.class`) from the search path
    /// of `scope`. `Ok(None)` means the resource does not exist; `Err` is a
    /// failure to read one that does.
    fn find_resource(&self, scope: &LoadingScope, resource: &str) -> io::Result<Option<Vec<u8>>>;

    /// Scope-agnostic lookup used when no scope is available.
    fn find_system_resource(&self, resource: &str) -> io::Result<Option<Vec<u8>>>;
}

/// The runtime's primitive for extending the bootstrap search path. Appends
/// are permanent for the life of the process.
pub trait BootSearchPath: Send + Sync {
    fn append_to_bootstrap_search(&self, jar: ResourceJar) -> io::Result<()>;
}
