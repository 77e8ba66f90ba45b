//! Binary locator: find a type's definition without loading it.

use std::io;

use tracing::{debug, trace};

use crate::context::{scope_label, LoadingScope, ReflectedClass, ResolutionContext};
use crate::names::TypeName;

/// Outcome of a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    /// The type is already loaded; its reflected shape is authoritative.
    Live(ReflectedClass),
    /// Class-file bytes read from a search path.
    Bytes(Vec<u8>),
    NotFound,
}

/// Look `name` up as seen from `scope`.
///
/// Loaded types win over search paths. With a scope, its own search path is
/// consulted; with `None`, the global lookup is.
pub fn locate(
    ctx: &dyn ResolutionContext,
    scope: Option<&LoadingScope>,
    name: &TypeName,
) -> io::Result<Located> {
    if let Some(class) = ctx.loaded_class(scope, name) {
        debug!(class = %name, scope = scope_label(scope), "using live type");
        return Ok(Located::Live(class));
    }

    let resource = name.resource_path();
    let found = match scope {
        Some(scope) => ctx.find_resource(scope, &resource)?,
        None => ctx.find_system_resource(&resource)?,
    };
    match found {
        Some(bytes) => {
            trace!(%resource, len = bytes.len(), "read class resource");
            Ok(Located::Bytes(bytes))
        }
        None => {
            debug!(class = %name, scope = scope_label(scope), "class resource not found");
            Ok(Located::NotFound)
        }
    }
}

/// Whether `name`'s class file exists on the resource path of `scope`.
/// Loaded types are not consulted.
pub fn has_resource(
    ctx: &dyn ResolutionContext,
    scope: Option<&LoadingScope>,
    name: &TypeName,
) -> io::Result<bool> {
    let resource = name.resource_path();
    let found = match scope {
        Some(scope) => ctx.find_resource(scope, &resource)?,
        None => ctx.find_system_resource(&resource)?,
    };
    Ok(found.is_some())
}
