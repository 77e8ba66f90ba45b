//! Resolution facade and boot-path extender.
//!
//! [`ClassEngine`] is the single entry point a host hook calls: given a
//! context, a scope and a type name (plus the raw bytes when the runtime
//! already has them), produce an editable [`ClassModel`] or report that the
//! type does not exist. It holds no state of its own beyond the handle used
//! to extend the bootstrap search path.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::classfile::{self, ClassFileError};
use crate::classpath::ResourceJar;
use crate::context::{scope_label, BootSearchPath, LoadingScope, ResolutionContext};
use crate::locator::{self, Located};
use crate::model::ClassModel;
use crate::names::TypeName;

/// Underlying reason for a failed resolution.
#[derive(Debug, Error)]
pub enum ResolutionCause {
    #[error("failed to read class data")]
    Io(#[from] io::Error),
    #[error("malformed class data")]
    Format(#[from] ClassFileError),
    #[error("class data defines {found}, expected {expected}")]
    NameMismatch { expected: TypeName, found: TypeName },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("failed to resolve {name}")]
    Resolution {
        name: TypeName,
        #[source]
        source: ResolutionCause,
    },
    #[error("runtime rejected boot search path entry {}", path.display())]
    BootSearchPath {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type EngineResult<T> = Result<T, EngineError>;

pub struct ClassEngine {
    boot: Arc<dyn BootSearchPath>,
}

impl ClassEngine {
    pub fn new(boot: Arc<dyn BootSearchPath>) -> Self {
        Self { boot }
    }

    /// Resolve `name` as seen from `scope`.
    ///
    /// With `class_file`, the bytes are parsed directly. Without, the type
    /// is located through `ctx`: a loaded type yields a read-only model of
    /// its reflected shape, a resource yields a parsed model, and nothing at
    /// all yields `Ok(None)`.
    pub fn get_class(
        &self,
        ctx: &dyn ResolutionContext,
        scope: Option<&LoadingScope>,
        name: &str,
        class_file: Option<&[u8]>,
    ) -> EngineResult<Option<ClassModel>> {
        let name = normalize(name)?;
        let result = self.resolve(ctx, scope, &name, class_file);
        if let Err(err) = &result {
            warn!(class = %name, scope = scope_label(scope), error = %err, "resolution failed");
        }
        result
    }

    fn resolve(
        &self,
        ctx: &dyn ResolutionContext,
        scope: Option<&LoadingScope>,
        name: &TypeName,
        class_file: Option<&[u8]>,
    ) -> EngineResult<Option<ClassModel>> {
        let failed = |source: ResolutionCause| EngineError::Resolution { name: name.clone(), source };

        if let Some(bytes) = class_file {
            return parse_model(name, scope, bytes).map(Some).map_err(failed);
        }

        match locator::locate(ctx, scope, name).map_err(|err| failed(err.into()))? {
            Located::Live(class) => {
                if class.name != *name {
                    return Err(failed(ResolutionCause::NameMismatch {
                        expected: name.clone(),
                        found: class.name,
                    }));
                }
                Ok(Some(ClassModel::from_reflected(class, scope.cloned())))
            }
            Located::Bytes(bytes) => parse_model(name, scope, &bytes).map(Some).map_err(failed),
            Located::NotFound => Ok(None),
        }
    }

    /// Whether a class file for `name` exists on the resource path of
    /// `scope` (the global path for `None`).
    pub fn has_class(
        &self,
        ctx: &dyn ResolutionContext,
        scope: Option<&LoadingScope>,
        name: &str,
    ) -> EngineResult<bool> {
        let name = normalize(name)?;
        locator::has_resource(ctx, scope, &name).map_err(|err| EngineError::Resolution {
            name,
            source: err.into(),
        })
    }

    /// Append `jar` to the bootstrap search path. Permanent for the life of
    /// the runtime.
    pub fn append_to_boot_search_path(&self, jar: ResourceJar) -> EngineResult<()> {
        let path = jar.path().to_path_buf();
        self.boot
            .append_to_bootstrap_search(jar)
            .map_err(|source| EngineError::BootSearchPath { path: path.clone(), source })?;
        info!(jar = %path.display(), "appended to bootstrap search path");
        Ok(())
    }

    /// Open the jar at `path` and append it. An empty path, a missing file or
    /// anything that is not a zip archive is an invalid argument.
    pub fn append_jar_to_boot_search_path(&self, path: impl AsRef<Path>) -> EngineResult<()> {
        let jar = ResourceJar::open(path.as_ref())
            .map_err(|err| EngineError::InvalidArgument(err.to_string()))?;
        self.append_to_boot_search_path(jar)
    }
}

fn normalize(name: &str) -> EngineResult<TypeName> {
    TypeName::new(name).map_err(|err| EngineError::InvalidArgument(err.to_string()))
}

fn parse_model(
    name: &TypeName,
    scope: Option<&LoadingScope>,
    bytes: &[u8],
) -> Result<ClassModel, ResolutionCause> {
    let node = classfile::parse(bytes)?;
    if node.name != *name {
        return Err(ResolutionCause::NameMismatch { expected: name.clone(), found: node.name });
    }
    debug!(
        class = %name,
        scope = scope_label(scope),
        methods = node.methods.len(),
        "parsed class"
    );
    Ok(ClassModel::from_parsed(node, scope.cloned()))
}
