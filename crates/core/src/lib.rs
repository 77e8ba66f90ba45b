//! classlens-core
//!
//! Type-resolution layer for JVM instrumentation agents.
//!
//! Given a loading scope and a type name, the engine locates the type's
//! definition (an already-loaded type, or `<name>.class` on the scope's search
//! path), decodes it into a full structural tree, and hands back an editable
//! model. It also extends the runtime's bootstrap search path with extra jars.
//!
//! The host runtime is reached only through the traits in [`context`];
//! [`runtime::LocalRuntime`] is an in-process implementation driven by
//! directories, jars and a [`config::RuntimeConfig`].

pub mod classfile;
pub mod classpath;
pub mod config;
pub mod context;
pub mod engine;
pub mod locator;
pub mod model;
pub mod names;
pub mod runtime;

pub use engine::{ClassEngine, EngineError, EngineResult, ResolutionCause};
pub use model::{ClassModel, ModelError, Provenance};
pub use names::TypeName;
