//! In-process host runtime.
//!
//! `LocalRuntime` models a JVM's loader hierarchy closely enough to drive
//! resolution outside a live process: a bootstrap search path, named scopes
//! with parents and their own search paths, and per-scope registries of
//! already-loaded types. Lookups delegate parent-first, as JVM class loaders
//! do.

use std::collections::{HashMap, HashSet};
use std::io;

use parking_lot::RwLock;
use tracing::trace;

use crate::classpath::{ClassPath, ClassPathEntry, ResourceJar};
use crate::context::{BootSearchPath, LoadingScope, ReflectedClass, ResolutionContext};
use crate::names::TypeName;

#[derive(Debug, Default)]
struct ScopeState {
    parent: Option<LoadingScope>,
    class_path: ClassPath,
    loaded: HashMap<TypeName, ReflectedClass>,
}

#[derive(Debug, Default)]
pub struct LocalRuntime {
    boot_path: RwLock<ClassPath>,
    boot_loaded: RwLock<HashMap<TypeName, ReflectedClass>>,
    scopes: RwLock<HashMap<LoadingScope, ScopeState>>,
    system_scope: RwLock<Option<LoadingScope>>,
}

impl LocalRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_boot_class_path(class_path: ClassPath) -> Self {
        Self { boot_path: RwLock::new(class_path), ..Self::default() }
    }

    /// Register (or replace) a scope. `parent: None` delegates straight to
    /// the bootstrap scope.
    pub fn define_scope(
        &self,
        scope: LoadingScope,
        parent: Option<LoadingScope>,
        class_path: ClassPath,
    ) {
        let mut scopes = self.scopes.write();
        let loaded = scopes.remove(&scope).map(|state| state.loaded).unwrap_or_default();
        scopes.insert(scope, ScopeState { parent, class_path, loaded });
    }

    pub fn has_scope(&self, scope: &LoadingScope) -> bool {
        self.scopes.read().contains_key(scope)
    }

    /// Scope consulted, together with the boot path, by scope-less lookups.
    pub fn set_system_scope(&self, scope: Option<LoadingScope>) {
        *self.system_scope.write() = scope;
    }

    /// Record that `class` has been materialized by `scope` (`None` for the
    /// bootstrap scope). Returns `false` when the scope is unknown.
    pub fn mark_loaded(&self, scope: Option<&LoadingScope>, class: ReflectedClass) -> bool {
        match scope {
            None => {
                self.boot_loaded.write().insert(class.name.clone(), class);
                true
            }
            Some(scope) => match self.scopes.write().get_mut(scope) {
                Some(state) => {
                    state.loaded.insert(class.name.clone(), class);
                    true
                }
                None => false,
            },
        }
    }

    /// Snapshot of the bootstrap search path entries.
    pub fn boot_class_path(&self) -> Vec<ClassPathEntry> {
        self.boot_path.read().entries().to_vec()
    }

    /// Scope chain from `scope` up to its root, parent-most last. Stops at
    /// unknown scopes and at cycles.
    fn ancestry(&self, scope: &LoadingScope) -> Vec<LoadingScope> {
        let scopes = self.scopes.read();
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(scope.clone());
        while let Some(name) = current {
            if !seen.insert(name.clone()) {
                break;
            }
            let Some(state) = scopes.get(&name) else { break };
            current = state.parent.clone();
            chain.push(name);
        }
        chain
    }

    fn find_boot_resource(&self, resource: &str) -> io::Result<Option<Vec<u8>>> {
        // Clone the entries so no lock is held across file I/O.
        let boot = self.boot_path.read().clone();
        boot.find(resource)
    }
}

impl ResolutionContext for LocalRuntime {
    fn loaded_class(&self, scope: Option<&LoadingScope>, name: &TypeName) -> Option<ReflectedClass> {
        if let Some(class) = self.boot_loaded.read().get(name) {
            return Some(class.clone());
        }
        let scope = scope?;
        let chain = self.ancestry(scope);
        let scopes = self.scopes.read();
        chain
            .iter()
            .rev()
            .find_map(|name_of_scope| scopes.get(name_of_scope)?.loaded.get(name).cloned())
    }

    fn find_resource(&self, scope: &LoadingScope, resource: &str) -> io::Result<Option<Vec<u8>>> {
        if let Some(data) = self.find_boot_resource(resource)? {
            trace!(resource, "found on bootstrap search path");
            return Ok(Some(data));
        }
        for name in self.ancestry(scope).iter().rev() {
            let class_path = match self.scopes.read().get(name) {
                Some(state) => state.class_path.clone(),
                None => continue,
            };
            if let Some(data) = class_path.find(resource)? {
                trace!(resource, scope = %name, "found on scope search path");
                return Ok(Some(data));
            }
        }
        Ok(None)
    }

    fn find_system_resource(&self, resource: &str) -> io::Result<Option<Vec<u8>>> {
        let system = self.system_scope.read().clone();
        match system {
            Some(scope) => self.find_resource(&scope, resource),
            None => self.find_boot_resource(resource),
        }
    }
}

impl BootSearchPath for LocalRuntime {
    fn append_to_bootstrap_search(&self, jar: ResourceJar) -> io::Result<()> {
        self.boot_path.write().push(ClassPathEntry::Jar(jar));
        Ok(())
    }
}
