//! Runtime configuration: the loader hierarchy a [`LocalRuntime`] is built
//! from.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classpath::{ClassPath, ClassPathEntry};
use crate::context::LoadingScope;
use crate::runtime::LocalRuntime;

/// One named loading scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeConfig {
    pub name: String,
    /// Parent scope; absent means the bootstrap scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Jars and directories searched by this scope, in order.
    #[serde(default)]
    pub class_path: Vec<PathBuf>,
}

/// Serializable description of a loader hierarchy.
///
/// Stored as JSON or YAML; relative paths are resolved against the directory
/// holding the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Schema/config version. This is about the config format.
    pub config_version: String,
    #[serde(default)]
    pub boot_class_path: Vec<PathBuf>,
    #[serde(default)]
    pub scopes: Vec<ScopeConfig>,
    /// Scope consulted, after the boot path, by lookups without a scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_scope: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            config_version: "0.1.0".to_string(),
            boot_class_path: Vec::new(),
            scopes: Vec::new(),
            system_scope: None,
        }
    }
}

impl RuntimeConfig {
    /// Reject hierarchies a runtime could not honor.
    pub fn validate(&self) -> Result<()> {
        let mut parents: HashMap<&str, Option<&str>> = HashMap::new();
        for scope in &self.scopes {
            if scope.name.is_empty() {
                bail!("Scope names must not be empty");
            }
            if parents.insert(&scope.name, scope.parent.as_deref()).is_some() {
                bail!("Duplicate scope '{}'", scope.name);
            }
        }

        for scope in &self.scopes {
            if let Some(parent) = &scope.parent {
                if !parents.contains_key(parent.as_str()) {
                    bail!("Scope '{}' has unknown parent '{}'", scope.name, parent);
                }
            }
            let mut seen = HashSet::new();
            let mut current = Some(scope.name.as_str());
            while let Some(name) = current {
                if !seen.insert(name) {
                    bail!("Scope '{}' is part of a parent cycle", scope.name);
                }
                current = parents.get(name).copied().flatten();
            }
        }

        if let Some(system) = &self.system_scope {
            if !parents.contains_key(system.as_str()) {
                bail!("Unknown system scope '{}'", system);
            }
        }
        Ok(())
    }

    /// Open every search path entry and assemble a runtime. Relative paths
    /// are joined onto `base_dir`.
    pub fn build_runtime(&self, base_dir: &Path) -> Result<LocalRuntime> {
        self.validate()?;
        let runtime = LocalRuntime::with_boot_class_path(open_class_path(&self.boot_class_path, base_dir)?);
        for scope in &self.scopes {
            let class_path = open_class_path(&scope.class_path, base_dir)
                .with_context(|| format!("Failed to open class path of scope '{}'", scope.name))?;
            runtime.define_scope(
                LoadingScope::new(&scope.name),
                scope.parent.as_deref().map(LoadingScope::new),
                class_path,
            );
        }
        runtime.set_system_scope(self.system_scope.as_deref().map(LoadingScope::new));
        debug!(scopes = self.scopes.len(), boot_entries = self.boot_class_path.len(), "built runtime");
        Ok(runtime)
    }
}

fn open_class_path(paths: &[PathBuf], base_dir: &Path) -> Result<ClassPath> {
    let mut class_path = ClassPath::new();
    for path in paths {
        let path = if path.is_absolute() { path.clone() } else { base_dir.join(path) };
        let entry = ClassPathEntry::open(&path)
            .with_context(|| format!("Failed to open class path entry {}", path.display()))?;
        class_path.push(entry);
    }
    Ok(class_path)
}

/// Load and validate a runtime config. Files ending in `.yaml`/`.yml` are
/// parsed as YAML, everything else as JSON.
pub fn load_runtime_config(path: &Path) -> Result<RuntimeConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read runtime config at {}", path.display()))?;
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    );
    let config: RuntimeConfig = if is_yaml {
        serde_yaml::from_str(&text).context("Failed to parse runtime config YAML")?
    } else {
        serde_json::from_str(&text).context("Failed to parse runtime config JSON")?
    };
    config.validate()?;
    Ok(config)
}

/// Load a config and build its runtime, resolving paths against the
/// config file's directory.
pub fn runtime_from_config_file(path: &Path) -> Result<LocalRuntime> {
    let config = load_runtime_config(path)?;
    let base_dir = path
        .parent()
        .ok_or_else(|| anyhow!("Config path {} has no parent directory", path.display()))?;
    config.build_runtime(base_dir)
}
