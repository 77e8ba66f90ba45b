use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::debug;

use classlens_core::classpath::{ClassPath, ClassPathEntry};
use classlens_core::config::runtime_from_config_file;
use classlens_core::context::LoadingScope;
use classlens_core::runtime::LocalRuntime;
use classlens_core::ClassEngine;

/// Name of the scope built from `--class-path` entries.
pub const CLI_SCOPE: &str = "cli";

/// Options describing the runtime a command resolves against.
#[derive(Args, Debug, Clone, Default)]
pub struct RuntimeArgs {
    /// Runtime config (JSON or YAML) describing boot path and scopes.
    #[arg(long)]
    pub config: Option<String>,

    /// Jar or directory for the ad-hoc `cli` scope. May be repeated.
    #[arg(long = "class-path")]
    pub class_path: Vec<String>,

    /// Jar appended to the bootstrap search path. May be repeated.
    #[arg(long = "boot-jar")]
    pub boot_jars: Vec<String>,

    /// Scope to resolve in. Defaults to the global lookup.
    #[arg(long)]
    pub scope: Option<String>,
}

/// Resolve a path given on the command line against the working directory.
///
/// Existing paths are canonicalized. Missing ones are kept as given (made
/// absolute) so the config loader or jar opener reports them.
pub fn resolve_input_path(arg: &str) -> Result<PathBuf> {
    let path = Path::new(arg);
    if let Ok(resolved) = path.canonicalize() {
        return Ok(resolved);
    }
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = env::current_dir().context("Failed to get current directory")?;
    Ok(cwd.join(path))
}

/// A runtime plus the engine bound to it.
pub struct Session {
    pub runtime: Arc<LocalRuntime>,
    pub engine: ClassEngine,
    pub scope: Option<LoadingScope>,
}

/// Assemble the runtime described by `args`.
///
/// `--class-path` entries form a `cli` scope. Without a config it also
/// becomes the system scope, so scope-less lookups see it.
pub fn open_session(args: &RuntimeArgs) -> Result<Session> {
    let runtime = match &args.config {
        Some(config) => {
            let path = resolve_input_path(config)?;
            runtime_from_config_file(&path)?
        }
        None => LocalRuntime::new(),
    };

    if !args.class_path.is_empty() {
        let mut class_path = ClassPath::new();
        for entry in &args.class_path {
            let path = resolve_input_path(entry)?;
            let entry = ClassPathEntry::open(&path)
                .with_context(|| format!("Failed to open class path entry {}", path.display()))?;
            class_path.push(entry);
        }
        let scope = LoadingScope::new(CLI_SCOPE);
        runtime.define_scope(scope.clone(), None, class_path);
        if args.config.is_none() {
            runtime.set_system_scope(Some(scope));
        }
    }

    let scope = match &args.scope {
        Some(name) => {
            let scope = LoadingScope::new(name.as_str());
            if !runtime.has_scope(&scope) {
                bail!("Unknown scope '{}'", name);
            }
            Some(scope)
        }
        None => None,
    };

    let runtime = Arc::new(runtime);
    let engine = ClassEngine::new(runtime.clone());
    for jar in &args.boot_jars {
        let path = resolve_input_path(jar)?;
        engine
            .append_jar_to_boot_search_path(&path)
            .with_context(|| format!("Failed to add boot jar {}", path.display()))?;
    }
    debug!(boot_entries = runtime.boot_class_path().len(), "runtime ready");

    Ok(Session { runtime, engine, scope })
}
