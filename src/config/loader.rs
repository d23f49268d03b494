//! Catalog loader
//!
//! Reads YAML command declarations and binds them to handlers registered
//! in code. Supports a single `commands.yaml` or a split
//! `commands/*.yaml` directory, loaded in sorted order.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use super::types::{CatalogConfig, CommandConfig};
use crate::catalog::CommandCatalog;
use crate::command::{Command, Handler};
use crate::error::ConfigError;
use crate::output::{ExecutionContext, Reply};
use crate::value::Args;

/// Environment variable naming the config directory
pub const CONFIG_DIR_ENV: &str = "REQUISITION_CONFIG_DIR";

// ============================================================================
// Handler Registry
// ============================================================================

/// Handlers by the name YAML commands refer to them with
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Handler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&Args, &mut ExecutionContext) -> anyhow::Result<Reply> + Send + Sync + 'static,
    {
        self.handlers.insert(name.into(), Arc::new(f));
        self
    }

    pub fn get(&self, name: &str) -> Option<Handler> {
        self.handlers.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}

// ============================================================================
// Loader
// ============================================================================

pub struct CatalogLoader {
    config_dir: PathBuf,
}

impl CatalogLoader {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Loader for `REQUISITION_CONFIG_DIR`, or `config` when unset
    pub fn from_env() -> Self {
        match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => Self::new(dir),
            Err(_) => Self::new("config"),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Read the catalog declarations.
    ///
    /// A `commands/` directory wins over `commands.yaml`.
    pub fn load_config(&self) -> Result<CatalogConfig, ConfigError> {
        let dir = self.config_dir.join("commands");
        if dir.is_dir() {
            let mut merged = CatalogConfig::default();
            for path in find_yaml_files(&dir)? {
                merged.merge(read_file(&path)?);
            }
            info!(
                "Loaded {} commands from directory {}",
                merged.commands.len(),
                dir.display()
            );
            Ok(merged)
        } else {
            let path = self.config_dir.join("commands.yaml");
            let config = read_file(&path)?;
            info!(
                "Loaded {} commands from {}",
                config.commands.len(),
                path.display()
            );
            Ok(config)
        }
    }

    /// Read the declarations and build a catalog bound to `registry`
    pub fn load_catalog(&self, registry: &HandlerRegistry) -> Result<CommandCatalog, ConfigError> {
        build_catalog(&self.load_config()?, registry)
    }
}

/// Build a catalog from declarations. Parents are registered before their
/// sub-commands whatever order the file lists them in.
pub fn build_catalog(
    config: &CatalogConfig,
    registry: &HandlerRegistry,
) -> Result<CommandCatalog, ConfigError> {
    let mut declared: Vec<&CommandConfig> = config.commands.iter().collect();
    declared.sort_by_key(|c| c.name.split_whitespace().count());

    let mut catalog = CommandCatalog::new();
    for decl in declared {
        catalog.register(build_command(decl, registry)?)?;
    }
    Ok(catalog)
}

fn build_command(decl: &CommandConfig, registry: &HandlerRegistry) -> Result<Command, ConfigError> {
    let mut command = Command::new(&decl.name)
        .description(&decl.description)
        .flag_policy(decl.flag_policy);
    if decl.hidden {
        command = command.hidden();
    }
    for param in &decl.params {
        command = command.param(param.to_parameter());
    }
    if let Some(name) = &decl.handler {
        let handler = registry.get(name).ok_or_else(|| ConfigError::UnknownHandler {
            command: decl.name.clone(),
            handler: name.clone(),
        })?;
        command = command.with_handler(handler);
    }
    Ok(command)
}

fn read_file(path: &Path) -> Result<CatalogConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    CatalogConfig::from_yaml_str(&content).map_err(|source| ConfigError::Yaml {
        path: path.display().to_string(),
        source,
    })
}

/// All `.yaml`/`.yml` files below `dir`, sorted
fn find_yaml_files(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let io_err = |source: std::io::Error| ConfigError::Io {
        path: dir.display().to_string(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_dir() {
            files.extend(find_yaml_files(&path)?);
        } else if path
            .extension()
            .is_some_and(|e| e == "yaml" || e == "yml")
        {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
