//! Plugin registry
//!
//! [`PluginRegistry`] is the seam through which the CLI learns which plugins
//! an attached cluster has. [`PluginManager`] implements it over a
//! `subcommands/` directory. [`plugin_commands`] flattens the plugins into the
//! list of commands to attach to the CLI, keeping command names unique.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{error, warn};

use super::loader::discover_plugins;
use super::types::{Plugin, PluginCommand};

/// Source of installed plugins for one cluster.
pub trait PluginRegistry {
    /// Returns the installed plugins. Discovery problems are logged, not
    /// returned.
    fn plugins(&self) -> Vec<Plugin>;
}

/// Discovers plugins installed in a cluster's `subcommands/` directory.
#[derive(Debug, Clone)]
pub struct PluginManager {
    dir: PathBuf,
}

impl PluginManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl PluginRegistry for PluginManager {
    fn plugins(&self) -> Vec<Plugin> {
        match discover_plugins(&self.dir) {
            Ok(plugins) => plugins,
            Err(e) => {
                error!(dir = %self.dir.display(), error = %e, "Plugin discovery failed");
                Vec::new()
            }
        }
    }
}

/// Collects every plugin command in discovery order.
///
/// When two plugins declare the same command name, the first one keeps it and
/// the later declaration is skipped with a warning.
pub fn plugin_commands(registry: &dyn PluginRegistry) -> Vec<PluginCommand> {
    let mut owners: HashMap<String, String> = HashMap::new();
    let mut commands = Vec::new();

    for plugin in registry.plugins() {
        for command in &plugin.commands {
            if let Some(owner) = owners.get(&command.name) {
                warn!(
                    command = %command.name,
                    plugin = %plugin.name(),
                    existing_plugin = %owner,
                    "Command name already provided by another plugin, skipping"
                );
                continue;
            }
            owners.insert(command.name.clone(), plugin.name().to_string());
            commands.push(command.clone());
        }
    }

    commands
}
