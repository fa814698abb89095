//! Plugin types
//!
//! This module defines the manifest structures parsed from a plugin's
//! `plugin.json` and the runtime representation of a loaded plugin and the
//! commands it contributes to the CLI.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The manifest loaded from a plugin's `plugin.json` file.
///
/// # Example
///
/// ```json
/// {
///   "name": "dcos-core-cli",
///   "version": "1.14.0",
///   "description": "Core DC/OS commands",
///   "commands": [
///     {
///       "name": "marathon",
///       "description": "Deploy and manage applications to DC/OS",
///       "path": "bin/dcos-core"
///     },
///     {
///       "name": "job",
///       "description": "Deploy and manage jobs in DC/OS",
///       "path": "bin/dcos-core"
///     }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Plugin name. Alphanumeric characters and hyphens only, between 1 and
    /// 64 characters.
    pub name: String,

    /// Version string (e.g., "1.14.0").
    pub version: String,

    /// Human-readable description of the plugin.
    #[serde(default)]
    pub description: String,

    /// Commands contributed to the CLI.
    pub commands: Vec<PluginCommandDef>,
}

/// A command definition within a plugin manifest.
///
/// Several commands may point at the same executable; the executable is told
/// which one was invoked through its first argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginCommandDef {
    /// Command name as typed after `dcos`.
    pub name: String,

    /// One-line description shown in the CLI usage.
    #[serde(default)]
    pub description: String,

    /// Executable path, relative to the plugin directory unless absolute.
    pub path: String,
}

/// A command backed by an external executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginCommand {
    pub name: String,
    pub description: String,
    pub executable: PathBuf,
}

/// A loaded plugin with its manifest, directory and resolved commands.
#[derive(Debug, Clone)]
pub struct Plugin {
    /// The parsed plugin manifest.
    pub manifest: PluginManifest,

    /// The directory the plugin was loaded from.
    pub path: PathBuf,

    /// Commands with executable paths resolved against `path`.
    pub commands: Vec<PluginCommand>,
}

impl Plugin {
    /// Create a plugin from a manifest and its directory.
    pub fn new(manifest: PluginManifest, path: PathBuf) -> Self {
        let commands = manifest
            .commands
            .iter()
            .map(|def| PluginCommand {
                name: def.name.clone(),
                description: def.description.clone(),
                executable: resolve_executable(&path, &def.path),
            })
            .collect();

        Self {
            manifest,
            path,
            commands,
        }
    }

    /// Get the plugin name from its manifest.
    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }
}

fn resolve_executable(plugin_dir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        plugin_dir.join(path)
    }
}
