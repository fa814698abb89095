//! Plugin discovery and loading
//!
//! This module handles discovering plugin directories under a cluster's
//! `subcommands/` directory, loading and parsing their `plugin.json`
//! manifests, and validating manifest contents for safety and correctness.

use std::fs;
use std::path::{Component, Path};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::{DcosError, Result};

use super::types::{Plugin, PluginManifest};

/// Name of the manifest file inside each plugin directory.
pub const MANIFEST_FILE: &str = "plugin.json";

static PLUGIN_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9\-]{0,63}$").expect("valid regex"));

static COMMAND_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9\-]{0,63}$").expect("valid regex"));

/// Discover the plugins installed in `dir`.
///
/// Each subdirectory containing a `plugin.json` file is loaded and validated.
/// Invalid plugins are logged as warnings and skipped. Plugins are returned
/// sorted by directory name so discovery order is stable.
///
/// A missing directory yields no plugins; only an unreadable directory is an
/// error.
pub fn discover_plugins(dir: &Path) -> Result<Vec<Plugin>> {
    if !dir.exists() {
        debug!(dir = %dir.display(), "Plugin directory does not exist, skipping");
        return Ok(Vec::new());
    }

    if !dir.is_dir() {
        warn!(path = %dir.display(), "Plugin path is not a directory, skipping");
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|e| {
        DcosError::Plugin(format!(
            "Failed to read plugin directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let mut plugin_dirs = Vec::new();
    for entry in entries {
        let entry = entry
            .map_err(|e| DcosError::Plugin(format!("Failed to read directory entry: {}", e)))?;

        let entry_path = entry.path();
        if entry_path.is_dir() && entry_path.join(MANIFEST_FILE).exists() {
            plugin_dirs.push(entry_path);
        }
    }
    plugin_dirs.sort();

    let mut plugins = Vec::new();
    for plugin_dir in plugin_dirs {
        match load_plugin(&plugin_dir) {
            Ok(plugin) => {
                info!(
                    plugin = %plugin.name(),
                    version = %plugin.manifest.version,
                    commands = plugin.command_count(),
                    "Discovered plugin"
                );
                plugins.push(plugin);
            }
            Err(e) => {
                warn!(
                    dir = %plugin_dir.display(),
                    error = %e,
                    "Failed to load plugin, skipping"
                );
            }
        }
    }

    Ok(plugins)
}

/// Load a single plugin from its directory.
///
/// # Errors
/// - `DcosError::Plugin` if `plugin.json` does not exist or cannot be read
/// - `DcosError::Json` if the JSON is malformed
/// - `DcosError::Plugin` or `DcosError::SecurityViolation` if validation
///   fails (see `validate_manifest`)
pub fn load_plugin(dir: &Path) -> Result<Plugin> {
    let manifest_path = dir.join(MANIFEST_FILE);

    if !manifest_path.exists() {
        return Err(DcosError::Plugin(format!(
            "No {} found in {}",
            MANIFEST_FILE,
            dir.display()
        )));
    }

    let content = fs::read_to_string(&manifest_path).map_err(|e| {
        DcosError::Plugin(format!("Failed to read {}: {}", manifest_path.display(), e))
    })?;

    let manifest: PluginManifest = serde_json::from_str(&content)?;

    validate_manifest(&manifest)?;

    Ok(Plugin::new(manifest, dir.to_path_buf()))
}

/// Validate a plugin manifest for correctness and safety.
///
/// Performs the following checks:
/// - Plugin name must be 1-64 characters, alphanumeric and hyphens only
/// - Version must be non-empty
/// - At least one command must be defined
/// - Command names must start with a letter, then alphanumerics and hyphens
/// - Command paths must be non-empty and must not contain `..` components
pub fn validate_manifest(manifest: &PluginManifest) -> Result<()> {
    if !PLUGIN_NAME_RE.is_match(&manifest.name) {
        return Err(DcosError::Plugin(format!(
            "Invalid plugin name '{}': must be 1-64 alphanumeric characters and hyphens, starting with alphanumeric",
            manifest.name
        )));
    }

    if manifest.version.trim().is_empty() {
        return Err(DcosError::Plugin(format!(
            "Plugin '{}' has an empty version string",
            manifest.name
        )));
    }

    if manifest.commands.is_empty() {
        return Err(DcosError::Plugin(format!(
            "Plugin '{}' must define at least one command",
            manifest.name
        )));
    }

    for command in &manifest.commands {
        if !COMMAND_NAME_RE.is_match(&command.name) {
            return Err(DcosError::Plugin(format!(
                "Invalid command name '{}' in plugin '{}': must be 1-64 alphanumeric characters and hyphens, starting with a letter",
                command.name, manifest.name
            )));
        }

        if command.path.trim().is_empty() {
            return Err(DcosError::Plugin(format!(
                "Command '{}' in plugin '{}' has an empty path",
                command.name, manifest.name
            )));
        }

        // Path::starts_with() is component-based and does not resolve
        // traversals, so ".." has to be rejected outright.
        if Path::new(&command.path)
            .components()
            .any(|c| c == Component::ParentDir)
        {
            return Err(DcosError::SecurityViolation(format!(
                "Command '{}' in plugin '{}' has a path containing traversal: {}",
                command.name, manifest.name, command.path
            )));
        }
    }

    Ok(())
}
