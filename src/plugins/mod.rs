//! Plugin system for the DC/OS CLI
//!
//! Plugins extend the CLI with commands backed by external executables. They
//! are installed per cluster and only discovered when a cluster is attached.
//! Each plugin is a directory containing a `plugin.json` manifest that maps
//! command names to executables.
//!
//! # Architecture
//!
//! - **types**: Manifest and runtime structures (`PluginManifest`, `Plugin`, `PluginCommand`)
//! - **loader**: Plugin discovery, loading, and manifest validation
//! - **registry**: The `PluginRegistry` seam and the directory-backed `PluginManager`
//! - **invoker**: Runs a plugin command as a child process
//!
//! # Plugin Directory Structure
//!
//! ```text
//! ~/.dcos/clusters/<cluster-id>/subcommands/
//! ├── dcos-core-cli/
//! │   ├── plugin.json
//! │   └── bin/
//! │       └── dcos-core
//! └── kafka/
//!     ├── plugin.json
//!     └── bin/
//!         └── dcos-kafka
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use dcos::plugins::{plugin_commands, PluginManager};
//!
//! let manager = PluginManager::new("/home/user/.dcos/clusters/79a9c1b0/subcommands");
//! for command in plugin_commands(&manager) {
//!     println!("{}: {}", command.name, command.description);
//! }
//! ```

mod invoker;
mod loader;
pub mod registry;
pub mod types;

pub use invoker::{plugin_argv, PluginError, PluginInvoker, PluginStdio};
pub use loader::{discover_plugins, load_plugin, validate_manifest, MANIFEST_FILE};
pub use registry::{plugin_commands, PluginManager, PluginRegistry};
pub use types::{Plugin, PluginCommand, PluginCommandDef, PluginManifest};
