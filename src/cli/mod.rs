//! Command tree for the `dcos` binary.
//!
//! The tree is composed once per invocation from the built-in groups and,
//! when a cluster is attached, the commands of that cluster's plugins.
//! Built-ins are registered first and a plugin command never replaces an
//! existing entry. Plugin commands do no argument parsing of their own:
//! everything after the command name is handed to the plugin verbatim, as
//! raw OS strings.

mod auth;
mod cluster;
mod config;

use std::ffi::OsString;

use async_trait::async_trait;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use tracing::{debug, warn};

use crate::context::Context;
use crate::logging::verbosity_flag;
use crate::plugins::{plugin_commands, PluginCommand, PluginInvoker, PluginRegistry, PluginStdio};

pub use auth::AuthGroup;
pub use cluster::ClusterGroup;
pub use config::ConfigGroup;

/// Root usage text, following the DC/OS CLI help layout.
const ROOT_HELP_TEMPLATE: &str = "\
Usage:
  {usage}

Commands:
{subcommands}

Options:
  --version
      Print version information
  -v, -vv
      Output verbosity (verbose or very verbose)
  -h, --help
      Show usage help

Use \"dcos [command] --help\" for more information about a command.
";

/// Names no plugin may take.
const RESERVED_NAMES: &[&str] = &["help"];

/// A group of built-in subcommands, such as `dcos config`.
#[async_trait]
pub trait BuiltinGroup: Send + Sync {
    /// Name the group is registered under.
    fn name(&self) -> &'static str;

    /// The clap definition of the group, named [`BuiltinGroup::name`].
    fn command(&self) -> Command;

    /// Runs the group with the matches of its own subcommand.
    async fn run(&self, ctx: &Context, matches: &ArgMatches) -> anyhow::Result<()>;
}

/// What runs when a top-level command is selected.
pub enum Handler {
    BuiltIn(Box<dyn BuiltinGroup>),
    Plugin(PluginCommand),
}

pub struct Entry {
    pub handler: Handler,
    /// Plugin failures are already reported through the error log, so the
    /// tree prints nothing for them.
    pub silence_errors: bool,
}

/// The merged, immutable set of top-level commands.
pub struct CommandTree {
    entries: Vec<(String, Entry)>,
}

/// The built-in groups shipped with the CLI.
pub fn builtin_groups() -> Vec<Box<dyn BuiltinGroup>> {
    vec![
        Box::new(AuthGroup),
        Box::new(ConfigGroup),
        Box::new(ClusterGroup),
    ]
}

/// Builds the tree for this invocation. Plugins are only discovered when a
/// cluster is attached.
pub fn compose(ctx: &Context, builtins: Vec<Box<dyn BuiltinGroup>>) -> CommandTree {
    let registry = ctx.plugin_registry();
    compose_with(
        builtins,
        registry.as_ref().map(|r| r as &dyn PluginRegistry),
    )
}

/// Builds the tree from an optional registry, querying it at most once.
pub fn compose_with(
    builtins: Vec<Box<dyn BuiltinGroup>>,
    registry: Option<&dyn PluginRegistry>,
) -> CommandTree {
    let commands = registry.map(plugin_commands).unwrap_or_default();
    CommandTree::build(builtins, commands)
}

impl CommandTree {
    /// Merges built-in groups and plugin commands. The first registration of
    /// a name wins, and built-ins always register first.
    pub fn build(builtins: Vec<Box<dyn BuiltinGroup>>, plugins: Vec<PluginCommand>) -> Self {
        let mut tree = Self {
            entries: Vec::with_capacity(builtins.len() + plugins.len()),
        };

        for group in builtins {
            let name = group.name().to_string();
            if tree.contains(&name) {
                warn!(command = %name, "Duplicate built-in command group, skipping");
                continue;
            }
            tree.entries.push((
                name,
                Entry {
                    handler: Handler::BuiltIn(group),
                    silence_errors: false,
                },
            ));
        }

        for command in plugins {
            if RESERVED_NAMES.contains(&command.name.as_str()) || tree.contains(&command.name) {
                warn!(
                    command = %command.name,
                    executable = %command.executable.display(),
                    "Plugin command name is already taken, skipping"
                );
                continue;
            }
            tree.entries.push((
                command.name.clone(),
                Entry {
                    handler: Handler::Plugin(command),
                    silence_errors: true,
                },
            ));
        }

        tree
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|(entry_name, _)| entry_name == name)
            .map(|(_, entry)| entry)
    }

    /// Command names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// The clap definition of the whole tree, used for parsing and help.
    pub fn to_clap(&self) -> Command {
        let mut root = Command::new("dcos")
            .version(env!("CARGO_PKG_VERSION"))
            .override_usage("dcos [command]")
            .help_template(ROOT_HELP_TEMPLATE)
            .next_line_help(true)
            .disable_version_flag(true)
            .arg(
                Arg::new("version")
                    .long("version")
                    .action(ArgAction::Version)
                    .help("Print version information"),
            )
            .arg(
                Arg::new("verbose")
                    .short('v')
                    .global(true)
                    .action(ArgAction::Count)
                    .help("Output verbosity (verbose or very verbose)"),
            );

        for (name, entry) in &self.entries {
            let subcommand = match &entry.handler {
                Handler::BuiltIn(group) => group.command(),
                Handler::Plugin(command) => plugin_subcommand(name, command),
            };
            root = root.subcommand(subcommand);
        }

        root
    }

    /// Parses `args` (including the program name) and runs the selected
    /// handler. Returns the process exit code.
    pub async fn run(&self, ctx: &Context, args: Vec<OsString>) -> i32 {
        if let Some((entry, command, plugin_args)) = self.plugin_invocation(&args) {
            return run_plugin(ctx, entry, command, plugin_args).await;
        }

        let mut root = self.to_clap();
        let matches = match root.try_get_matches_from_mut(&args) {
            Ok(matches) => matches,
            Err(e) => {
                let _ = e.print();
                return e.exit_code();
            }
        };

        let Some((name, sub_matches)) = matches.subcommand() else {
            let _ = root.print_help();
            return 0;
        };

        let Some(entry) = self.get(name) else {
            eprintln!("Error: unknown command \"{}\" for \"dcos\"", name);
            return 1;
        };

        match &entry.handler {
            Handler::BuiltIn(group) => match group.run(ctx, sub_matches).await {
                Ok(()) => 0,
                Err(e) => {
                    if !entry.silence_errors {
                        eprintln!("Error: {:#}", e);
                    }
                    1
                }
            },
            Handler::Plugin(command) => {
                let plugin_args: Vec<OsString> = sub_matches
                    .get_many::<OsString>("args")
                    .map(|values| values.cloned().collect())
                    .unwrap_or_default();
                run_plugin(ctx, entry, command, &plugin_args).await
            }
        }
    }

    /// Finds a plugin command in raw `args` and the arguments following it.
    /// Only `-v` flags may precede the command name.
    fn plugin_invocation<'a>(
        &self,
        args: &'a [OsString],
    ) -> Option<(&Entry, &PluginCommand, &'a [OsString])> {
        for (i, arg) in args.iter().enumerate().skip(1) {
            let arg = arg.to_str()?;
            if verbosity_flag(arg).is_some() {
                continue;
            }
            let entry = self.get(arg)?;
            return match &entry.handler {
                Handler::Plugin(command) => Some((entry, command, &args[i + 1..])),
                Handler::BuiltIn(_) => None,
            };
        }
        None
    }
}

async fn run_plugin(ctx: &Context, entry: &Entry, command: &PluginCommand, args: &[OsString]) -> i32 {
    debug!(command = %command.name, "Dispatching to plugin");

    let invoker = PluginInvoker::new(ctx.error_log());
    match invoker.invoke(command, args, PluginStdio::inherit()).await {
        Ok(()) => 0,
        Err(e) => {
            if !entry.silence_errors {
                eprintln!("Error: {}", e);
            }
            e.exit_code()
        }
    }
}

fn plugin_subcommand(name: &str, command: &PluginCommand) -> Command {
    Command::new(name.to_string())
        .about(command.description.clone())
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg(
            Arg::new("args")
                .value_parser(value_parser!(OsString))
                .num_args(0..)
                .trailing_var_arg(true)
                .allow_hyphen_values(true)
                .action(ArgAction::Append),
        )
}
