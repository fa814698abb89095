//! `dcos config` command handlers.

use anyhow::{bail, Context as _, Result};
use async_trait::async_trait;
use clap::{ArgMatches, Command, FromArgMatches, Subcommand};

use crate::cluster::KEY_ACS_TOKEN;
use crate::config::{is_valid_key, Config, Value};
use crate::context::Context;

use super::BuiltinGroup;

/// Shown instead of the ACS token when listing the configuration.
const MASKED: &str = "*******";

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the configuration of the attached cluster
    Show {
        /// Only print this key
        key: Option<String>,
    },
    /// Add or set a property in the configuration
    Set {
        /// Dotted key, such as core.dcos_url
        key: String,
        value: String,
    },
    /// Remove a property from the configuration
    Unset {
        key: String,
    },
}

pub struct ConfigGroup;

#[async_trait]
impl BuiltinGroup for ConfigGroup {
    fn name(&self) -> &'static str {
        "config"
    }

    fn command(&self) -> Command {
        ConfigAction::augment_subcommands(
            Command::new(self.name())
                .about("Manage the DC/OS configuration file")
                .subcommand_required(true)
                .arg_required_else_help(true),
        )
    }

    async fn run(&self, ctx: &Context, matches: &ArgMatches) -> Result<()> {
        match ConfigAction::from_arg_matches(matches)? {
            ConfigAction::Show { key } => cmd_show(ctx, key.as_deref()),
            ConfigAction::Set { key, value } => cmd_set(ctx, &key, &value),
            ConfigAction::Unset { key } => cmd_unset(ctx, &key),
        }
    }
}

fn cmd_show(ctx: &Context, key: Option<&str>) -> Result<()> {
    let cluster = ctx.attached_cluster()?;
    match key {
        Some(key) => println!("{}", show_value(cluster.config(), key)?),
        None => {
            for line in show_lines(cluster.config()) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

fn cmd_set(ctx: &Context, key: &str, value: &str) -> Result<()> {
    if !is_valid_key(key) {
        bail!("invalid key '{}'", key);
    }
    let mut cluster = ctx.attached_cluster()?;
    cluster.config_mut().set(key, parse_value(value));
    cluster
        .persist()
        .with_context(|| format!("Failed to set '{}'", key))?;
    Ok(())
}

fn cmd_unset(ctx: &Context, key: &str) -> Result<()> {
    let mut cluster = ctx.attached_cluster()?;
    if !cluster.config_mut().unset(key) {
        bail!("unknown key '{}'", key);
    }
    cluster
        .persist()
        .with_context(|| format!("Failed to unset '{}'", key))?;
    Ok(())
}

/// Every key with its value, one `key value` pair per line. The ACS token
/// is masked.
fn show_lines(config: &Config) -> Vec<String> {
    config
        .keys()
        .into_iter()
        .filter_map(|key| {
            let value = config.get(&key)?;
            let shown = if key == KEY_ACS_TOKEN {
                MASKED.to_string()
            } else {
                value.to_string_lossy()
            };
            Some(format!("{} {}", key, shown))
        })
        .collect()
}

fn show_value(config: &Config, key: &str) -> Result<String> {
    match config.get(key) {
        Some(value) => Ok(value.to_string_lossy()),
        None => bail!("unknown key '{}'", key),
    }
}

/// Integers are stored as such; anything else is kept as text.
fn parse_value(raw: &str) -> Value {
    match raw.parse::<i64>() {
        Ok(i) => Value::Integer(i),
        Err(_) => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn attached_cluster(root: &Path, toml: &str) -> PathBuf {
        let dir = root.join("clusters").join("aaa");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("dcos.toml"), toml).unwrap();
        std::fs::write(dir.join("attached"), "").unwrap();
        dir
    }

    async fn run(ctx: &Context, args: &[&str]) -> Result<()> {
        let mut argv = vec!["config"];
        argv.extend_from_slice(args);
        let matches = ConfigGroup.command().try_get_matches_from(argv).unwrap();
        ConfigGroup.run(ctx, &matches).await
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("30"), Value::Integer(30));
        assert_eq!(parse_value("-5"), Value::Integer(-5));
        assert_eq!(parse_value("false"), Value::String("false".into()));
        assert_eq!(parse_value("https://x"), Value::String("https://x".into()));
    }

    #[test]
    fn test_show_lines_masks_token() {
        let mut config = Config::empty();
        config.set("core.dcos_url", "https://a");
        config.set("core.dcos_acs_token", "secret");
        config.set("core.timeout", 30_i64);

        assert_eq!(
            show_lines(&config),
            vec![
                "core.dcos_acs_token *******".to_string(),
                "core.dcos_url https://a".to_string(),
                "core.timeout 30".to_string(),
            ]
        );
    }

    #[test]
    fn test_show_value_unknown_key() {
        let config = Config::empty();
        assert!(show_value(&config, "core.nope").is_err());
    }

    #[tokio::test]
    async fn test_set_and_unset_persist() {
        let tmp = TempDir::new().unwrap();
        attached_cluster(tmp.path(), "[core]\ndcos_url = \"https://a\"\n");
        let ctx = Context::new(tmp.path(), HashMap::new());

        run(&ctx, &["set", "core.timeout", "45"]).await.unwrap();
        run(&ctx, &["set", "cluster.name", "prod"]).await.unwrap();

        let cluster = ctx.attached_cluster().unwrap();
        assert_eq!(cluster.config().get("core.timeout"), Some(Value::Integer(45)));
        assert_eq!(cluster.name(), "prod");

        run(&ctx, &["unset", "cluster.name"]).await.unwrap();
        assert_eq!(ctx.attached_cluster().unwrap().name(), "");
        assert!(run(&ctx, &["unset", "cluster.name"]).await.is_err());
    }

    #[tokio::test]
    async fn test_set_rejects_invalid_key() {
        let tmp = TempDir::new().unwrap();
        attached_cluster(tmp.path(), "");
        let ctx = Context::new(tmp.path(), HashMap::new());

        assert!(run(&ctx, &["set", "core..url", "x"]).await.is_err());
    }
}
