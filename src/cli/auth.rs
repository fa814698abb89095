//! `dcos auth` command handlers.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use clap::{ArgMatches, Command, FromArgMatches, Subcommand};

use crate::cluster::KEY_ACS_TOKEN;
use crate::context::Context;

use super::BuiltinGroup;

#[derive(Subcommand, Debug)]
enum AuthAction {
    /// Log out the CLI from the attached cluster
    Logout,
}

pub struct AuthGroup;

#[async_trait]
impl BuiltinGroup for AuthGroup {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn command(&self) -> Command {
        AuthAction::augment_subcommands(
            Command::new(self.name())
                .about("Authenticate to DC/OS cluster")
                .subcommand_required(true)
                .arg_required_else_help(true),
        )
    }

    async fn run(&self, ctx: &Context, matches: &ArgMatches) -> Result<()> {
        match AuthAction::from_arg_matches(matches)? {
            AuthAction::Logout => cmd_logout(ctx),
        }
    }
}

fn cmd_logout(ctx: &Context) -> Result<()> {
    let mut cluster = ctx.attached_cluster()?;
    if cluster.config_mut().unset(KEY_ACS_TOKEN) {
        cluster
            .persist()
            .with_context(|| format!("Failed to log out of cluster {}", cluster.id()))?;
    }
    Ok(())
}
