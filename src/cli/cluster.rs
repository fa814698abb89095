//! `dcos cluster` command handlers.

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use clap::{ArgMatches, Command, FromArgMatches, Subcommand};
use reqwest::Method;
use serde::Deserialize;
use tracing::info;

use crate::cluster::{http, Cluster};
use crate::context::Context;

use super::BuiltinGroup;

/// Version metadata endpoint served by every DC/OS cluster.
const VERSION_PATH: &str = "dcos-metadata/dcos-version.json";

#[derive(Subcommand, Debug)]
enum ClusterAction {
    /// List the clusters configured in the CLI
    List,
    /// Attach the CLI to a cluster
    Attach {
        /// Cluster name or ID
        name: String,
    },
    /// Check that the attached cluster is reachable
    Ping,
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
    version: String,
}

pub struct ClusterGroup;

#[async_trait]
impl BuiltinGroup for ClusterGroup {
    fn name(&self) -> &'static str {
        "cluster"
    }

    fn command(&self) -> Command {
        ClusterAction::augment_subcommands(
            Command::new(self.name())
                .about("Manage your DC/OS clusters")
                .subcommand_required(true)
                .arg_required_else_help(true),
        )
    }

    async fn run(&self, ctx: &Context, matches: &ArgMatches) -> Result<()> {
        match ClusterAction::from_arg_matches(matches)? {
            ClusterAction::List => cmd_list(ctx),
            ClusterAction::Attach { name } => cmd_attach(ctx, &name),
            ClusterAction::Ping => cmd_ping(ctx).await,
        }
    }
}

fn cmd_list(ctx: &Context) -> Result<()> {
    let clusters = ctx.clusters()?;
    let attached = ctx.attached_cluster().ok().map(|c| c.id());
    for line in list_lines(&clusters, attached.as_deref()) {
        println!("{}", line);
    }
    Ok(())
}

fn cmd_attach(ctx: &Context, name: &str) -> Result<()> {
    let cluster = ctx.attach(name)?;
    info!(cluster = %cluster.id(), "Attached to cluster");
    Ok(())
}

async fn cmd_ping(ctx: &Context) -> Result<()> {
    let cluster = ctx.attached_cluster()?;
    let version = fetch_version(&cluster).await?;
    println!("{}", version);
    Ok(())
}

/// One line per cluster: marker, name, ID and URL. The attached cluster is
/// marked with `*`.
fn list_lines(clusters: &[Cluster], attached: Option<&str>) -> Vec<String> {
    clusters
        .iter()
        .map(|cluster| {
            let id = cluster.id();
            let marker = if attached == Some(id.as_str()) { "*" } else { " " };
            format!("{} {}\t{}\t{}", marker, cluster.name(), id, cluster.url())
        })
        .collect()
}

/// Asks the cluster for its DC/OS version.
async fn fetch_version(cluster: &Cluster) -> Result<String> {
    let client = http::client_for(cluster)?;
    let response = http::request(&client, cluster, Method::GET, VERSION_PATH)
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", cluster.url()))?
        .error_for_status()?;

    let info: VersionInfo = response
        .json()
        .await
        .with_context(|| "Unexpected version metadata response")?;
    Ok(info.version)
}
