//! Process-wide context: where clusters live and how errors are reported.
//!
//! Clusters are stored under the DC/OS directory (`$DCOS_DIR`, defaulting
//! to `~/.dcos`):
//!
//! ```text
//! ~/.dcos/clusters/
//! ├── 79a9c1b0/
//! │   ├── dcos.toml
//! │   ├── attached
//! │   └── subcommands/
//! └── e5f0c3d2/
//!     └── dcos.toml
//! ```
//!
//! The cluster whose directory holds the `attached` marker is the target of
//! CLI operations.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::cluster::{Cluster, CONFIG_FILE};
use crate::config::{Config, FileSystem, OsFs};
use crate::error::{DcosError, Result};
use crate::logging::{ErrorLog, TracingErrorLog};
use crate::plugins::PluginManager;

/// Marker file flagging the attached cluster.
pub const ATTACHED_FILE: &str = "attached";

/// Environment variable overriding the DC/OS directory.
pub const DCOS_DIR_ENV: &str = "DCOS_DIR";

pub struct Context {
    dir: PathBuf,
    env: HashMap<String, String>,
    fs: Arc<dyn FileSystem>,
    log: Arc<dyn ErrorLog>,
}

impl Context {
    /// Builds the context from the process environment. Variables whose
    /// name or value is not valid UTF-8 are ignored.
    pub fn from_env() -> Result<Self> {
        let env = utf8_vars(std::env::vars_os());
        let dir = match std::env::var_os(DCOS_DIR_ENV).filter(|d| !d.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir()
                .map(|home| home.join(".dcos"))
                .ok_or_else(|| {
                    DcosError::Config("cannot determine the home directory".to_string())
                })?,
        };
        Ok(Self::new(dir, env))
    }

    /// Creates a context rooted at `dir` with the given environment.
    pub fn new(dir: impl Into<PathBuf>, env: HashMap<String, String>) -> Self {
        Self {
            dir: dir.into(),
            env,
            fs: Arc::new(OsFs),
            log: Arc::new(TracingErrorLog),
        }
    }

    pub fn with_error_log(mut self, log: Arc<dyn ErrorLog>) -> Self {
        self.log = log;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn clusters_dir(&self) -> PathBuf {
        self.dir.join("clusters")
    }

    pub fn error_log(&self) -> &dyn ErrorLog {
        self.log.as_ref()
    }

    /// Every configured cluster, sorted by ID. Environment overrides are not
    /// applied here.
    pub fn clusters(&self) -> Result<Vec<Cluster>> {
        let mut clusters = Vec::new();
        for dir in self.cluster_dirs()? {
            let config = Config::load(self.fs.clone(), dir.join(CONFIG_FILE))?;
            clusters.push(Cluster::new(Some(config)));
        }
        Ok(clusters)
    }

    /// The attached cluster, with environment overrides applied.
    pub fn attached_cluster(&self) -> Result<Cluster> {
        let attached: Vec<PathBuf> = self
            .cluster_dirs()?
            .into_iter()
            .filter(|dir| dir.join(ATTACHED_FILE).exists())
            .collect();

        match attached.as_slice() {
            [] => Err(DcosError::NotFound("no cluster is attached".to_string())),
            [dir] => {
                let config = Config::load(self.fs.clone(), dir.join(CONFIG_FILE))?
                    .with_env(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
                Ok(Cluster::new(Some(config)))
            }
            _ => Err(DcosError::Cluster(
                "multiple clusters are attached, run `dcos cluster attach` to pick one"
                    .to_string(),
            )),
        }
    }

    /// Attaches the cluster matching `name_or_id`. IDs match exactly; a name
    /// must identify a single cluster.
    pub fn attach(&self, name_or_id: &str) -> Result<Cluster> {
        let clusters = self.clusters()?;

        let target = match clusters.iter().find(|c| c.id() == name_or_id) {
            Some(cluster) => cluster,
            None => {
                let matches: Vec<&Cluster> =
                    clusters.iter().filter(|c| c.name() == name_or_id).collect();
                match matches.as_slice() {
                    [] => {
                        return Err(DcosError::NotFound(format!(
                            "no cluster matches '{}'",
                            name_or_id
                        )))
                    }
                    [cluster] => *cluster,
                    _ => {
                        return Err(DcosError::Cluster(format!(
                            "'{}' is ambiguous, use a cluster ID instead",
                            name_or_id
                        )))
                    }
                }
            }
        };

        let dir = target.dir().ok_or_else(|| {
            DcosError::Cluster(format!("cluster '{}' has no directory", name_or_id))
        })?;
        fs::write(dir.join(ATTACHED_FILE), b"")?;

        // Only detach the others once the new marker is in place.
        for cluster in &clusters {
            match cluster.dir() {
                Some(other) if other != dir => {
                    let marker = other.join(ATTACHED_FILE);
                    if marker.exists() {
                        fs::remove_file(&marker)?;
                    }
                }
                _ => {}
            }
        }
        debug!(cluster = %target.id(), "Attached cluster");

        Ok(target.clone())
    }

    /// The plugin registry of the attached cluster. Without an attached
    /// cluster there is nothing to discover.
    pub fn plugin_registry(&self) -> Option<PluginManager> {
        match self.attached_cluster() {
            Ok(cluster) => cluster.subcommands_dir().map(PluginManager::new),
            Err(e) => {
                debug!(reason = %e, "Skipping plugin discovery");
                None
            }
        }
    }

    fn cluster_dirs(&self) -> Result<Vec<PathBuf>> {
        let clusters_dir = self.clusters_dir();
        if !clusters_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut dirs = Vec::new();
        for entry in fs::read_dir(&clusters_dir)? {
            let path = entry?.path();
            if path.is_dir() && path.join(CONFIG_FILE).exists() {
                dirs.push(path);
            }
        }
        dirs.sort();
        Ok(dirs)
    }
}

fn utf8_vars<I>(vars: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}
