//! Typed view over a cluster's configuration.
//!
//! [`Cluster`] is a thin projection over a [`Config`]: every getter re-reads
//! the store and coerces the raw value, every setter writes straight through.
//! Nothing is cached and no getter fails; wrongly typed settings read as the
//! zero value of their type.

pub mod http;
pub mod tls;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{value, Config};
use crate::error::Result;

pub use tls::{CertPool, TlsPolicy, TrustRoots};

pub const KEY_URL: &str = "core.dcos_url";
pub const KEY_ACS_TOKEN: &str = "core.dcos_acs_token";
pub const KEY_SSL_VERIFY: &str = "core.ssl_verify";
pub const KEY_TIMEOUT: &str = "core.timeout";
pub const KEY_NAME: &str = "cluster.name";

/// Name of the per-cluster configuration file.
pub const CONFIG_FILE: &str = "dcos.toml";

/// A DC/OS cluster as described by its configuration.
#[derive(Debug, Clone, Default)]
pub struct Cluster {
    config: Config,
}

impl Cluster {
    /// Wraps a config; `None` wraps an empty in-memory config.
    pub fn new(config: Option<Config>) -> Self {
        Self {
            config: config.unwrap_or_default(),
        }
    }

    /// Public master URL of the cluster, without trailing slashes.
    pub fn url(&self) -> String {
        let url = value::to_string(self.config.get(KEY_URL).as_ref());
        url.trim_end_matches('/').to_string()
    }

    pub fn set_url(&mut self, url: &str) {
        self.config.set(KEY_URL, url);
    }

    /// Token issued by the Admin Router Access Control Service.
    pub fn acs_token(&self) -> String {
        value::to_string(self.config.get(KEY_ACS_TOKEN).as_ref())
    }

    pub fn set_acs_token(&mut self, token: &str) {
        self.config.set(KEY_ACS_TOKEN, token);
    }

    /// HTTP request timeout once the connection is established.
    ///
    /// Stored as seconds; fractional and negative values are truncated and
    /// clamped, and non-numeric values read as zero.
    pub fn timeout(&self) -> Duration {
        let seconds = value::to_i64(self.config.get(KEY_TIMEOUT).as_ref());
        Duration::from_secs(u64::try_from(seconds).unwrap_or(0))
    }

    /// Stores the timeout as (possibly fractional) seconds.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.config.set(KEY_TIMEOUT, timeout.as_secs_f64());
    }

    /// Custom user-facing name of the cluster.
    pub fn name(&self) -> String {
        value::to_string(self.config.get(KEY_NAME).as_ref())
    }

    pub fn set_name(&mut self, name: &str) {
        self.config.set(KEY_NAME, name);
    }

    /// Trust policy for TLS connections, resolved from `core.ssl_verify`.
    pub fn tls(&self) -> TlsPolicy {
        let raw = value::to_string(self.config.get(KEY_SSL_VERIFY).as_ref());
        TlsPolicy::resolve(&raw, self.config.fs())
    }

    pub fn set_tls(&mut self, policy: &TlsPolicy) {
        self.config.set(KEY_SSL_VERIFY, policy.to_string());
    }

    /// Directory holding this cluster's `dcos.toml`, when file backed.
    pub fn dir(&self) -> Option<&Path> {
        self.config.path().and_then(Path::parent)
    }

    /// Cluster ID, taken from its directory name.
    pub fn id(&self) -> String {
        self.dir()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Directory where the cluster's plugins are installed.
    pub fn subcommands_dir(&self) -> Option<PathBuf> {
        self.dir().map(|dir| dir.join("subcommands"))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Writes pending changes to the cluster's config file.
    pub fn persist(&self) -> Result<()> {
        self.config.persist()
    }
}
