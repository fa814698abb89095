//! Layered configuration store for DC/OS clusters
//!
//! Each cluster owns a `dcos.toml` file. Settings are addressed by dotted
//! keys (`core.dcos_url` is the `dcos_url` key of the `[core]` table) and a
//! small set of environment variables override the file:
//!
//! | Variable          | Key                   |
//! |-------------------|-----------------------|
//! | `DCOS_URL`        | `core.dcos_url`       |
//! | `DCOS_ACS_TOKEN`  | `core.dcos_acs_token` |
//! | `DCOS_SSL_VERIFY` | `core.ssl_verify`     |
//! | `DCOS_TIMEOUT`    | `core.timeout`        |
//!
//! Writes only touch the file layer and stay in memory until [`Config::persist`].
//! The store takes no lock: concurrent CLI processes sharing a file see
//! last-writer-wins.

mod fs;
pub mod value;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::{DcosError, Result};

pub use fs::{FileSystem, OsFs};
pub use value::Value;

#[cfg(test)]
pub use fs::MockFileSystem;

/// Environment variables that override file settings, with their dotted keys.
pub const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("DCOS_URL", "core.dcos_url"),
    ("DCOS_ACS_TOKEN", "core.dcos_acs_token"),
    ("DCOS_SSL_VERIFY", "core.ssl_verify"),
    ("DCOS_TIMEOUT", "core.timeout"),
];

/// A cluster configuration: a TOML file layer under an environment layer.
#[derive(Clone)]
pub struct Config {
    fs: Arc<dyn FileSystem>,
    path: Option<PathBuf>,
    store: toml::Table,
    env: BTreeMap<String, String>,
}

impl Config {
    /// Creates an empty in-memory config backed by the host filesystem.
    pub fn empty() -> Self {
        Self::new(Arc::new(OsFs))
    }

    /// Creates an empty in-memory config using the given filesystem.
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            path: None,
            store: toml::Table::new(),
            env: BTreeMap::new(),
        }
    }

    /// Loads the config file at `path`.
    ///
    /// A missing file yields an empty store that will be created on
    /// [`Config::persist`]. Any other read failure or a malformed file is an
    /// error.
    pub fn load(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let store = match fs.read_file(&path) {
            Ok(bytes) => {
                let content = String::from_utf8(bytes).map_err(|e| {
                    DcosError::Config(format!("{} is not valid UTF-8: {}", path.display(), e))
                })?;
                toml::from_str::<toml::Table>(&content)?
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Config file does not exist yet");
                toml::Table::new()
            }
            Err(e) => {
                return Err(DcosError::Config(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        Ok(Self {
            fs,
            path: Some(path),
            store,
            env: BTreeMap::new(),
        })
    }

    /// Applies the environment layer from a set of variables. Only the
    /// variables listed in [`ENV_OVERRIDES`] are considered; empty values
    /// are ignored.
    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, value) in vars {
            let Some((_, key)) = ENV_OVERRIDES.iter().find(|(env, _)| *env == name.as_ref())
            else {
                continue;
            };
            let value = value.into();
            if !value.is_empty() {
                self.env.insert((*key).to_string(), value);
            }
        }
        self
    }

    /// Path of the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The filesystem capability scoped to this store.
    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    /// Returns the value for a dotted key. The environment layer wins over
    /// the file layer.
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.env.get(key) {
            return Some(Value::String(value.clone()));
        }

        let mut segments = key.split('.');
        let mut current = self.store.get(segments.next()?)?;
        for segment in segments {
            current = current.as_table()?.get(segment)?;
        }
        Value::from_toml(current)
    }

    /// Sets a dotted key in the file layer, creating intermediate tables.
    /// A non-table value in the way of the path is replaced by a table.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        let mut segments: Vec<&str> = key.split('.').collect();
        let Some(leaf) = segments.pop() else {
            return;
        };

        let mut table = &mut self.store;
        for segment in segments {
            let entry = table
                .entry(segment.to_string())
                .or_insert_with(|| toml::Value::Table(toml::Table::new()));
            if !entry.is_table() {
                *entry = toml::Value::Table(toml::Table::new());
            }
            table = match entry {
                toml::Value::Table(t) => t,
                _ => unreachable!("entry was just made a table"),
            };
        }
        table.insert(leaf.to_string(), value.to_toml());
    }

    /// Removes a dotted key from the file layer. Returns whether the key
    /// was present. Empty parent tables are left in place.
    pub fn unset(&mut self, key: &str) -> bool {
        let mut segments: Vec<&str> = key.split('.').collect();
        let Some(leaf) = segments.pop() else {
            return false;
        };

        let mut table = &mut self.store;
        for segment in segments {
            table = match table.get_mut(segment) {
                Some(toml::Value::Table(t)) => t,
                _ => return false,
            };
        }
        table.remove(leaf).is_some()
    }

    /// All scalar keys visible through both layers, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = BTreeSet::new();
        collect_keys(&self.store, "", &mut keys);
        keys.extend(self.env.keys().cloned());
        keys.into_iter().collect()
    }

    /// Writes the file layer back to its file.
    pub fn persist(&self) -> Result<()> {
        let path = self.path.as_ref().ok_or_else(|| {
            DcosError::Config("configuration is not backed by a file".to_string())
        })?;
        let content = toml::to_string(&self.store)?;
        self.fs.write_file(path, content.as_bytes()).map_err(|e| {
            DcosError::Config(format!("Failed to write {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Persisted configuration");
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("path", &self.path)
            .field("keys", &self.keys())
            .finish()
    }
}

/// Checks that a dotted key has non-empty segments made of ASCII
/// alphanumerics, `_` and `-`.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        })
}

fn collect_keys(table: &toml::Table, prefix: &str, keys: &mut BTreeSet<String>) {
    for (name, value) in table {
        let key = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", prefix, name)
        };
        match value {
            toml::Value::Table(inner) => collect_keys(inner, &key, keys),
            toml::Value::Array(_) => {}
            _ => {
                keys.insert(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn load_toml(content: &str) -> (TempDir, Config) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("dcos.toml");
        std::fs::write(&path, content).unwrap();
        let config = Config::load(Arc::new(OsFs), &path).unwrap();
        (tmp, config)
    }

    #[test]
    fn test_get_dotted_key() {
        let (_tmp, config) = load_toml(
            r#"
[core]
dcos_url = "https://example.com"
timeout = 15

[cluster]
name = "prod"
"#,
        );
        assert_eq!(
            config.get("core.dcos_url"),
            Some(Value::from("https://example.com"))
        );
        assert_eq!(config.get("core.timeout"), Some(Value::Integer(15)));
        assert_eq!(config.get("cluster.name"), Some(Value::from("prod")));
        assert_eq!(config.get("core.missing"), None);
        assert_eq!(config.get("core"), None);
        assert_eq!(config.get("core.dcos_url.deeper"), None);
    }

    #[test]
    fn test_set_creates_tables() {
        let mut config = Config::empty();
        config.set("core.dcos_url", "http://x");
        config.set("core.timeout", 30i64);
        assert_eq!(config.get("core.dcos_url"), Some(Value::from("http://x")));
        assert_eq!(config.get("core.timeout"), Some(Value::Integer(30)));
    }

    #[test]
    fn test_set_replaces_scalar_in_path() {
        let mut config = Config::empty();
        config.set("core", "scalar");
        config.set("core.dcos_url", "http://x");
        assert_eq!(config.get("core.dcos_url"), Some(Value::from("http://x")));
    }

    #[test]
    fn test_unset() {
        let mut config = Config::empty();
        config.set("core.dcos_acs_token", "token");
        assert!(config.unset("core.dcos_acs_token"));
        assert!(!config.unset("core.dcos_acs_token"));
        assert!(!config.unset("nothing.here"));
        assert_eq!(config.get("core.dcos_acs_token"), None);
    }

    #[test]
    fn test_env_layer_overrides_file() {
        let (_tmp, config) = load_toml("[core]\ndcos_url = \"http://file\"\n");
        let config = config.with_env(vec![
            ("DCOS_URL", "http://env"),
            ("DCOS_SSL_VERIFY", ""),
            ("HOME", "/root"),
        ]);
        assert_eq!(config.get("core.dcos_url"), Some(Value::from("http://env")));
        assert_eq!(config.get("core.ssl_verify"), None);
        assert!(!config.keys().iter().any(|k| k.contains("HOME")));
    }

    #[test]
    fn test_keys_sorted_and_flattened() {
        let mut config = Config::empty();
        config.set("core.timeout", 5i64);
        config.set("cluster.name", "a");
        config.set("core.dcos_url", "u");
        assert_eq!(
            config.keys(),
            vec!["cluster.name", "core.dcos_url", "core.timeout"]
        );
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load(Arc::new(OsFs), tmp.path().join("dcos.toml")).unwrap();
        assert!(config.keys().is_empty());
        assert!(config.path().is_some());
    }

    #[test]
    fn test_load_malformed_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("dcos.toml");
        std::fs::write(&path, "[core\n").unwrap();
        let result = Config::load(Arc::new(OsFs), &path);
        assert!(matches!(result, Err(DcosError::TomlDe(_))));
    }

    #[test]
    fn test_persist_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("clusters").join("abc").join("dcos.toml");

        let mut config = Config::load(Arc::new(OsFs), &path).unwrap();
        config.set("core.dcos_url", "https://example.com");
        config.set("core.timeout", 12.5);
        config.persist().unwrap();

        let reloaded = Config::load(Arc::new(OsFs), &path).unwrap();
        assert_eq!(
            reloaded.get("core.dcos_url"),
            Some(Value::from("https://example.com"))
        );
        assert_eq!(reloaded.get("core.timeout"), Some(Value::Float(12.5)));
    }

    #[test]
    fn test_persist_without_path_fails() {
        let config = Config::empty();
        assert!(matches!(config.persist(), Err(DcosError::Config(_))));
    }

    #[test]
    fn test_persist_goes_through_filesystem() {
        let mut fs = MockFileSystem::new();
        fs.expect_read_file()
            .times(1)
            .returning(|_| Err(io::Error::from(io::ErrorKind::NotFound)));
        fs.expect_write_file()
            .withf(|path, contents| {
                path == Path::new("/virtual/dcos.toml")
                    && String::from_utf8_lossy(contents).contains("dcos_url")
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let mut config = Config::load(Arc::new(fs), "/virtual/dcos.toml").unwrap();
        config.set("core.dcos_url", "http://x");
        config.persist().unwrap();
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("core.dcos_url"));
        assert!(is_valid_key("marathon.url"));
        assert!(is_valid_key("cluster.name"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("core."));
        assert!(!is_valid_key(".core"));
        assert!(!is_valid_key("core..url"));
        assert!(!is_valid_key("core.url with space"));
    }
}
