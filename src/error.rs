//! Error types for the DC/OS CLI
//!
//! This module defines the error types used throughout the crate.
//! Uses `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.
//!
//! Configuration coercions and TLS resolution never produce errors; they
//! degrade to typed zero values instead. Plugin subprocess failures have their
//! own taxonomy in [`crate::plugins::PluginError`].

use thiserror::Error;

/// The primary error type for DC/OS CLI operations.
#[derive(Error, Debug)]
pub enum DcosError {
    /// Configuration-related errors (unreadable store, invalid keys, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cluster catalogue errors (ambiguous names, broken cluster dirs, etc.)
    #[error("Cluster error: {0}")]
    Cluster(String),

    /// Plugin discovery and manifest errors
    #[error("Plugin error: {0}")]
    Plugin(String),

    /// Resource not found (clusters, config keys, plugins, etc.)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Security violations (path traversal in plugin manifests, etc.)
    #[error("Security violation: {0}")]
    SecurityViolation(String),

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse errors for cluster configuration files
    #[error("TOML error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization errors when persisting configuration
    #[error("TOML error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A specialized `Result` type for DC/OS CLI operations.
pub type Result<T> = std::result::Result<T, DcosError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DcosError::Config("invalid key".to_string());
        assert_eq!(err.to_string(), "Configuration error: invalid key");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DcosError = io_err.into();
        assert!(matches!(err, DcosError::Io(_)));
    }

    #[test]
    fn test_error_from_toml() {
        let toml_err = toml::from_str::<toml::Table>("core = [").unwrap_err();
        let err: DcosError = toml_err.into();
        assert!(matches!(err, DcosError::TomlDe(_)));
        assert!(err.to_string().starts_with("TOML error:"));
    }

    #[test]
    fn test_not_found_display() {
        let err = DcosError::NotFound("no cluster is attached".to_string());
        assert_eq!(err.to_string(), "Not found: no cluster is attached");
    }

    #[test]
    fn test_security_violation_display() {
        let err = DcosError::SecurityViolation("path traversal attempt detected".to_string());
        assert_eq!(
            err.to_string(),
            "Security violation: path traversal attempt detected"
        );
    }
}
