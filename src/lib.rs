//! DC/OS CLI - command-line client for DC/OS clusters

pub mod cli;
pub mod cluster;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod plugins;

pub use cluster::Cluster;
pub use config::Config;
pub use context::Context;
pub use error::{DcosError, Result};
