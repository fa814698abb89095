//! Logging setup and the error sink used for plugin failures.
//!
//! Diagnostics go to stderr through `tracing`. `RUST_LOG` takes precedence;
//! otherwise the level follows the `-v` counter given before the subcommand.

use std::ffi::OsStr;

use tracing::error;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Maps the `-v` counter to a filter directive.
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Counts `-v` flags ahead of the real parse.
///
/// Logging has to be configured before the command tree exists. `-v -v` and
/// `-vv` both count two. Flags before the command always count. After a
/// command listed in `builtins`, later `-v` flags count as well; after any
/// other command, such as a plugin, scanning stops so flags meant for it are
/// never counted. `--` ends the scan.
pub fn count_verbosity<S: AsRef<OsStr>>(args: &[S], builtins: &[&str]) -> u8 {
    let mut count: u8 = 0;
    let mut in_builtin = false;
    for arg in args.iter().skip(1).map(AsRef::as_ref) {
        let Some(arg) = arg.to_str() else {
            if in_builtin {
                continue;
            }
            break;
        };
        if arg == "--" {
            break;
        }
        if let Some(n) = verbosity_flag(arg) {
            count = count.saturating_add(n);
            continue;
        }
        if arg.starts_with('-') || in_builtin {
            continue;
        }
        if builtins.contains(&arg) {
            in_builtin = true;
            continue;
        }
        break;
    }
    count
}

/// `-v`, `-vv`, ... and the number of `v`s.
pub fn verbosity_flag(arg: &str) -> Option<u8> {
    let flags = arg.strip_prefix('-')?;
    if flags.is_empty() || !flags.chars().all(|c| c == 'v') {
        return None;
    }
    Some(u8::try_from(flags.len()).unwrap_or(u8::MAX))
}

/// Sink for errors that are not otherwise shown to the user.
pub trait ErrorLog: Send + Sync {
    fn error(&self, err: &dyn std::error::Error);
}

/// Emits each error as one `tracing` error event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorLog;

impl ErrorLog for TracingErrorLog {
    fn error(&self, err: &dyn std::error::Error) {
        error!("{}", err);
    }
}

/// Keeps logged errors in memory.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingLog {
    entries: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingLog {
    pub(crate) fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl ErrorLog for RecordingLog {
    fn error(&self, err: &dyn std::error::Error) {
        self.entries.lock().unwrap().push(err.to_string());
    }
}
