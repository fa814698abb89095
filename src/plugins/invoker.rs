//! Plugin execution
//!
//! A plugin command runs as a child process that inherits the CLI's standard
//! streams. The executable receives the command name as its first argument,
//! followed by the user's arguments untouched, so one binary can serve several
//! commands. The child is awaited without a timeout.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::logging::ErrorLog;

use super::types::PluginCommand;

/// Why a plugin command failed. Every variant means "command failed"; the
/// distinction only feeds the log message and the exit code.
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("plugin executable not found: {}", .0.display())]
    ExecutableNotFound(PathBuf),

    #[error("permission denied executing plugin: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("{command}: exit status {code}")]
    AbnormalTermination { command: String, code: i32 },

    #[error("{command}: terminated by signal {signal}")]
    SignalTermination { command: String, signal: i32 },

    #[error("failed to run plugin {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PluginError {
    /// The exit code the CLI process should terminate with.
    ///
    /// A plugin's own exit code is passed through. Spawn failures follow the
    /// shell conventions (126 not executable, 127 not found) and signals map
    /// to `128 + signal`.
    pub fn exit_code(&self) -> i32 {
        match self {
            PluginError::ExecutableNotFound(_) => 127,
            PluginError::PermissionDenied(_) => 126,
            PluginError::AbnormalTermination { code, .. } => *code,
            PluginError::SignalTermination { signal, .. } => 128 + signal,
            PluginError::Spawn { .. } => 1,
        }
    }
}

/// Standard streams handed to the plugin process.
#[derive(Debug)]
pub struct PluginStdio {
    pub stdin: Stdio,
    pub stdout: Stdio,
    pub stderr: Stdio,
}

impl PluginStdio {
    /// The CLI's own streams, unbuffered and uninterpreted.
    pub fn inherit() -> Self {
        Self {
            stdin: Stdio::inherit(),
            stdout: Stdio::inherit(),
            stderr: Stdio::inherit(),
        }
    }
}

impl Default for PluginStdio {
    fn default() -> Self {
        Self::inherit()
    }
}

/// Runs plugin commands, reporting failures to an error log.
pub struct PluginInvoker<'a> {
    log: &'a dyn ErrorLog,
}

impl<'a> PluginInvoker<'a> {
    pub fn new(log: &'a dyn ErrorLog) -> Self {
        Self { log }
    }

    /// Runs `command` with `args` and waits for it to exit.
    ///
    /// A failure is written to the error log exactly once before being
    /// returned, since the CLI prints nothing else for plugin failures.
    pub async fn invoke(
        &self,
        command: &PluginCommand,
        args: &[OsString],
        stdio: PluginStdio,
    ) -> Result<(), PluginError> {
        let result = run(command, args, stdio).await;
        if let Err(e) = &result {
            self.log.error(e);
        }
        result
    }
}

/// The logical argument vector: the command's own name, then `args`.
/// Arguments are passed as raw OS strings and need not be UTF-8.
pub fn plugin_argv(command: &PluginCommand, args: &[OsString]) -> Vec<OsString> {
    let mut argv = Vec::with_capacity(args.len() + 1);
    argv.push(OsString::from(&command.name));
    argv.extend(args.iter().cloned());
    argv
}

async fn run(
    command: &PluginCommand,
    args: &[OsString],
    stdio: PluginStdio,
) -> Result<(), PluginError> {
    let argv = plugin_argv(command, args);
    debug!(
        command = %command.name,
        executable = %command.executable.display(),
        args = ?argv,
        "Running plugin command"
    );

    let status = Command::new(&command.executable)
        .args(&argv)
        .stdin(stdio.stdin)
        .stdout(stdio.stdout)
        .stderr(stdio.stderr)
        .status()
        .await
        .map_err(|e| spawn_error(&command.executable, e))?;

    check_status(&command.name, status)
}

fn spawn_error(path: &Path, source: io::Error) -> PluginError {
    match source.kind() {
        io::ErrorKind::NotFound => PluginError::ExecutableNotFound(path.to_path_buf()),
        io::ErrorKind::PermissionDenied => PluginError::PermissionDenied(path.to_path_buf()),
        _ => PluginError::Spawn {
            path: path.to_path_buf(),
            source,
        },
    }
}

fn check_status(command: &str, status: ExitStatus) -> Result<(), PluginError> {
    if status.success() {
        return Ok(());
    }

    if let Some(code) = status.code() {
        return Err(PluginError::AbnormalTermination {
            command: command.to_string(),
            code,
        });
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Err(PluginError::SignalTermination {
                command: command.to_string(),
                signal,
            });
        }
    }

    Err(PluginError::AbnormalTermination {
        command: command.to_string(),
        code: 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::RecordingLog;
    use tempfile::TempDir;

    fn command(name: &str, executable: PathBuf) -> PluginCommand {
        PluginCommand {
            name: name.to_string(),
            description: String::new(),
            executable,
        }
    }

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[cfg(unix)]
    fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_plugin_argv_prepends_command_name() {
        let cmd = command("foo", PathBuf::from("/bin/plugin"));
        assert_eq!(
            plugin_argv(&cmd, &args(&["bar", "--baz"])),
            args(&["foo", "bar", "--baz"])
        );
        assert_eq!(plugin_argv(&cmd, &[]), args(&["foo"]));
    }

    #[test]
    fn test_exit_codes() {
        let path = PathBuf::from("/x");
        assert_eq!(PluginError::ExecutableNotFound(path.clone()).exit_code(), 127);
        assert_eq!(PluginError::PermissionDenied(path.clone()).exit_code(), 126);
        assert_eq!(
            PluginError::AbnormalTermination {
                command: "foo".into(),
                code: 3
            }
            .exit_code(),
            3
        );
        assert_eq!(
            PluginError::SignalTermination {
                command: "foo".into(),
                signal: 9
            }
            .exit_code(),
            137
        );
        assert_eq!(
            PluginError::Spawn {
                path,
                source: io::Error::new(io::ErrorKind::Other, "boom")
            }
            .exit_code(),
            1
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_invoke_passes_argument_vector() {
        let dir = TempDir::new().unwrap();
        let exe = script(&dir, "plugin", r#"for arg in "$@"; do printf '%s\n' "$arg"; done"#);
        let out_path = dir.path().join("out.txt");
        let out = std::fs::File::create(&out_path).unwrap();

        let log = RecordingLog::default();
        let stdio = PluginStdio {
            stdin: Stdio::null(),
            stdout: Stdio::from(out),
            stderr: Stdio::null(),
        };
        PluginInvoker::new(&log)
            .invoke(&command("foo", exe), &args(&["bar", "--baz"]), stdio)
            .await
            .unwrap();

        let written = std::fs::read_to_string(&out_path).unwrap();
        assert_eq!(written.lines().collect::<Vec<_>>(), vec!["foo", "bar", "--baz"]);
        assert!(log.entries().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_invoke_passes_non_utf8_arguments() {
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let exe = script(&dir, "plugin", r#"printf '%s\n' "$@""#);
        let out_path = dir.path().join("out.txt");

        let raw = std::ffi::OsStr::from_bytes(b"\xff").to_os_string();
        let log = RecordingLog::default();
        let stdio = PluginStdio {
            stdin: Stdio::null(),
            stdout: Stdio::from(std::fs::File::create(&out_path).unwrap()),
            stderr: Stdio::null(),
        };
        PluginInvoker::new(&log)
            .invoke(&command("foo", exe), &[raw], stdio)
            .await
            .unwrap();

        let written = std::fs::read(&out_path).unwrap();
        assert_eq!(written, b"foo\n\xff\n".to_vec());
        assert!(log.entries().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_invoke_wires_stdin() {
        let dir = TempDir::new().unwrap();
        let exe = script(&dir, "plugin", "cat");
        let in_path = dir.path().join("in.txt");
        std::fs::write(&in_path, "hello plugin\n").unwrap();
        let out_path = dir.path().join("out.txt");

        let log = RecordingLog::default();
        let stdio = PluginStdio {
            stdin: Stdio::from(std::fs::File::open(&in_path).unwrap()),
            stdout: Stdio::from(std::fs::File::create(&out_path).unwrap()),
            stderr: Stdio::null(),
        };
        PluginInvoker::new(&log)
            .invoke(&command("echo", exe), &[], stdio)
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&out_path).unwrap(), "hello plugin\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_invoke_nonzero_exit_logs_once() {
        let dir = TempDir::new().unwrap();
        let exe = script(&dir, "plugin", "exit 3");

        let log = RecordingLog::default();
        let err = PluginInvoker::new(&log)
            .invoke(&command("foo", exe), &[], PluginStdio::inherit())
            .await
            .unwrap_err();

        assert!(matches!(err, PluginError::AbnormalTermination { code: 3, .. }));
        assert_eq!(err.exit_code(), 3);
        assert_eq!(log.entries(), vec!["foo: exit status 3".to_string()]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_invoke_signal_termination() {
        let dir = TempDir::new().unwrap();
        let exe = script(&dir, "plugin", "kill -9 $$");

        let log = RecordingLog::default();
        let err = PluginInvoker::new(&log)
            .invoke(&command("foo", exe), &[], PluginStdio::inherit())
            .await
            .unwrap_err();

        assert!(matches!(err, PluginError::SignalTermination { signal: 9, .. }));
        assert_eq!(err.exit_code(), 137);
        assert_eq!(log.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_invoke_missing_executable() {
        let dir = TempDir::new().unwrap();
        let log = RecordingLog::default();
        let err = PluginInvoker::new(&log)
            .invoke(
                &command("foo", dir.path().join("missing")),
                &[],
                PluginStdio::inherit(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PluginError::ExecutableNotFound(_)));
        assert_eq!(err.exit_code(), 127);
        assert_eq!(log.entries().len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_invoke_not_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plugin");
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let log = RecordingLog::default();
        let err = PluginInvoker::new(&log)
            .invoke(&command("foo", path), &[], PluginStdio::inherit())
            .await
            .unwrap_err();

        assert!(matches!(err, PluginError::PermissionDenied(_)));
        assert_eq!(err.exit_code(), 126);
        assert_eq!(log.entries().len(), 1);
    }
}
