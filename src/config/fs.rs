//! Filesystem capability handed out by the configuration store.
//!
//! Side files referenced from configuration (CA bundles) are read through
//! this trait rather than `std::fs` directly, so callers can be observed or
//! redirected in tests.

use std::fs;
use std::io;
use std::path::Path;

/// File access scoped to the configuration store.
#[cfg_attr(test, mockall::automock)]
pub trait FileSystem: Send + Sync {
    /// Reads the whole file at `path`.
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Writes `contents` to `path`, creating missing parent directories.
    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
}

/// The host operating system's filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl FileSystem for OsFs {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, contents)
    }
}
