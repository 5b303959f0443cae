// Relocate-or-copy filesystem interface used by the rotation protocol

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Arc;

/// Filesystem operations the rotation protocol needs
///
/// The protocol only ever calls these methods, so platform differences
/// (chiefly how a file held open elsewhere shows up) stay out of it.
pub trait Relocator: Send + Sync {
    /// Rename or move `from` to `to`
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Copy the bytes of `from` into a new file at `to`
    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64>;

    /// Truncate `path` to zero length in place
    fn truncate(&self, path: &Path) -> io::Result<()>;

    /// Whether a rename failure means the file is locked by someone else
    fn is_locked(&self, err: &io::Error) -> bool {
        is_lock_violation(err)
    }
}

/// Relocator backed by the real filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeFs;

impl Relocator for NativeFs {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        fs::copy(from, to)
    }

    fn truncate(&self, path: &Path) -> io::Result<()> {
        let file = OpenOptions::new().write(true).open(path)?;
        file.set_len(0)
    }
}

/// Shared handle to the native relocator
pub fn native() -> Arc<dyn Relocator> {
    Arc::new(NativeFs)
}

/// ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION
#[cfg(windows)]
pub fn is_lock_violation(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(32) | Some(33))
}

#[cfg(unix)]
pub fn is_lock_violation(err: &io::Error) -> bool {
    use nix::errno::Errno;

    match err.raw_os_error() {
        Some(code) => matches!(Errno::from_raw(code), Errno::EBUSY | Errno::ETXTBSY),
        None => false,
    }
}

#[cfg(not(any(unix, windows)))]
pub fn is_lock_violation(_err: &io::Error) -> bool {
    false
}
