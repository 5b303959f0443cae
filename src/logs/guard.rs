// Guarded I/O: every filesystem boundary goes through here so failures are
// reported once and never reach the caller.

use std::io;
use std::path::Path;

/// Target used for the subsystem's own diagnostics
pub const INTERNAL_TARGET: &str = "chanlog::internal";

/// Run an I/O operation, reporting and absorbing any failure
///
/// Returns `None` when the operation failed.
pub fn run_guarded<T, F>(op: &str, path: &Path, f: F) -> Option<T>
where
    F: FnOnce() -> io::Result<T>,
{
    match f() {
        Ok(value) => Some(value),
        Err(e) => {
            report_failure(op, path, &e);
            None
        }
    }
}

/// Report a failure through tracing, or stderr when nothing is listening
pub fn report_failure(op: &str, path: &Path, err: &dyn std::fmt::Display) {
    if tracing::dispatcher::has_been_set() {
        tracing::warn!(
            target: INTERNAL_TARGET,
            op,
            path = %path.display(),
            error = %err,
            "logging operation failed"
        );
    } else {
        eprintln!("chanlog: {} failed for {}: {}", op, path.display(), err);
    }
}

/// Create a directory tree, absorbing failure
pub fn ensure_dir(path: &Path) -> bool {
    run_guarded("create_dir", path, || std::fs::create_dir_all(path)).is_some()
}
