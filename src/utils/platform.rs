//! Platform helpers.

use std::path::PathBuf;

/// Checks if a command is available in the system PATH.
///
/// Used by the pre-flight probe to decide whether the `external` extraction
/// strategy can run.
#[must_use]
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Expands a leading `~` and environment variables in a configured path.
///
/// Falls back to the literal input when expansion fails (for example an
/// undefined variable), so a typo surfaces later as a missing directory rather
/// than a silent rewrite.
#[must_use]
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(raw),
    }
}
