//! File system, platform and progress utilities.
//!
//! # Modules
//!
//! - [`fs`] - Idempotent directory creation and atomic writes
//! - [`platform`] - Command probing and path expansion
//! - [`progress`] - Progress bar for pipeline runs
//! - [`retry`] - Bounded retry for transient network failures

pub mod fs;
pub mod platform;
pub mod progress;
pub mod retry;

pub use fs::{atomic_write, ensure_dir, is_safe_file_name};
pub use platform::{command_exists, expand_path};
pub use progress::ProgressBar;
pub use retry::retry_transient;
