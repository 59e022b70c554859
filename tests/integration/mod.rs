//! Integration test suite for helmvals
//!
//! End-to-end runs of the pipeline and the binary against chart repositories
//! served by `mockito`. No test touches the real network.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **pipeline**: full runs through the library API, dataset properties
//! - **cli**: the `helmvals` binary, exit codes and output

#[path = "../common/mod.rs"]
mod common;

mod cli;
mod pipeline;
