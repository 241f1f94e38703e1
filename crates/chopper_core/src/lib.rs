//! Chopper Core - Backend logic for Vocal Chopper
//!
//! This crate runs vocal-separation and chopping jobs through an external
//! tool with zero UI dependencies. It can be used by a GUI shell, a plugin
//! host, or the CLI.

pub mod config;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod process;
pub mod progress;
pub mod temp;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
