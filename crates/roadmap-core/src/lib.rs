//! roadmap-core library.
//!
//! State behind a public feature roadmap: the item catalog, the per-client
//! vote ledger, priority grouping, and email subscription capture.

pub mod catalog;
pub mod config;
pub mod controller;
pub mod db;
pub mod error;
pub mod kv;
pub mod ledger;
pub mod model;
pub mod sorter;
pub mod subscribe;

/// # Conventions
///
/// - **Errors**: `thiserror` enums at module boundaries, `anyhow::Result` for
///   config and database plumbing.
/// - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).
pub fn init() {
    tracing::info!("roadmap-core initialized");
}
