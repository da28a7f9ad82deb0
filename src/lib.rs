//! ledgerops - operational tooling for a ledger node workspace
//!
//! Installs the workspace's binaries and native program modules into an
//! install root, and prepares per-label build caches on CI agents.

pub mod cache;
pub mod cli;
pub mod config;
pub mod disk;
pub mod error;
pub mod events;
pub mod install;
pub mod secrets;
pub mod toolchain;
pub mod ui;

pub use error::{LedgerOpsError, LedgerOpsResult};
