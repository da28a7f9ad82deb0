//! Toolchain abstraction
//!
//! Provides a trait for the build and install operations the installer
//! needs, implemented by cargo in production and by fakes in tests.

use crate::config::schema::BinCrate;
use crate::error::LedgerOpsResult;
use async_trait::async_trait;
use std::path::Path;

/// Callback receiving each line of toolchain output
pub type OutputSink<'a> = &'a (dyn Fn(String) + Send + Sync);

/// Abstract build toolchain interface
///
/// Every operation is fail-fast: a non-zero exit of the underlying tool
/// becomes an error carrying that exit code.
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Check if the toolchain is available on this system
    async fn is_available(&self) -> bool;

    /// Build every workspace member in release configuration
    async fn build_release(
        &self,
        workspace: &Path,
        features: &str,
        on_output: OutputSink<'_>,
    ) -> LedgerOpsResult<()>;

    /// Install one binary crate under `root`, overwriting any previous copy
    async fn install_binary(
        &self,
        workspace: &Path,
        krate: &BinCrate,
        root: &Path,
        features: &str,
        on_output: OutputSink<'_>,
    ) -> LedgerOpsResult<()>;

    /// Get the human-readable toolchain name for display
    fn toolchain_name(&self) -> &'static str;
}
