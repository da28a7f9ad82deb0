//! CLI command implementations

pub mod cache_hook;
pub mod completions;
pub mod config;
pub mod install;

pub use cache_hook::execute as cache_hook;
pub use completions::execute as completions;
pub use config::execute as config;
pub use install::execute as install;
