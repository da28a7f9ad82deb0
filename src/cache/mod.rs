//! Per-label CI build cache
//!
//! Each CI job label owns `<cache root>/<label>`. Before a job runs, the
//! cache is measured and discarded wholesale if it has grown too large, then
//! its `target/` is mirrored into the workspace with hard links.
//!
//! # Lifecycle
//!
//! | Cache state | Action |
//! |-------------|--------|
//! | Missing | create empty `target/` |
//! | At or under threshold | keep, mirror into workspace |
//! | Over threshold | delete, recreate empty `target/` |
//!
//! One hook run per label at a time; concurrent agents sharing a label are
//! not coordinated.

pub mod eviction;
pub mod hook;
pub mod mirror;

pub use eviction::{apply_size_limit, exceeds_threshold, measure_cache, CacheCheck};
pub use hook::{
    CacheHook, HookEnvironment, HookOutcome, JobLabel, PreparedHook, SecretsStatus,
};
pub use mirror::{mirror_with_links, MirrorStats};
