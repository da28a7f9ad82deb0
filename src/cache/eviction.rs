//! Size-threshold eviction for per-label caches

use crate::disk::{dir_size, format_bytes, whole_gb};
use crate::error::{LedgerOpsError, LedgerOpsResult};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// State of a label's cache directory after the size check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheCheck {
    /// No cache directory existed yet
    Missing,
    /// Cache is within the threshold and was kept
    Kept { bytes: u64 },
    /// Cache exceeded the threshold and was deleted
    Evicted { bytes: u64 },
}

/// Whether a cache of `bytes` is over a `max_gb` threshold.
///
/// The size is taken in whole decimal gigabytes, rounded up, and must be
/// strictly greater than the threshold.
pub fn exceeds_threshold(bytes: u64, max_gb: u64) -> bool {
    whole_gb(bytes) > max_gb
}

/// Apparent size of `cache_dir`, or `None` when it does not exist yet
pub fn measure_cache(cache_dir: &Path) -> LedgerOpsResult<Option<u64>> {
    if !cache_dir.is_dir() {
        return Ok(None);
    }
    let bytes = dir_size(cache_dir)?;
    info!("{}: {}", cache_dir.display(), format_bytes(bytes));
    Ok(Some(bytes))
}

/// Delete `cache_dir` entirely when its `measured` size exceeds `max_gb`.
///
/// Eviction is all or nothing: the whole label cache goes.
pub fn apply_size_limit(
    cache_dir: &Path,
    measured: Option<u64>,
    max_gb: u64,
) -> LedgerOpsResult<CacheCheck> {
    let Some(bytes) = measured else {
        return Ok(CacheCheck::Missing);
    };
    if !exceeds_threshold(bytes, max_gb) {
        info!("Cache {} is {} GB, keeping", cache_dir.display(), whole_gb(bytes));
        return Ok(CacheCheck::Kept { bytes });
    }

    warn!(
        "{} has gotten too large ({} GB > {} GB), removing it",
        cache_dir.display(),
        whole_gb(bytes),
        max_gb
    );
    fs::remove_dir_all(cache_dir)
        .map_err(|e| LedgerOpsError::io(format!("removing cache {}", cache_dir.display()), e))?;
    Ok(CacheCheck::Evicted { bytes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::GB;
    use tempfile::TempDir;

    fn enforce_size_limit(cache_dir: &Path, max_gb: u64) -> LedgerOpsResult<CacheCheck> {
        let measured = measure_cache(cache_dir)?;
        apply_size_limit(cache_dir, measured, max_gb)
    }

    #[test]
    fn threshold_is_strictly_greater_in_whole_gb() {
        assert!(!exceeds_threshold(0, 10));
        assert!(!exceeds_threshold(9 * GB + 1, 10));
        assert!(!exceeds_threshold(10 * GB, 10));
        assert!(exceeds_threshold(10 * GB + 1, 10));
        assert!(exceeds_threshold(42 * GB, 10));
    }

    #[test]
    fn missing_cache_is_reported() {
        let temp = TempDir::new().unwrap();
        assert_eq!(
            enforce_size_limit(&temp.path().join("nope"), 10).unwrap(),
            CacheCheck::Missing
        );
    }

    #[test]
    fn small_cache_is_kept() {
        let temp = TempDir::new().unwrap();
        let cache = temp.path().join("label");
        fs::create_dir_all(cache.join("target")).unwrap();
        fs::write(cache.join("target/file"), b"1234").unwrap();

        let check = enforce_size_limit(&cache, 10).unwrap();
        assert_eq!(check, CacheCheck::Kept { bytes: 4 });
        assert!(cache.join("target/file").exists());
    }

    #[test]
    fn oversized_cache_is_removed_entirely() {
        let temp = TempDir::new().unwrap();
        let cache = temp.path().join("label");
        fs::create_dir_all(cache.join("target/release")).unwrap();
        fs::write(cache.join("target/release/big"), b"x").unwrap();

        // Any non-empty cache rounds up to 1 GB, over a zero threshold
        let check = enforce_size_limit(&cache, 0).unwrap();
        assert!(matches!(check, CacheCheck::Evicted { .. }));
        assert!(!cache.exists());
    }

    #[test]
    fn measured_size_reported_before_decision() {
        let temp = TempDir::new().unwrap();
        let cache = temp.path().join("label");
        fs::create_dir_all(cache.join("target")).unwrap();
        fs::write(cache.join("target/file"), b"123456").unwrap();

        let measured = measure_cache(&cache).unwrap();
        assert_eq!(measured, Some(6));
        assert_eq!(measure_cache(&temp.path().join("nope")).unwrap(), None);

        let check = apply_size_limit(&cache, measured, 0).unwrap();
        assert_eq!(check, CacheCheck::Evicted { bytes: 6 });
    }
}
