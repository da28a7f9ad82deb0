//! Disk usage measurement
//!
//! Sizes are apparent file sizes. On unix a file reachable through several
//! hard links inside the measured tree is counted once, matching `du`.

use crate::error::LedgerOpsResult;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Bytes in one decimal gigabyte, the unit of the cache eviction threshold
pub const GB: u64 = 1_000_000_000;

/// Format bytes as human-readable size (e.g., "1.5 GB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GIB: u64 = MB * 1024;

    if bytes >= GIB {
        format!("{:.1} GB", bytes as f64 / GIB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Size in whole decimal gigabytes, rounded up like `du --block-size=1000000000`
pub fn whole_gb(bytes: u64) -> u64 {
    bytes.div_ceil(GB)
}

/// One line of a `du -a` style listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageEntry {
    /// Path of the file or directory
    pub path: PathBuf,
    /// Bytes under this path (directories include their contents)
    pub bytes: u64,
}

/// Per-entry and total usage of a directory tree
#[derive(Debug, Clone, Default)]
pub struct DiskUsage {
    /// Entries in walk order, root last
    pub entries: Vec<UsageEntry>,
    /// Total bytes under the root
    pub total_bytes: u64,
}

/// Total bytes under `root`. A missing root measures zero.
pub fn dir_size(root: &Path) -> LedgerOpsResult<u64> {
    if !root.exists() {
        return Ok(0);
    }

    let mut seen = HashSet::new();
    let mut total = 0;
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry?;
        if entry.file_type().is_file() {
            let metadata = entry.metadata()?;
            if first_link(&mut seen, &metadata) {
                total += metadata.len();
            }
        }
    }
    Ok(total)
}

/// Walk `root` and report every entry with its size, children before parents
pub fn disk_usage(root: &Path) -> LedgerOpsResult<DiskUsage> {
    let mut seen = HashSet::new();
    let mut walked: Vec<(PathBuf, bool, u64)> = Vec::new();
    let mut dir_totals: HashMap<PathBuf, u64> = HashMap::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .contents_first(true)
    {
        let entry = entry?;
        let is_dir = entry.file_type().is_dir();
        let mut bytes = 0;
        if entry.file_type().is_file() {
            let metadata = entry.metadata()?;
            if first_link(&mut seen, &metadata) {
                bytes = metadata.len();
            }
            for ancestor in entry.path().ancestors().skip(1) {
                if !ancestor.starts_with(root) {
                    break;
                }
                *dir_totals.entry(ancestor.to_path_buf()).or_default() += bytes;
            }
        }
        walked.push((entry.into_path(), is_dir, bytes));
    }

    let entries: Vec<UsageEntry> = walked
        .into_iter()
        .map(|(path, is_dir, bytes)| {
            let bytes = if is_dir {
                dir_totals.get(&path).copied().unwrap_or(0)
            } else {
                bytes
            };
            UsageEntry { path, bytes }
        })
        .collect();

    let total_bytes = entries.last().map(|e| e.bytes).unwrap_or(0);
    Ok(DiskUsage {
        entries,
        total_bytes,
    })
}

#[cfg(unix)]
fn first_link(seen: &mut HashSet<(u64, u64)>, metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    metadata.nlink() <= 1 || seen.insert((metadata.dev(), metadata.ino()))
}

#[cfg(not(unix))]
fn first_link(_seen: &mut HashSet<(u64, u64)>, _metadata: &std::fs::Metadata) -> bool {
    true
}
