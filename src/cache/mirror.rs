//! Mirror a directory tree using hard links
//!
//! After [`mirror_with_links`] the destination holds exactly the source's
//! entries. Files already identical are left alone, changed or new files are
//! hard-linked to the source (copied when linking is impossible, e.g. across
//! devices), and anything the source lacks is deleted.

use crate::error::{LedgerOpsError, LedgerOpsResult};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// What a mirror pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MirrorStats {
    /// Files newly hard-linked to the source
    pub linked: usize,
    /// Files copied because linking failed
    pub copied: usize,
    /// Files already matching the source
    pub unchanged: usize,
    /// Destination entries removed because the source lacks them
    pub removed: usize,
}

/// Make `dest` an exact mirror of `src`
pub fn mirror_with_links(src: &Path, dest: &Path) -> LedgerOpsResult<MirrorStats> {
    let mut stats = MirrorStats::default();
    let mut keep: HashSet<PathBuf> = HashSet::new();

    ensure_dir(dest)?;

    for entry in WalkDir::new(src)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry?;
        let rel = relative(src, entry.path())?;
        let target = dest.join(&rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            ensure_dir(&target)?;
        } else if file_type.is_symlink() {
            mirror_symlink(entry.path(), &target)?;
            stats.linked += 1;
        } else if is_same_file(entry.path(), &target) {
            stats.unchanged += 1;
        } else {
            remove_any(&target)?;
            match fs::hard_link(entry.path(), &target) {
                Ok(()) => stats.linked += 1,
                Err(e) => {
                    trace!("hard link {} failed ({}), copying", target.display(), e);
                    copy_preserving_mtime(entry.path(), &target)?;
                    stats.copied += 1;
                }
            }
        }

        keep.insert(rel);
    }

    let mut extraneous = Vec::new();
    let mut walk = WalkDir::new(dest)
        .min_depth(1)
        .follow_links(false)
        .into_iter();
    while let Some(entry) = walk.next() {
        let entry = entry?;
        let rel = relative(dest, entry.path())?;
        if keep.contains(&rel) {
            continue;
        }
        if entry.file_type().is_dir() {
            walk.skip_current_dir();
        }
        extraneous.push(entry.into_path());
    }

    for path in extraneous {
        debug!("Removing {} (not in cache)", path.display());
        remove_any(&path)?;
        stats.removed += 1;
    }

    Ok(stats)
}

fn relative(root: &Path, path: &Path) -> LedgerOpsResult<PathBuf> {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .map_err(|_| LedgerOpsError::Internal(format!("{} escaped {}", path.display(), root.display())))
}

/// Create `dir`, replacing a non-directory squatting on the path
fn ensure_dir(dir: &Path) -> LedgerOpsResult<()> {
    if let Ok(metadata) = fs::symlink_metadata(dir) {
        if metadata.is_dir() {
            return Ok(());
        }
        remove_any(dir)?;
    }
    fs::create_dir_all(dir)
        .map_err(|e| LedgerOpsError::io(format!("creating directory {}", dir.display()), e))
}

/// Remove whatever is at `path`; a missing path is fine
fn remove_any(path: &Path) -> LedgerOpsResult<()> {
    let result = match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => Err(e),
    };
    result.map_err(|e| LedgerOpsError::io(format!("removing {}", path.display()), e))
}

/// Same inode, or same size and modification time
fn is_same_file(src: &Path, dest: &Path) -> bool {
    let (Ok(a), Ok(b)) = (fs::symlink_metadata(src), fs::symlink_metadata(dest)) else {
        return false;
    };
    if !b.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        if a.dev() == b.dev() && a.ino() == b.ino() {
            return true;
        }
    }

    a.len() == b.len()
        && matches!((a.modified(), b.modified()), (Ok(x), Ok(y)) if x == y)
}

fn copy_preserving_mtime(src: &Path, dest: &Path) -> LedgerOpsResult<()> {
    let io_err = |e| LedgerOpsError::io(format!("copying {} to {}", src.display(), dest.display()), e);

    fs::copy(src, dest).map_err(io_err)?;
    let modified = fs::metadata(src).and_then(|m| m.modified()).map_err(io_err)?;
    fs::File::options()
        .write(true)
        .open(dest)
        .and_then(|f| f.set_modified(modified))
        .map_err(io_err)
}

#[cfg(unix)]
fn mirror_symlink(src: &Path, dest: &Path) -> LedgerOpsResult<()> {
    let link = fs::read_link(src)
        .map_err(|e| LedgerOpsError::io(format!("reading link {}", src.display()), e))?;
    if fs::read_link(dest).ok().as_ref() == Some(&link) {
        return Ok(());
    }
    remove_any(dest)?;
    std::os::unix::fs::symlink(&link, dest)
        .map_err(|e| LedgerOpsError::io(format!("creating link {}", dest.display()), e))
}

#[cfg(not(unix))]
fn mirror_symlink(src: &Path, dest: &Path) -> LedgerOpsResult<()> {
    remove_any(dest)?;
    fs::copy(src, dest)
        .map(|_| ())
        .map_err(|e| LedgerOpsError::io(format!("copying {}", src.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn file_set(root: &Path) -> BTreeSet<PathBuf> {
        WalkDir::new(root)
            .min_depth(1)
            .into_iter()
            .map(|e| e.unwrap().path().strip_prefix(root).unwrap().to_path_buf())
            .collect()
    }

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn mirrors_into_missing_destination() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("cache/target");
        let dest = temp.path().join("work/target");
        write(&src.join("release/deps/libfoo.rlib"), "rlib");
        write(&src.join("release/.fingerprint/foo/hash"), "fp");

        let stats = mirror_with_links(&src, &dest).unwrap();

        assert_eq!(file_set(&dest), file_set(&src));
        assert_eq!(stats.linked + stats.copied, 2);
        assert_eq!(fs::read_to_string(dest.join("release/deps/libfoo.rlib")).unwrap(), "rlib");
    }

    #[test]
    fn removes_entries_missing_from_source() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dest = temp.path().join("dest");
        write(&src.join("keep"), "k");
        write(&dest.join("keep"), "old");
        write(&dest.join("stale/nested/file"), "x");
        write(&dest.join("stale-file"), "x");

        let stats = mirror_with_links(&src, &dest).unwrap();

        assert_eq!(file_set(&dest), file_set(&src));
        assert_eq!(fs::read_to_string(dest.join("keep")).unwrap(), "k");
        assert_eq!(stats.removed, 2);
    }

    #[cfg(unix)]
    #[test]
    fn links_share_inodes_and_rerun_is_noop() {
        use std::os::unix::fs::MetadataExt;

        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dest = temp.path().join("dest");
        write(&src.join("a/b"), "data");

        mirror_with_links(&src, &dest).unwrap();
        let src_ino = fs::metadata(src.join("a/b")).unwrap().ino();
        assert_eq!(fs::metadata(dest.join("a/b")).unwrap().ino(), src_ino);

        let stats = mirror_with_links(&src, &dest).unwrap();
        assert_eq!(
            stats,
            MirrorStats {
                unchanged: 1,
                ..MirrorStats::default()
            }
        );
    }

    #[test]
    fn file_replaced_by_directory_and_back() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dest = temp.path().join("dest");
        write(&src.join("x/inner"), "i");
        write(&dest.join("x"), "was a file");

        mirror_with_links(&src, &dest).unwrap();
        assert!(dest.join("x").is_dir());

        fs::remove_dir_all(src.join("x")).unwrap();
        write(&src.join("x"), "file again");
        mirror_with_links(&src, &dest).unwrap();
        assert_eq!(fs::read_to_string(dest.join("x")).unwrap(), "file again");
    }

    #[test]
    fn empty_source_empties_destination() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        let dest = temp.path().join("dest");
        write(&dest.join("debug/old"), "x");

        mirror_with_links(&src, &dest).unwrap();

        assert!(dest.is_dir());
        assert!(file_set(&dest).is_empty());
    }
}
