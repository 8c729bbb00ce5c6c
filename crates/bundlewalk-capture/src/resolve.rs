//! Symlink-aware path resolution with cycle detection.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashSet;
use tracing::{debug, warn};

use bundlewalk_core::{CaptureError, ChangeTracker, FileMeta, Fs, Result};

/// A path after symlink dereferencing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Metadata of the real, dereferenced object.
    pub meta: FileMeta,
    /// Real path; equal to the input for anything that is not a symlink.
    pub real_path: PathBuf,
}

/// Resolves paths to their real location for one capture pass.
///
/// A directory reached through a symlink is only entered once per pass, and
/// never when it is an ancestor of the link itself. Such directories resolve
/// to [`CaptureError::CyclicDir`], which callers skip.
pub struct PathResolver<'a> {
    fs: &'a dyn Fs,
    // Canonical form, comparable with dereferenced symlink targets.
    real_base: PathBuf,
    changes: Option<&'a dyn ChangeTracker>,
    // Canonical directories entered through a symlink; insert is the check.
    seen: DashSet<PathBuf>,
    cyclic_skipped: AtomicU64,
}

impl<'a> PathResolver<'a> {
    /// Create a resolver with a fresh seen-set for the content dir `base_dir`.
    pub fn new(fs: &'a dyn Fs, base_dir: &Path, changes: Option<&'a dyn ChangeTracker>) -> Self {
        let real_base = fs.canonicalize(base_dir).unwrap_or_else(|err| {
            debug!("Cannot canonicalize content dir {}: {err}", base_dir.display());
            base_dir.to_path_buf()
        });
        Self {
            fs,
            real_base,
            changes,
            seen: DashSet::new(),
            cyclic_skipped: AtomicU64::new(0),
        }
    }

    /// Number of cyclic directories skipped so far.
    pub fn cyclic_skipped(&self) -> u64 {
        self.cyclic_skipped.load(Ordering::Relaxed)
    }

    /// Stat `path`, dereferencing it if it is a symlink.
    pub fn resolve(&self, path: &Path) -> Result<Resolved> {
        let meta = self
            .fs
            .symlink_metadata(path)
            .map_err(|e| CaptureError::io(path, e))?;

        if !meta.is_symlink {
            return Ok(Resolved {
                meta,
                real_path: path.to_path_buf(),
            });
        }

        let real_path = self
            .fs
            .canonicalize(path)
            .map_err(|source| CaptureError::BrokenSymlink {
                link: path.to_path_buf(),
                source,
            })?;

        let meta = self
            .fs
            .symlink_metadata(&real_path)
            .map_err(|source| CaptureError::SymlinkStat {
                link: path.to_path_buf(),
                target: real_path.clone(),
                source,
            })?;

        if real_path != path && meta.is_dir && self.is_cyclic(path, &real_path) {
            self.cyclic_skipped.fetch_add(1, Ordering::Relaxed);
            warn!(
                "Content dir {} already processed; skipped {} to avoid infinite recursion",
                real_path.display(),
                path.display()
            );
            return Err(CaptureError::CyclicDir { path: real_path });
        }

        if let Some(changes) = self.changes {
            if meta.is_dir && real_path.starts_with(&self.real_base) {
                // Links inside the content dir keep a reference to both locations.
                changes.add_symbolic_link_mapping(&real_path, &real_path);
            }
            changes.add_symbolic_link_mapping(&real_path, path);
        }

        Ok(Resolved { meta, real_path })
    }

    fn is_cyclic(&self, link: &Path, real_dir: &Path) -> bool {
        let points_at_ancestor = link
            .parent()
            .and_then(|parent| match self.fs.canonicalize(parent) {
                Ok(real_parent) => Some(real_parent),
                Err(err) => {
                    debug!("Cannot canonicalize {}: {err}", parent.display());
                    None
                }
            })
            .is_some_and(|real_parent| real_parent.starts_with(real_dir));

        // Marks even when pointing at an ancestor, so later links to it are skipped too.
        let first_visit = self.seen.insert(real_dir.to_path_buf());
        points_at_ancestor || !first_visit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::OsFs;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_plain_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.md");
        fs::write(&file, "hello").unwrap();

        let resolver = PathResolver::new(&OsFs, temp.path(), None);
        let resolved = resolver.resolve(&file).unwrap();
        assert_eq!(resolved.real_path, file);
        assert!(!resolved.meta.is_dir);
        assert_eq!(resolved.meta.size, 5);
    }

    #[test]
    fn test_resolve_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let resolver = PathResolver::new(&OsFs, temp.path(), None);
        let err = resolver.resolve(&temp.path().join("gone.md")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[cfg(unix)]
    #[test]
    fn test_broken_symlink_is_reported() {
        let temp = TempDir::new().unwrap();
        let link = temp.path().join("dangling");
        std::os::unix::fs::symlink(temp.path().join("nowhere"), &link).unwrap();

        let resolver = PathResolver::new(&OsFs, temp.path(), None);
        let err = resolver.resolve(&link).unwrap_err();
        assert!(matches!(err, CaptureError::BrokenSymlink { .. }));
        assert!(!err.is_skippable());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_to_ancestor_is_cyclic() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let blog = root.join("blog");
        fs::create_dir(&blog).unwrap();
        std::os::unix::fs::symlink(&blog, blog.join("loop")).unwrap();

        let resolver = PathResolver::new(&OsFs, &root, None);
        let err = resolver.resolve(&blog.join("loop")).unwrap_err();
        assert!(matches!(err, CaptureError::CyclicDir { .. }));
        assert!(err.is_skippable());
        assert_eq!(resolver.cyclic_skipped(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_second_link_to_same_dir_is_skipped() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let shared = root.join("shared");
        fs::create_dir(&shared).unwrap();
        fs::create_dir(root.join("a")).unwrap();
        fs::create_dir(root.join("b")).unwrap();
        std::os::unix::fs::symlink(&shared, root.join("a/link")).unwrap();
        std::os::unix::fs::symlink(&shared, root.join("b/link")).unwrap();

        let resolver = PathResolver::new(&OsFs, &root, None);
        let first = resolver.resolve(&root.join("a/link")).unwrap();
        assert_eq!(first.real_path, shared);
        assert!(first.meta.is_dir);

        let second = resolver.resolve(&root.join("b/link")).unwrap_err();
        assert!(matches!(second, CaptureError::CyclicDir { .. }));
    }

    #[derive(Default)]
    struct RecordingTracker {
        mappings: std::sync::Mutex<Vec<(PathBuf, PathBuf)>>,
    }

    impl ChangeTracker for RecordingTracker {
        fn resolve_and_remove(&self, path: &Path) -> bundlewalk_core::ChangeRecord {
            bundlewalk_core::ChangeRecord {
                dir: path.parent().unwrap_or(path).to_path_buf(),
                path: path.to_path_buf(),
                kind: bundlewalk_core::BundleKind::Not,
            }
        }

        fn add_symbolic_link_mapping(&self, from: &Path, to: &Path) {
            self.mappings
                .lock()
                .unwrap()
                .push((from.to_path_buf(), to.to_path_buf()));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_concurrent_resolve_enters_shared_dir_once() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let shared = root.join("shared");
        fs::create_dir(&shared).unwrap();
        let links: Vec<PathBuf> = (0..8)
            .map(|i| {
                let link = root.join(format!("link{i}"));
                std::os::unix::fs::symlink(&shared, &link).unwrap();
                link
            })
            .collect();

        let resolver = PathResolver::new(&OsFs, &root, None);
        let shared_resolver = &resolver;
        let entered = std::thread::scope(|s| {
            let handles: Vec<_> = links
                .iter()
                .map(|link| s.spawn(move || shared_resolver.resolve(link).is_ok()))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });

        assert_eq!(entered, 1);
        assert_eq!(resolver.cyclic_skipped(), 7);
    }

    #[cfg(unix)]
    #[test]
    fn test_in_tree_link_maps_both_locations() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let real = root.join("real");
        fs::create_dir(&real).unwrap();
        std::os::unix::fs::symlink(&real, root.join("link")).unwrap();

        let tracker = RecordingTracker::default();
        let resolver = PathResolver::new(&OsFs, &root, Some(&tracker));
        resolver.resolve(&root.join("link")).unwrap();

        let mappings = tracker.mappings.lock().unwrap();
        assert_eq!(
            *mappings,
            vec![(real.clone(), real.clone()), (real, root.join("link"))]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_outside_link_maps_only_link() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let site = root.join("site");
        let outside = root.join("outside");
        fs::create_dir(&site).unwrap();
        fs::create_dir(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, site.join("a")).unwrap();

        let tracker = RecordingTracker::default();
        let resolver = PathResolver::new(&OsFs, &site, Some(&tracker));
        resolver.resolve(&site.join("a")).unwrap();

        let mappings = tracker.mappings.lock().unwrap();
        assert_eq!(*mappings, vec![(outside, site.join("a"))]);
    }

    #[cfg(unix)]
    #[test]
    fn test_base_behind_symlinked_prefix_is_canonical() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().canonicalize().unwrap();
        let site = root.join("site");
        let real = site.join("real");
        fs::create_dir_all(&real).unwrap();
        std::os::unix::fs::symlink(&real, site.join("link")).unwrap();
        std::os::unix::fs::symlink(&site, root.join("alias")).unwrap();

        // Content dir given through a symlinked parent.
        let alias = root.join("alias");
        let tracker = RecordingTracker::default();
        let resolver = PathResolver::new(&OsFs, &alias, Some(&tracker));
        resolver.resolve(&alias.join("link")).unwrap();

        let mappings = tracker.mappings.lock().unwrap();
        assert!(mappings.contains(&(real.clone(), real.clone())));
        assert!(mappings.contains(&(real, alias.join("link"))));
    }
}
