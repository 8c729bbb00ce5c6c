//! Contracts for the collaborators the capturer consults.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use crate::entry::{BundleKind, FileMeta};

/// Decides, from a file name alone, whether it owns a bundle and whether it is content.
///
/// Implementations must be pure and total: the same name always yields the
/// same answer.
pub trait FilenameClassifier: Send + Sync {
    /// Returns `(bundle kind owned by this name, is content file)`.
    fn classify(&self, name: &str) -> (BundleKind, bool);
}

/// Decides whether a path is excluded from the capture.
pub trait IgnoreMatcher: Send + Sync {
    /// Check if `path` should be skipped.
    fn ignored(&self, path: &Path) -> bool;
}

/// Storage abstraction over absolute paths.
pub trait Fs: Send + Sync {
    /// Names of the entries directly inside `dir`.
    fn read_dir_names(&self, dir: &Path) -> io::Result<Vec<OsString>>;

    /// Stat `path` without following a final symlink.
    fn symlink_metadata(&self, path: &Path) -> io::Result<FileMeta>;

    /// Fully dereference all symlinks in `path`.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}

/// What an incremental change tracker knows about a changed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    /// Directory owning the changed path.
    pub dir: PathBuf,
    /// Path to re-capture: a bundle directory, or the file itself.
    pub path: PathBuf,
    /// What the path was (or now is) part of.
    pub kind: BundleKind,
}

/// Incremental change tracker fed by a file watcher.
pub trait ChangeTracker: Send + Sync {
    /// Resolve a changed path to what must be re-captured, draining any record of it.
    fn resolve_and_remove(&self, path: &Path) -> ChangeRecord;

    /// Record that changes under `from` should be treated as changes under `to`.
    fn add_symbolic_link_mapping(&self, from: &Path, to: &Path);
}
