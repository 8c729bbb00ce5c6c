//! Tracking of known bundles for incremental (partial) capture.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use tracing::debug;

use bundlewalk_core::{BundleKind, ChangeRecord, ChangeTracker, FilenameClassifier};

use crate::aggregate::BundleGroup;
use crate::handler::{Capabilities, CaptureHandler};

/// Remembers bundle directories seen by a full capture and symlink mappings,
/// so a changed path can be mapped to what must be re-captured.
///
/// Attach it to a full capture both as change tracker (to record symlinks)
/// and as a handler (to record bundles).
pub struct ContentChangeMap {
    classifier: Arc<dyn FilenameClassifier>,
    leafs: DashSet<PathBuf>,
    branches: DashSet<PathBuf>,
    symlinks: DashMap<PathBuf, Vec<PathBuf>>,
}

impl ContentChangeMap {
    /// Create an empty map using `classifier` for changed file names.
    pub fn new(classifier: Arc<dyn FilenameClassifier>) -> Self {
        Self {
            classifier,
            leafs: DashSet::new(),
            branches: DashSet::new(),
            symlinks: DashMap::new(),
        }
    }

    /// Record a bundle directory.
    pub fn add_bundle(&self, dir: impl Into<PathBuf>, kind: BundleKind) {
        let dir = dir.into();
        match kind {
            BundleKind::Leaf => {
                self.leafs.insert(dir);
            }
            BundleKind::Branch => {
                self.branches.insert(dir);
            }
            BundleKind::Not => {}
        }
    }

    /// Check if `dir` is a known bundle of `kind`.
    pub fn contains(&self, dir: &Path, kind: BundleKind) -> bool {
        match kind {
            BundleKind::Leaf => self.leafs.contains(dir),
            BundleKind::Branch => self.branches.contains(dir),
            BundleKind::Not => false,
        }
    }

    /// Paths that changes under `from` map to.
    pub fn symlink_targets(&self, from: &Path) -> Vec<PathBuf> {
        self.symlinks
            .get(from)
            .map(|targets| targets.value().clone())
            .unwrap_or_default()
    }

    /// Map a path under a recorded symlink target back to the path the walk sees.
    fn translate(&self, path: &Path) -> PathBuf {
        let best = self
            .symlinks
            .iter()
            .filter(|mapping| path.starts_with(mapping.key()))
            .max_by_key(|mapping| mapping.key().components().count())
            .and_then(|mapping| {
                let from = mapping.key();
                // A self-mapped directory lives inside the content dir and is walked as is.
                let to = mapping
                    .value()
                    .iter()
                    .find(|to| *to == from)
                    .or_else(|| mapping.value().first())?;
                let rest = path.strip_prefix(from).ok()?;
                Some(if rest.as_os_str().is_empty() {
                    to.clone()
                } else {
                    to.join(rest)
                })
            });
        best.unwrap_or_else(|| path.to_path_buf())
    }

    fn take_leaf_containing(&self, dir: &Path) -> Option<PathBuf> {
        let leaf = self
            .leafs
            .iter()
            .filter(|leaf| dir.starts_with(leaf.key()))
            .max_by_key(|leaf| leaf.key().components().count())
            .map(|leaf| leaf.key().clone())?;
        self.leafs.remove(&leaf)
    }
}

impl ChangeTracker for ContentChangeMap {
    fn resolve_and_remove(&self, path: &Path) -> ChangeRecord {
        let path = self.translate(path);
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (kind, is_content) = self.classifier.classify(&name);

        // Branch bundles are the most specific: only their own flat files.
        if kind == BundleKind::Branch || (kind == BundleKind::Not && !is_content) {
            if let Some(branch) = self.branches.remove(&dir) {
                debug!("{} changed in branch bundle {}", path.display(), branch.display());
                return ChangeRecord {
                    dir,
                    path: branch,
                    kind: BundleKind::Branch,
                };
            }
        }

        // A leaf bundle owns everything below it.
        if let Some(leaf) = self.take_leaf_containing(&dir) {
            debug!("{} changed in leaf bundle {}", path.display(), leaf.display());
            return ChangeRecord {
                dir,
                path: leaf,
                kind: BundleKind::Leaf,
            };
        }

        if is_content && kind.is_bundle() {
            debug!("{} starts a new {kind} bundle", path.display());
            return ChangeRecord {
                path: dir.clone(),
                dir,
                kind,
            };
        }

        ChangeRecord {
            dir,
            path,
            kind: BundleKind::Not,
        }
    }

    fn add_symbolic_link_mapping(&self, from: &Path, to: &Path) {
        let mut targets = self.symlinks.entry(from.to_path_buf()).or_default();
        if !targets.iter().any(|t| t == to) {
            targets.push(to.to_path_buf());
        }
    }
}

impl CaptureHandler for ContentChangeMap {
    fn capabilities(&self) -> Capabilities {
        Capabilities::BUNDLES_ONLY
    }

    fn handle_bundle(&self, bundle: Arc<BundleGroup>) {
        if let Some(dir) = bundle.dir() {
            self.add_bundle(dir, bundle.kind());
        }
    }
}
