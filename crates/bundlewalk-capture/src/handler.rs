//! Capture result handlers and the fan-out chain.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::trace;

use bundlewalk_core::{BundleKind, Entry};

use crate::aggregate::BundleGroup;

/// Which dispatch calls a handler accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Accepts independent content files.
    pub singles: bool,
    /// Accepts plain files to copy as-is.
    pub copy_files: bool,
    /// Accepts finished bundles.
    pub bundles: bool,
}

impl Capabilities {
    /// Accepts nothing.
    pub const NONE: Self = Self {
        singles: false,
        copy_files: false,
        bundles: false,
    };

    /// Accepts every kind of result.
    pub const ALL: Self = Self {
        singles: true,
        copy_files: true,
        bundles: true,
    };

    /// Accepts bundles only.
    pub const BUNDLES_ONLY: Self = Self {
        singles: false,
        copy_files: false,
        bundles: true,
    };

    fn union(self, other: Self) -> Self {
        Self {
            singles: self.singles || other.singles,
            copy_files: self.copy_files || other.copy_files,
            bundles: self.bundles || other.bundles,
        }
    }
}

/// Downstream consumer of captured results.
///
/// Handlers are called concurrently from several workers and must do their
/// own synchronization.
pub trait CaptureHandler: Send + Sync {
    /// Calls this handler accepts. Read once, when the handler joins a chain.
    fn capabilities(&self) -> Capabilities {
        Capabilities::ALL
    }

    /// Independent content files.
    fn handle_singles(&self, _entries: &[Entry]) {}

    /// Plain files to copy as-is.
    fn handle_copy_files(&self, _filenames: &[PathBuf]) {}

    /// A finished bundle, with every language variant.
    fn handle_bundle(&self, _bundle: Arc<BundleGroup>) {}
}

/// Forwards every result to each registered handler that accepts it, in
/// registration order.
#[derive(Clone, Default)]
pub struct HandlerChain {
    handlers: Vec<(Arc<dyn CaptureHandler>, Capabilities)>,
}

impl HandlerChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler; its capabilities are resolved now.
    pub fn with(mut self, handler: Arc<dyn CaptureHandler>) -> Self {
        self.push(handler);
        self
    }

    /// Add a handler; its capabilities are resolved now.
    pub fn push(&mut self, handler: Arc<dyn CaptureHandler>) {
        let caps = handler.capabilities();
        self.handlers.push((handler, caps));
    }
}

impl CaptureHandler for HandlerChain {
    fn capabilities(&self) -> Capabilities {
        self.handlers
            .iter()
            .fold(Capabilities::NONE, |acc, (_, caps)| acc.union(*caps))
    }

    fn handle_singles(&self, entries: &[Entry]) {
        trace!(count = entries.len(), "dispatching singles");
        for (handler, caps) in &self.handlers {
            if caps.singles {
                handler.handle_singles(entries);
            }
        }
    }

    fn handle_copy_files(&self, filenames: &[PathBuf]) {
        trace!(count = filenames.len(), "dispatching copy files");
        for (handler, caps) in &self.handlers {
            if caps.copy_files {
                handler.handle_copy_files(filenames);
            }
        }
    }

    fn handle_bundle(&self, bundle: Arc<BundleGroup>) {
        trace!(kind = %bundle.kind(), dir = ?bundle.dir(), "dispatching bundle");
        for (handler, caps) in &self.handlers {
            if caps.bundles {
                handler.handle_bundle(Arc::clone(&bundle));
            }
        }
    }
}

/// Counts of what a capture produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaptureSummary {
    /// Independent content files.
    pub singles: usize,
    /// Plain files to copy.
    pub copy_files: usize,
    /// Leaf bundles.
    pub leaf_bundles: usize,
    /// Branch bundles.
    pub branch_bundles: usize,
    /// Bundle resources across all bundles and languages.
    pub bundle_resources: usize,
}

/// Handler that keeps everything it receives.
#[derive(Debug, Default)]
pub struct CollectingHandler {
    singles: Mutex<Vec<Entry>>,
    copy_files: Mutex<Vec<PathBuf>>,
    bundles: Mutex<Vec<Arc<BundleGroup>>>,
}

impl CollectingHandler {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Singles received so far, sorted by path.
    pub fn singles(&self) -> Vec<Entry> {
        let mut singles = lock(&self.singles).clone();
        singles.sort_by(|a, b| a.path.cmp(&b.path));
        singles
    }

    /// Copy files received so far, sorted.
    pub fn copy_files(&self) -> Vec<PathBuf> {
        let mut files = lock(&self.copy_files).clone();
        files.sort();
        files
    }

    /// Bundles received so far, sorted by directory.
    pub fn bundles(&self) -> Vec<Arc<BundleGroup>> {
        let mut bundles = lock(&self.bundles).clone();
        bundles.sort_by(|a, b| a.dir().cmp(&b.dir()));
        bundles
    }

    /// Summarize what was received.
    pub fn summary(&self) -> CaptureSummary {
        let bundles = lock(&self.bundles);
        let count_kind = |kind: BundleKind| bundles.iter().filter(|b| b.kind() == kind).count();
        CaptureSummary {
            singles: lock(&self.singles).len(),
            copy_files: lock(&self.copy_files).len(),
            leaf_bundles: count_kind(BundleKind::Leaf),
            branch_bundles: count_kind(BundleKind::Branch),
            bundle_resources: bundles
                .iter()
                .flat_map(|b| b.iter().map(|(_, dir)| dir.resources.len()))
                .sum(),
        }
    }

    /// Forget everything received.
    pub fn clear(&self) {
        lock(&self.singles).clear();
        lock(&self.copy_files).clear();
        lock(&self.bundles).clear();
    }
}

impl CaptureHandler for CollectingHandler {
    fn handle_singles(&self, entries: &[Entry]) {
        lock(&self.singles).extend_from_slice(entries);
    }

    fn handle_copy_files(&self, filenames: &[PathBuf]) {
        lock(&self.copy_files).extend_from_slice(filenames);
    }

    fn handle_bundle(&self, bundle: Arc<BundleGroup>) {
        lock(&self.bundles).push(bundle);
    }
}

// A panicking handler call leaves the vectors consistent; keep collecting.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundlewalk_core::{FileMeta, FileName};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct BundleCounter {
        bundles: AtomicUsize,
    }

    impl CaptureHandler for BundleCounter {
        fn capabilities(&self) -> Capabilities {
            Capabilities::BUNDLES_ONLY
        }

        fn handle_singles(&self, _entries: &[Entry]) {
            panic!("bundle-only handler received singles");
        }

        fn handle_bundle(&self, _bundle: Arc<BundleGroup>) {
            self.bundles.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn single(path: &str) -> Entry {
        let name = Path::new(path).file_name().unwrap().to_str().unwrap();
        Entry::new(
            Path::new("/c"),
            path,
            FileMeta::file(1),
            BundleKind::Not,
            true,
            FileName::parse(name, &[]),
            "en",
        )
    }

    #[test]
    fn test_chain_skips_unsupported_capabilities() {
        let collector = Arc::new(CollectingHandler::new());
        let counter = Arc::new(BundleCounter::default());
        let chain = HandlerChain::new()
            .with(counter.clone())
            .with(collector.clone());

        chain.handle_singles(&[single("/c/a.md")]);
        chain.handle_copy_files(&[PathBuf::from("/c/logo.png")]);
        chain.handle_bundle(Arc::new(BundleGroup::new(BundleKind::Leaf, "en")));

        assert_eq!(counter.bundles.load(Ordering::SeqCst), 1);
        let summary = collector.summary();
        assert_eq!(summary.singles, 1);
        assert_eq!(summary.copy_files, 1);
        assert_eq!(summary.leaf_bundles, 1);
    }

    #[test]
    fn test_chain_capabilities_union() {
        let bundles_only = HandlerChain::new().with(Arc::new(BundleCounter::default()));
        assert_eq!(bundles_only.capabilities(), Capabilities::BUNDLES_ONLY);

        let chain = bundles_only.with(Arc::new(CollectingHandler::new()));
        assert_eq!(chain.capabilities(), Capabilities::ALL);
    }

    #[test]
    fn test_empty_chain_accepts_nothing() {
        let empty = HandlerChain::new();
        assert_eq!(empty.capabilities(), Capabilities::NONE);

        // Nested into another chain, it is never called.
        let outer = HandlerChain::new().with(Arc::new(empty));
        assert_eq!(outer.capabilities(), Capabilities::NONE);
        outer.handle_bundle(Arc::new(BundleGroup::new(BundleKind::Leaf, "en")));
    }

    #[test]
    fn test_collector_sorts_and_clears() {
        let collector = CollectingHandler::new();
        collector.handle_singles(&[single("/c/b.md"), single("/c/a.md")]);

        let singles = collector.singles();
        assert_eq!(singles[0].path, PathBuf::from("/c/a.md"));

        collector.clear();
        assert_eq!(collector.summary(), CaptureSummary::default());
    }
}
