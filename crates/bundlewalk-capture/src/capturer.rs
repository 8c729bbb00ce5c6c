//! Recursive content capture.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use compact_str::CompactString;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use tracing::{debug, trace};

use bundlewalk_core::{
    BundleKind, CaptureConfig, CaptureError, ChangeRecord, ChangeTracker, Entry, FileMeta,
    FileName, FilenameClassifier, Fs, IgnoreMatcher, Result,
};

use crate::aggregate::BundleGroup;
use crate::classify::{ContentClassifier, DirClassification, DirState};
use crate::fs::OsFs;
use crate::handler::{CaptureHandler, HandlerChain};
use crate::ignore::GlobIgnore;
use crate::resolve::PathResolver;
use crate::slots::WorkerSlots;

/// Statistics of one capture pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaptureStats {
    /// Directory listings read.
    pub dirs_read: u64,
    /// Highest number of nested-directory workers active at once.
    pub peak_workers: usize,
    /// Nested directories handled on the caller's thread because no slot was free.
    pub sync_fallbacks: u64,
    /// Symlinked directories skipped to avoid cycles.
    pub cyclic_skipped: u64,
    /// Wall time of the pass.
    pub duration: Duration,
}

/// Walks a content directory and dispatches pages, bundles and plain files to
/// a [`HandlerChain`].
///
/// Every call to [`capture`](Self::capture) runs a fresh pass with its own
/// seen-set and worker slots, so repeated captures share no walk state.
pub struct Capturer {
    base_dir: PathBuf,
    default_lang: CompactString,
    languages: Vec<String>,
    filenames: Vec<PathBuf>,
    workers: usize,
    fs: Arc<dyn Fs>,
    classifier: Arc<dyn FilenameClassifier>,
    ignore: Arc<dyn IgnoreMatcher>,
    changes: Option<Arc<dyn ChangeTracker>>,
    handler: HandlerChain,
    pool: ThreadPool,
}

impl Capturer {
    /// Create a capturer using the local filesystem and the default classifier.
    pub fn new(config: &CaptureConfig, handler: HandlerChain) -> Result<Self> {
        let workers = config.worker_count();
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("bundlewalk-capture-{i}"))
            .build()
            .map_err(|e| CaptureError::InvalidConfig {
                message: format!("cannot start worker pool: {e}"),
            })?;

        Ok(Self {
            base_dir: config.content_dir.clone(),
            default_lang: config.default_content_language.as_str().into(),
            languages: config.all_languages(),
            filenames: config.filenames.clone(),
            workers,
            fs: Arc::new(OsFs),
            classifier: Arc::new(ContentClassifier),
            ignore: Arc::new(GlobIgnore::new(&config.ignore_patterns)?),
            changes: None,
            handler,
            pool,
        })
    }

    /// Use another storage backend.
    pub fn with_fs(mut self, fs: Arc<dyn Fs>) -> Self {
        self.fs = fs;
        self
    }

    /// Use another file-name classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn FilenameClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Use another ignore matcher.
    pub fn with_ignore(mut self, ignore: Arc<dyn IgnoreMatcher>) -> Self {
        self.ignore = ignore;
        self
    }

    /// Attach an incremental change tracker.
    pub fn with_change_tracker(mut self, changes: Arc<dyn ChangeTracker>) -> Self {
        self.changes = Some(changes);
        self
    }

    /// Run a capture: partial when the config named changed files, full otherwise.
    pub fn capture(&self) -> Result<CaptureStats> {
        if !self.filenames.is_empty() {
            return self.capture_partial(&self.filenames);
        }

        let start = Instant::now();
        let pass = Pass::new(self, self.workers);

        let root = pass.resolver.resolve(&self.base_dir)?;
        if !root.meta.is_dir {
            return Err(CaptureError::NotADirectory {
                path: self.base_dir.clone(),
            });
        }

        pass.handle_dir(&self.base_dir)?;
        Ok(pass.finish(start))
    }

    /// Re-capture only what the given changed paths affect.
    ///
    /// Runs on the calling thread. Each path is resolved through the change
    /// tracker; repeated targets within one batch are handled once, and paths
    /// that no longer exist are skipped.
    pub fn capture_partial(&self, filenames: &[PathBuf]) -> Result<CaptureStats> {
        let start = Instant::now();
        let pass = Pass::new(self, 0);
        let mut handled: HashSet<PathBuf> = HashSet::new();

        for filename in filenames {
            if self.ignore.ignored(filename) {
                continue;
            }

            let record = match self.changes.as_deref() {
                Some(changes) => changes.resolve_and_remove(filename),
                None => ChangeRecord {
                    dir: filename.parent().map(Path::to_path_buf).unwrap_or_default(),
                    path: filename.clone(),
                    kind: BundleKind::Not,
                },
            };
            if !handled.insert(record.path.clone()) {
                continue;
            }

            debug!("Partial capture of {} as {}", record.path.display(), record.kind);
            let result = match record.kind {
                BundleKind::Leaf => pass.handle_dir(&record.path),
                BundleKind::Branch => pass.handle_branch_dir(&record.path),
                BundleKind::Not => pass.handle_changed_file(&record),
            };
            match result {
                Err(err) if err.is_not_found() => {
                    debug!("{} no longer exists; skipped", record.path.display());
                }
                other => other?,
            }
        }

        Ok(pass.finish(start))
    }
}

/// Base name used for classification, with invalid UTF-8 replaced.
fn file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// A directory entry after symlink resolution.
struct Listed {
    path: PathBuf,
    name: String,
    meta: FileMeta,
}

impl Listed {
    fn new(path: PathBuf, meta: FileMeta) -> Self {
        let name = file_name_lossy(&path);
        Self { path, name, meta }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Singles and copy files gathered before dispatch.
#[derive(Default)]
struct Batch {
    singles: Vec<Entry>,
    copy_files: Vec<PathBuf>,
}

impl Batch {
    fn push(&mut self, entry: Entry) {
        if entry.is_content {
            self.singles.push(entry);
        } else {
            self.copy_files.push(entry.path);
        }
    }

    fn flush(self, handler: &HandlerChain) {
        if !self.singles.is_empty() {
            handler.handle_singles(&self.singles);
        }
        if !self.copy_files.is_empty() {
            handler.handle_copy_files(&self.copy_files);
        }
    }
}

/// State of one capture pass.
struct Pass<'a> {
    capturer: &'a Capturer,
    resolver: PathResolver<'a>,
    slots: WorkerSlots,
    dirs_read: AtomicU64,
    sync_fallbacks: AtomicU64,
}

impl<'a> Pass<'a> {
    fn new(capturer: &'a Capturer, workers: usize) -> Self {
        Self {
            capturer,
            resolver: PathResolver::new(
                capturer.fs.as_ref(),
                &capturer.base_dir,
                capturer.changes.as_deref(),
            ),
            slots: WorkerSlots::new(workers),
            dirs_read: AtomicU64::new(0),
            sync_fallbacks: AtomicU64::new(0),
        }
    }

    fn finish(self, start: Instant) -> CaptureStats {
        CaptureStats {
            dirs_read: self.dirs_read.load(Ordering::Relaxed),
            peak_workers: self.slots.peak(),
            sync_fallbacks: self.sync_fallbacks.load(Ordering::Relaxed),
            cyclic_skipped: self.resolver.cyclic_skipped(),
            duration: start.elapsed(),
        }
    }

    /// Handle a subdirectory on a pool worker if a slot is free, else inline.
    ///
    /// Either way this returns only once that subdirectory is done.
    fn handle_nested_dir(&self, dir: &Path) -> Result<()> {
        let Some(slot) = self.slots.try_acquire() else {
            self.sync_fallbacks.fetch_add(1, Ordering::Relaxed);
            debug!("No free worker; handling {} inline", dir.display());
            return self.handle_dir(dir);
        };

        let mut result = Ok(());
        let out = &mut result;
        self.capturer.pool.scope(move |s| {
            s.spawn(move |_| {
                let _slot = slot;
                *out = self.handle_dir(dir);
            });
        });
        result
    }

    fn handle_dir(&self, dir: &Path) -> Result<()> {
        let listing = self.read_dir(dir)?;
        let class = self.classify(&listing);

        let state = class.state;
        match state {
            DirState::AssetsOnly => return self.handle_non_bundle(listing, class, false),
            DirState::SinglesOnly => return self.handle_non_bundle(listing, class, true),
            DirState::Default => {}
        }

        let entries: Vec<Entry> = listing
            .into_iter()
            .zip(class.entries)
            .map(|(l, (kind, is_content))| self.new_entry(l.path, l.meta, kind, is_content))
            .collect();

        let todo = if class.kind == BundleKind::Leaf {
            entries
        } else {
            let mut todo = Vec::new();
            let mut batch = Batch::default();
            for entry in entries {
                if entry.is_dir() {
                    self.handle_nested_dir(&entry.path)?;
                } else if class.kind == BundleKind::Not || (!entry.is_owner() && entry.is_content)
                {
                    batch.push(entry);
                } else {
                    todo.push(entry);
                }
            }
            batch.flush(&self.capturer.handler);
            todo
        };

        if todo.is_empty() {
            return Ok(());
        }

        let group = self.create_bundle_group(todo, class.kind)?;
        self.capturer.handler.handle_bundle(Arc::new(group));
        Ok(())
    }

    /// Re-capture a known branch bundle and its flat resources only.
    ///
    /// Falls back to [`handle_dir`](Self::handle_dir) when the directory no
    /// longer looks like a branch bundle.
    fn handle_branch_dir(&self, dir: &Path) -> Result<()> {
        let listing = self.read_dir(dir)?;
        let class = self.classify(&listing);

        if class.kind != BundleKind::Branch {
            debug!(
                "{} is no longer a branch bundle ({}); handling the full directory",
                dir.display(),
                class.kind
            );
            return self.handle_dir(dir);
        }

        let files: Vec<Entry> = listing
            .into_iter()
            .zip(class.entries)
            .filter(|(l, _)| !l.meta.is_dir)
            .map(|(l, (kind, is_content))| self.new_entry(l.path, l.meta, kind, is_content))
            .collect();

        let mut group = BundleGroup::new(BundleKind::Branch, &self.capturer.default_lang);
        for header in files.iter().filter(|e| e.is_owner()) {
            group.add_header(header.clone());
        }
        for entry in files {
            if !entry.is_owner() && !entry.is_content {
                group.add_plain_resource(entry);
            }
        }

        self.capturer.handler.handle_bundle(Arc::new(group));
        Ok(())
    }

    fn handle_changed_file(&self, record: &ChangeRecord) -> Result<()> {
        let resolved = match self.resolver.resolve(&record.path) {
            Ok(resolved) => resolved,
            Err(err) if err.is_skippable() => {
                debug!("{} skipped: {err}", record.path.display());
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        // The owning dir may be a new symlink; resolving it records the mapping.
        if let Err(err) = self.resolver.resolve(&record.dir) {
            debug!("Cannot resolve {}: {err}", record.dir.display());
        }

        if resolved.meta.is_dir {
            return self.handle_dir(&record.path);
        }

        let name = file_name_lossy(&record.path);
        let (_, is_content) = self.capturer.classifier.classify(&name);

        let mut batch = Batch::default();
        batch.push(self.new_entry(record.path.clone(), resolved.meta, BundleKind::Not, is_content));
        batch.flush(&self.capturer.handler);
        Ok(())
    }

    fn handle_non_bundle(
        &self,
        listing: Vec<Listed>,
        class: DirClassification,
        singles_only: bool,
    ) -> Result<()> {
        let mut batch = Batch::default();
        let mut dirs = Vec::new();

        for (listed, (_, is_content)) in listing.into_iter().zip(class.entries) {
            if listed.meta.is_dir {
                dirs.push(listed.path);
            } else if singles_only {
                batch
                    .singles
                    .push(self.new_entry(listed.path, listed.meta, BundleKind::Not, is_content));
            } else {
                batch.copy_files.push(listed.path);
            }
        }

        batch.flush(&self.capturer.handler);
        for dir in dirs {
            self.handle_nested_dir(&dir)?;
        }
        Ok(())
    }

    fn create_bundle_group(&self, todo: Vec<Entry>, kind: BundleKind) -> Result<BundleGroup> {
        let mut group = BundleGroup::new(kind, &self.capturer.default_lang);
        let mut nested = Vec::new();

        // Headers first, so every resource finds its language's bundle.
        for entry in &todo {
            if entry.is_dir() {
                // Everything below a page bundle belongs to it.
                self.collect_files(&entry.path, &mut |e| nested.push(e))?;
            } else if entry.is_owner() {
                group.add_header(entry.clone());
            }
        }

        for entry in todo.into_iter().chain(nested) {
            if entry.is_dir() || entry.is_owner() {
                continue;
            }
            if entry.is_content {
                group.add_content_file(entry)?;
            } else {
                group.add_plain_resource(entry);
            }
        }

        Ok(group)
    }

    fn collect_files(&self, dir: &Path, collect: &mut dyn FnMut(Entry)) -> Result<()> {
        for listed in self.read_dir(dir)? {
            if listed.meta.is_dir {
                self.collect_files(&listed.path, collect)?;
            } else {
                let (_, is_content) = self.capturer.classifier.classify(listed.name());
                collect(self.new_entry(listed.path, listed.meta, BundleKind::Not, is_content));
            }
        }
        Ok(())
    }

    fn read_dir(&self, dir: &Path) -> Result<Vec<Listed>> {
        let capturer = self.capturer;
        if capturer.ignore.ignored(dir) {
            return Ok(Vec::new());
        }

        let mut names = capturer
            .fs
            .read_dir_names(dir)
            .map_err(|e| CaptureError::io(dir, e))?;
        names.sort();
        self.dirs_read.fetch_add(1, Ordering::Relaxed);

        let mut listing = Vec::with_capacity(names.len());
        for name in names {
            let path = dir.join(&name);
            if capturer.ignore.ignored(&path) {
                continue;
            }
            match self.resolver.resolve(&path) {
                Ok(resolved) => listing.push(Listed::new(path, resolved.meta)),
                // Removed since listing, or a symlink cycle.
                Err(err) if err.is_skippable() => {
                    trace!("Skipping {}: {err}", path.display());
                }
                Err(err) => return Err(err),
            }
        }
        Ok(listing)
    }

    fn classify(&self, listing: &[Listed]) -> DirClassification {
        DirClassification::classify(
            self.capturer.classifier.as_ref(),
            listing.iter().map(|l| (l.name(), l.meta.is_dir)),
        )
    }

    fn new_entry(&self, path: PathBuf, meta: FileMeta, kind: BundleKind, is_content: bool) -> Entry {
        let capturer = self.capturer;
        let name = file_name_lossy(&path);
        Entry::new(
            &capturer.base_dir,
            path,
            meta,
            kind,
            is_content,
            FileName::parse(&name, &capturer.languages),
            &capturer.default_lang,
        )
    }
}
