//! Content capture engine for bundlewalk.
//!
//! This crate walks a content directory and sorts what it finds into
//! independent pages, page bundles and section bundles.
//!
//! # Overview
//!
//! `bundlewalk-capture` is responsible for traversing the content tree and
//! dispatching results to handlers. Key features:
//!
//! - **Bounded concurrency**: subdirectories run on a rayon pool while a worker
//!   slot is free, and inline otherwise
//! - **Symlink following** with per-pass cycle detection
//! - **Multilingual bundles**: per-language headers, resource overrides and
//!   header borrowing for untranslated content
//! - **Partial capture** of changed paths via [`ContentChangeMap`]
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use bundlewalk_capture::{CaptureConfig, Capturer, CollectingHandler, HandlerChain};
//!
//! let config = CaptureConfig::builder()
//!     .content_dir("/path/to/content")
//!     .languages(vec!["de".to_string()])
//!     .build()
//!     .unwrap();
//!
//! let collector = Arc::new(CollectingHandler::new());
//! let capturer = Capturer::new(&config, HandlerChain::new().with(collector.clone())).unwrap();
//! let stats = capturer.capture().unwrap();
//!
//! println!("{:?} in {:?}", collector.summary(), stats.duration);
//! ```
//!
//! # Partial Capture
//!
//! Register a [`ContentChangeMap`] as both handler and change tracker during a
//! full capture, then re-capture only what changed:
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! use bundlewalk_capture::{
//!     CaptureConfig, Capturer, CollectingHandler, ContentChangeMap, ContentClassifier,
//!     HandlerChain,
//! };
//!
//! let changes = Arc::new(ContentChangeMap::new(Arc::new(ContentClassifier)));
//! let collector = Arc::new(CollectingHandler::new());
//! let chain = HandlerChain::new().with(changes.clone()).with(collector.clone());
//!
//! let config = CaptureConfig::new("/path/to/content");
//! let capturer = Capturer::new(&config, chain)
//!     .unwrap()
//!     .with_change_tracker(changes.clone());
//! capturer.capture().unwrap();
//!
//! collector.clear();
//! capturer
//!     .capture_partial(&[PathBuf::from("/path/to/content/post/index.md")])
//!     .unwrap();
//! ```

mod aggregate;
mod capturer;
mod changes;
mod classify;
mod fs;
mod handler;
mod ignore;
mod resolve;
mod slots;

pub use aggregate::{BundleDir, BundleGroup};
pub use capturer::{CaptureStats, Capturer};
pub use changes::ContentChangeMap;
pub use classify::{CONTENT_EXTENSIONS, ContentClassifier, DirClassification, DirState};
pub use fs::OsFs;
pub use handler::{Capabilities, CaptureHandler, CaptureSummary, CollectingHandler, HandlerChain};
pub use ignore::GlobIgnore;
pub use resolve::{PathResolver, Resolved};
pub use slots::{Slot, WorkerSlots};

// Re-export core types for convenience
pub use bundlewalk_core::{
    BundleKind, CaptureConfig, CaptureError, ChangeRecord, ChangeTracker, Entry, FileMeta,
    FileName, FilenameClassifier, Fs, IgnoreMatcher, Result,
};
