//! Core types and contracts for bundlewalk.
//!
//! This crate provides the data model shared by the capture engine and its
//! consumers: captured entries, bundle kinds, configuration, errors and the
//! traits for the collaborators a capture pass consults.

mod config;
mod contract;
mod entry;
mod error;

pub use config::{CaptureConfig, CaptureConfigBuilder, MIN_WORKERS};
pub use contract::{ChangeRecord, ChangeTracker, FilenameClassifier, Fs, IgnoreMatcher};
pub use entry::{BundleKind, Entry, FileMeta, FileName};
pub use error::{CaptureError, Result};
