//! Error types for capture operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while capturing a content tree.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found. Usually a file removed between listing and stat.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Directory reached through a symlink that was already visited in this pass.
    #[error("Skipped potentially cyclic directory: {path}")]
    CyclicDir { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A symbolic link could not be resolved.
    #[error("Cannot read symbolic link {link}: {source}")]
    BrokenSymlink {
        link: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A symbolic link resolved, but its target could not be stat'ed.
    #[error("Cannot stat {target} (linked from {link}): {source}")]
    SymlinkStat {
        link: PathBuf,
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A content file was bundled before any bundle header existed.
    #[error("Bundle header not found for file {path}")]
    MissingBundleHeader { path: PathBuf },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Content path is not a directory.
    #[error("Content path is not a directory: {path}")]
    NotADirectory { path: PathBuf },
}

impl CaptureError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Whether a directory listing should skip the entry rather than fail.
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::CyclicDir { .. })
    }

    /// Whether the error reports a path that no longer exists.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result alias used across the bundlewalk crates.
pub type Result<T, E = CaptureError> = std::result::Result<T, E>;
