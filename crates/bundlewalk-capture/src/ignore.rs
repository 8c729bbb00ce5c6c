//! Glob-based ignore rules.

use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};

use bundlewalk_core::{CaptureError, IgnoreMatcher, Result};

/// Ignores paths whose file name or full path matches any configured glob.
#[derive(Debug, Clone)]
pub struct GlobIgnore {
    set: GlobSet,
}

impl GlobIgnore {
    /// Build a matcher from glob patterns.
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| CaptureError::InvalidConfig {
                message: format!("invalid ignore pattern {pattern:?}: {e}"),
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|e| CaptureError::InvalidConfig {
            message: format!("invalid ignore patterns: {e}"),
        })?;
        Ok(Self { set })
    }

    /// A matcher that ignores nothing.
    pub fn empty() -> Self {
        Self {
            set: GlobSet::empty(),
        }
    }
}

impl Default for GlobIgnore {
    fn default() -> Self {
        Self::empty()
    }
}

impl IgnoreMatcher for GlobIgnore {
    fn ignored(&self, path: &Path) -> bool {
        if self.set.is_empty() {
            return false;
        }
        path.file_name().is_some_and(|name| self.set.is_match(name)) || self.set.is_match(path)
    }
}
