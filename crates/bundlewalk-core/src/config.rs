//! Capture configuration types.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Minimum size of the worker pool, regardless of available parallelism.
pub const MIN_WORKERS: usize = 4;

/// Configuration for a capture pass.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct CaptureConfig {
    /// Root content directory to capture.
    pub content_dir: PathBuf,

    /// Language assigned to files without a language infix.
    #[builder(default = "default_language()")]
    #[serde(default = "default_language")]
    pub default_content_language: String,

    /// Configured language codes recognised as file-name infixes (e.g. `page.de.md`).
    #[builder(default)]
    #[serde(default)]
    pub languages: Vec<String>,

    /// Patterns to ignore (glob syntax).
    #[builder(default)]
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Number of concurrent directory workers (0 = auto-detect).
    #[builder(default = "0")]
    #[serde(default)]
    pub workers: usize,

    /// Restrict the capture to these changed paths (partial capture).
    #[builder(default)]
    #[serde(default)]
    pub filenames: Vec<PathBuf>,
}

fn default_language() -> String {
    "en".to_string()
}

impl CaptureConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.content_dir {
            Some(ref dir) if dir.as_os_str().is_empty() => {
                return Err("Content directory cannot be empty".to_string());
            }
            None => return Err("Content directory is required".to_string()),
            _ => {}
        }
        if let Some(ref lang) = self.default_content_language {
            if lang.is_empty() {
                return Err("Default content language cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

impl CaptureConfig {
    /// Create a new capture config builder.
    pub fn builder() -> CaptureConfigBuilder {
        CaptureConfigBuilder::default()
    }

    /// Create a simple config for a full capture of a directory.
    pub fn new(content_dir: impl Into<PathBuf>) -> Self {
        Self {
            content_dir: content_dir.into(),
            default_content_language: default_language(),
            languages: Vec::new(),
            ignore_patterns: Vec::new(),
            workers: 0,
            filenames: Vec::new(),
        }
    }

    /// Whether this config describes a partial capture.
    pub fn is_partial(&self) -> bool {
        !self.filenames.is_empty()
    }

    /// Resolve the worker pool capacity: at least [`MIN_WORKERS`] and at least
    /// the available parallelism when auto-detecting.
    pub fn worker_count(&self) -> usize {
        match self.workers {
            0 => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
                .max(MIN_WORKERS),
            n => n,
        }
    }

    /// All configured languages, the default language first.
    pub fn all_languages(&self) -> Vec<String> {
        let mut langs = vec![self.default_content_language.clone()];
        for lang in &self.languages {
            if !langs.contains(lang) {
                langs.push(lang.clone());
            }
        }
        langs
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self::new("content")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = CaptureConfig::builder()
            .content_dir("/site/content")
            .languages(vec!["de".to_string(), "fr".to_string()])
            .workers(2usize)
            .build()
            .unwrap();

        assert_eq!(config.content_dir, PathBuf::from("/site/content"));
        assert_eq!(config.default_content_language, "en");
        assert_eq!(config.worker_count(), 2);
        assert!(!config.is_partial());
    }

    #[test]
    fn test_builder_requires_content_dir() {
        assert!(CaptureConfig::builder().build().is_err());
        assert!(CaptureConfig::builder().content_dir("").build().is_err());
    }

    #[test]
    fn test_auto_worker_count_has_floor() {
        let config = CaptureConfig::new("/site/content");
        assert!(config.worker_count() >= MIN_WORKERS);
    }

    #[test]
    fn test_all_languages_dedups_default() {
        let config = CaptureConfig::builder()
            .content_dir("/c")
            .default_content_language("de")
            .languages(vec!["en".to_string(), "de".to_string()])
            .build()
            .unwrap();

        assert_eq!(config.all_languages(), vec!["de".to_string(), "en".to_string()]);
    }
}
