//! Captured entry types.

use std::path::{Component, Path, PathBuf};

use compact_str::{CompactString, format_compact};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Bundle classification of a directory, or of the file that owns it.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BundleKind {
    /// Not a bundle, or a plain file.
    #[default]
    #[strum(serialize = "not-bundle")]
    Not,
    /// A page bundle: one page plus all its nested resources.
    Leaf,
    /// A section bundle: a list page plus its flat resources.
    Branch,
}

impl BundleKind {
    /// Check if this kind denotes a bundle.
    pub fn is_bundle(&self) -> bool {
        !matches!(self, BundleKind::Not)
    }
}

/// The subset of file metadata the capturer needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    /// Whether the entry is a directory.
    pub is_dir: bool,
    /// Whether the entry itself is a symbolic link (lstat semantics).
    pub is_symlink: bool,
    /// Size in bytes (0 for directories).
    pub size: u64,
}

impl FileMeta {
    /// Metadata for a regular file.
    pub fn file(size: u64) -> Self {
        Self {
            is_dir: false,
            is_symlink: false,
            size,
        }
    }

    /// Metadata for a directory.
    pub fn dir() -> Self {
        Self {
            is_dir: true,
            is_symlink: false,
            size: 0,
        }
    }
}

impl From<&std::fs::Metadata> for FileMeta {
    fn from(m: &std::fs::Metadata) -> Self {
        Self {
            is_dir: m.is_dir(),
            is_symlink: m.file_type().is_symlink(),
            size: if m.is_dir() { 0 } else { m.len() },
        }
    }
}

/// A file name split into `base[.lang].ext`.
///
/// A language infix is only recognised when it names a configured language;
/// `post.v2.md` keeps `post.v2` as its base name unless `v2` is a language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileName {
    /// Base name without language infix and extension.
    pub translation_base_name: CompactString,
    /// Extension without the leading dot.
    pub ext: CompactString,
    /// Language infix, if it named a configured language.
    pub lang: Option<CompactString>,
}

impl FileName {
    /// Split `name` into its parts, recognising infixes from `languages`.
    pub fn parse(name: &str, languages: &[String]) -> Self {
        let (stem, ext) = match name.rfind('.') {
            Some(i) => (&name[..i], &name[i + 1..]),
            None => (name, ""),
        };

        if let Some(i) = stem.rfind('.') {
            let candidate = &stem[i + 1..];
            if languages.iter().any(|l| l == candidate) {
                return Self {
                    translation_base_name: stem[..i].into(),
                    ext: ext.into(),
                    lang: Some(candidate.into()),
                };
            }
        }

        Self {
            translation_base_name: stem.into(),
            ext: ext.into(),
            lang: None,
        }
    }
}

/// One captured filesystem object.
///
/// Entries are immutable once built; the only derived copy is
/// [`Entry::with_overridden_lang`], used when a bundle header is borrowed
/// for a language that has none of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Absolute path as seen by the walk (a symlink keeps its own path).
    pub path: PathBuf,
    /// Content directory this entry belongs to.
    pub base_dir: PathBuf,
    /// Directory relative to `base_dir`, slash-separated with a trailing `/`.
    pub rel_dir: CompactString,
    /// Base name without language infix and extension.
    pub translation_base_name: CompactString,
    /// Extension without the leading dot.
    pub ext: CompactString,
    /// Language derived from the file name, or the default language.
    pub lang: CompactString,
    /// Language stamped on a borrowed bundle header.
    pub overridden_lang: Option<CompactString>,
    /// Bundle kind this entry owns (`Not` for non-owners).
    pub kind: BundleKind,
    /// Eligible for content processing, as opposed to an opaque asset.
    pub is_content: bool,
    /// File metadata of the resolved entry.
    pub meta: FileMeta,
}

impl Entry {
    /// Build an entry for `path` inside `base_dir`.
    pub fn new(
        base_dir: &Path,
        path: impl Into<PathBuf>,
        meta: FileMeta,
        kind: BundleKind,
        is_content: bool,
        name: FileName,
        default_lang: &str,
    ) -> Self {
        let path = path.into();
        let rel_dir = relative_dir(base_dir, &path);
        Self {
            rel_dir,
            base_dir: base_dir.to_path_buf(),
            translation_base_name: name.translation_base_name,
            ext: name.ext,
            lang: name.lang.unwrap_or_else(|| default_lang.into()),
            overridden_lang: None,
            kind,
            is_content,
            meta,
            path,
        }
    }

    /// Effective language: the overridden language if set, else the file's own.
    pub fn lang(&self) -> &str {
        self.overridden_lang.as_deref().unwrap_or(&self.lang)
    }

    /// Check if this entry is the header that defines a bundle.
    pub fn is_owner(&self) -> bool {
        self.kind.is_bundle()
    }

    /// Check if this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.meta.is_dir
    }

    /// File name of the entry.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    /// Language-independent key of a resource: directory, base name and extension.
    pub fn resource_key(&self) -> CompactString {
        format_compact!("{}{}.{}", self.rel_dir, self.translation_base_name, self.ext)
    }

    /// Value copy of this entry stamped with another language.
    pub fn with_overridden_lang(&self, lang: &str) -> Self {
        Self {
            overridden_lang: Some(lang.into()),
            ..self.clone()
        }
    }
}

fn relative_dir(base_dir: &Path, path: &Path) -> CompactString {
    let Some(parent) = path.parent() else {
        return CompactString::default();
    };
    let Ok(rel) = parent.strip_prefix(base_dir) else {
        return CompactString::default();
    };

    let mut dir = CompactString::default();
    for component in rel.components() {
        if let Component::Normal(part) = component {
            dir.push_str(&part.to_string_lossy());
            dir.push('/');
        }
    }
    dir
}
