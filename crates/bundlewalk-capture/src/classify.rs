//! File-name and directory classification.

use bundlewalk_core::{BundleKind, FilenameClassifier};

/// File extensions treated as content by [`ContentClassifier`].
pub const CONTENT_EXTENSIONS: &[&str] = &[
    "md", "markdown", "mdown", "html", "htm", "adoc", "asciidoc", "ad", "org", "rst", "pandoc",
    "pdc", "mmark",
];

/// Default file-name classifier.
///
/// A content file named `index.*` owns a leaf bundle, `_index.*` owns a branch
/// bundle. Content is recognised by extension, case-insensitively.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentClassifier;

impl ContentClassifier {
    /// Check if a file name has a content extension.
    pub fn is_content_file(name: &str) -> bool {
        name.rsplit_once('.')
            .is_some_and(|(_, ext)| CONTENT_EXTENSIONS.iter().any(|c| c.eq_ignore_ascii_case(ext)))
    }
}

impl FilenameClassifier for ContentClassifier {
    fn classify(&self, name: &str) -> (BundleKind, bool) {
        if !Self::is_content_file(name) {
            return (BundleKind::Not, false);
        }
        if name.starts_with("_index.") {
            return (BundleKind::Branch, true);
        }
        if name.starts_with("index.") {
            return (BundleKind::Leaf, true);
        }
        (BundleKind::Not, true)
    }
}

/// How a directory's own files are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirState {
    /// Regular handling: singles, bundles or both.
    Default,
    /// No content files: every file is copied as-is.
    AssetsOnly,
    /// A branch with no non-content files: every file is an independent single.
    SinglesOnly,
}

/// Classification of one directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirClassification {
    /// Bundle kind of the directory. A leaf owner always wins over a branch owner.
    pub kind: BundleKind,
    /// How the directory's own files are handled.
    pub state: DirState,
    /// Per-entry `(kind, is_content)`, aligned with the listing. Directories get `(Not, false)`.
    pub entries: Vec<(BundleKind, bool)>,
}

impl DirClassification {
    /// Classify a listing of `(file name, is directory)` pairs.
    pub fn classify<'n, I>(classifier: &dyn FilenameClassifier, listing: I) -> Self
    where
        I: IntoIterator<Item = (&'n str, bool)>,
    {
        let mut has_content = false;
        let mut has_non_content = false;
        let mut has_leaf = false;
        let mut has_branch = false;

        let entries: Vec<(BundleKind, bool)> = listing
            .into_iter()
            .map(|(name, is_dir)| {
                if is_dir {
                    return (BundleKind::Not, false);
                }
                let (kind, is_content) = classifier.classify(name);
                match kind {
                    BundleKind::Leaf => has_leaf = true,
                    BundleKind::Branch => has_branch = true,
                    BundleKind::Not => {}
                }
                if is_content {
                    has_content = true;
                } else {
                    has_non_content = true;
                }
                (kind, is_content)
            })
            .collect();

        let kind = if has_leaf {
            BundleKind::Leaf
        } else if has_branch {
            BundleKind::Branch
        } else {
            BundleKind::Not
        };

        let state = if !has_content {
            DirState::AssetsOnly
        } else if kind == BundleKind::Branch && !has_non_content {
            DirState::SinglesOnly
        } else {
            DirState::Default
        };

        Self {
            kind,
            state,
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(names: &[&str]) -> DirClassification {
        DirClassification::classify(&ContentClassifier, names.iter().map(|n| (*n, false)))
    }

    #[test]
    fn test_classify_names() {
        let c = ContentClassifier;
        assert_eq!(c.classify("index.md"), (BundleKind::Leaf, true));
        assert_eq!(c.classify("index.de.md"), (BundleKind::Leaf, true));
        assert_eq!(c.classify("_index.md"), (BundleKind::Branch, true));
        assert_eq!(c.classify("post.MD"), (BundleKind::Not, true));
        assert_eq!(c.classify("index.png"), (BundleKind::Not, false));
        assert_eq!(c.classify("README"), (BundleKind::Not, false));
    }

    #[test]
    fn test_single_content_file_is_not_bundle() {
        let dir = classify(&["post.md"]);
        assert_eq!(dir.kind, BundleKind::Not);
        assert_eq!(dir.state, DirState::Default);
    }

    #[test]
    fn test_leaf_wins_over_branch() {
        let dir = classify(&["_index.md", "_index.de.md", "index.md", "logo.png"]);
        assert_eq!(dir.kind, BundleKind::Leaf);
        assert_eq!(dir.state, DirState::Default);
    }

    #[test]
    fn test_branch_with_resource() {
        let dir = classify(&["_index.md", "logo.png"]);
        assert_eq!(dir.kind, BundleKind::Branch);
        assert_eq!(dir.state, DirState::Default);
    }

    #[test]
    fn test_branch_without_resources_is_singles_only() {
        let dir = classify(&["_index.md", "a.md", "b.md"]);
        assert_eq!(dir.kind, BundleKind::Branch);
        assert_eq!(dir.state, DirState::SinglesOnly);
    }

    #[test]
    fn test_assets_only() {
        let dir = classify(&["logo.png", "style.css"]);
        assert_eq!(dir.state, DirState::AssetsOnly);

        let empty = classify(&[]);
        assert_eq!(empty.state, DirState::AssetsOnly);
    }

    #[test]
    fn test_directories_are_not_classified() {
        let dir = DirClassification::classify(
            &ContentClassifier,
            [("index.md", true), ("logo.png", false)],
        );
        assert_eq!(dir.kind, BundleKind::Not);
        assert_eq!(dir.state, DirState::AssetsOnly);
        assert_eq!(dir.entries[0], (BundleKind::Not, false));
    }
}
