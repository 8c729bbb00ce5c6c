//! Per-language bundle aggregation.

use std::collections::HashSet;
use std::path::Path;

use compact_str::CompactString;
use indexmap::IndexMap;
use serde::Serialize;

use bundlewalk_core::{BundleKind, CaptureError, Entry, Result};

/// The bundle of one language: its header and resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleDir {
    /// Bundle kind.
    pub kind: BundleKind,
    /// Owner entry. For a borrowed header, `overridden_lang` is set.
    pub header: Entry,
    /// Resources keyed by content file path or language-independent resource key.
    pub resources: IndexMap<CompactString, Entry>,
}

impl BundleDir {
    fn new(header: Entry, kind: BundleKind) -> Self {
        Self {
            kind,
            header,
            resources: IndexMap::new(),
        }
    }

    /// Copy this bundle for `lang`: resources are deep-copied, the header is a
    /// value copy stamped with the new language.
    fn borrow_for(&self, lang: &str) -> Self {
        Self {
            kind: self.kind,
            header: self.header.with_overridden_lang(lang),
            resources: self.resources.clone(),
        }
    }

    /// Look up a resource by key.
    pub fn resource(&self, key: &str) -> Option<&Entry> {
        self.resources.get(key)
    }
}

/// All language variants of one bundle directory.
///
/// Built while walking one directory and handed to the handler chain once
/// complete.
#[derive(Debug, Clone, Serialize)]
pub struct BundleGroup {
    kind: BundleKind,
    #[serde(skip)]
    default_lang: CompactString,
    bundles: IndexMap<CompactString, BundleDir>,
    // (language, resource key) pairs already claimed by a plain resource.
    #[serde(skip)]
    lang_overrides: HashSet<(CompactString, CompactString)>,
}

impl BundleGroup {
    /// Create an empty group for a directory of the given kind.
    pub fn new(kind: BundleKind, default_lang: &str) -> Self {
        Self {
            kind,
            default_lang: default_lang.into(),
            bundles: IndexMap::new(),
            lang_overrides: HashSet::new(),
        }
    }

    /// Bundle kind of the directory.
    pub fn kind(&self) -> BundleKind {
        self.kind
    }

    /// Bundle for a language.
    pub fn get(&self, lang: &str) -> Option<&BundleDir> {
        self.bundles.get(lang)
    }

    /// Iterate over `(language, bundle)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BundleDir)> {
        self.bundles.iter().map(|(lang, dir)| (lang.as_str(), dir))
    }

    /// Languages with a bundle, in registration order.
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.bundles.keys().map(|lang| lang.as_str())
    }

    /// Number of language variants.
    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    /// Check if no header has been added yet.
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// Directory that owns this bundle.
    pub fn dir(&self) -> Option<&Path> {
        self.bundles.values().next().and_then(|b| b.header.path.parent())
    }

    /// Install `entry` as the header of its language, replacing any previous one.
    pub fn add_header(&mut self, entry: Entry) {
        let lang = CompactString::from(entry.lang());
        self.bundles.insert(lang, BundleDir::new(entry, self.kind));
    }

    /// Attach a content file to the bundle of its language.
    ///
    /// A language without a header borrows the default language's header, or
    /// the first registered one.
    pub fn add_content_file(&mut self, entry: Entry) -> Result<()> {
        let lang = CompactString::from(entry.lang());

        if !self.bundles.contains_key(&lang) {
            let source = self
                .bundles
                .get(&self.default_lang)
                .or_else(|| self.bundles.values().next())
                .ok_or_else(|| CaptureError::MissingBundleHeader {
                    path: entry.path.clone(),
                })?;
            let borrowed = source.borrow_for(&lang);
            self.bundles.insert(lang.clone(), borrowed);
        }

        let key = CompactString::from(entry.path.to_string_lossy());
        if let Some(dir) = self.bundles.get_mut(&lang) {
            dir.resources.insert(key, entry);
        }
        Ok(())
    }

    /// Attach a non-content resource to every language's bundle.
    ///
    /// The first resource to claim a key in a language keeps it, except that a
    /// resource tagged with that very language always replaces it.
    pub fn add_plain_resource(&mut self, entry: Entry) {
        let key = entry.resource_key();
        for (lang, dir) in self.bundles.iter_mut() {
            let claim = (lang.clone(), key.clone());
            if entry.lang() == lang.as_str() || !self.lang_overrides.contains(&claim) {
                dir.resources.insert(key.clone(), entry.clone());
            }
            self.lang_overrides.insert(claim);
        }
    }
}
