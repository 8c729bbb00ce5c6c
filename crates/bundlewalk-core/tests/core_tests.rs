use bundlewalk_core::{BundleKind, CaptureConfig, Entry, FileMeta, FileName};
use std::path::{Path, PathBuf};
use std::str::FromStr;

fn langs() -> Vec<String> {
    vec!["en".to_string(), "de".to_string(), "fr".to_string()]
}

fn entry(path: &str, kind: BundleKind, is_content: bool) -> Entry {
    let name = Path::new(path).file_name().unwrap().to_str().unwrap();
    Entry::new(
        Path::new("/site/content"),
        path,
        FileMeta::file(1),
        kind,
        is_content,
        FileName::parse(name, &langs()),
        "en",
    )
}

#[test]
fn test_bundle_kind_display_and_parse() {
    assert_eq!(BundleKind::Not.to_string(), "not-bundle");
    assert_eq!(BundleKind::Leaf.to_string(), "leaf");
    assert_eq!(BundleKind::Branch.to_string(), "branch");

    assert_eq!(BundleKind::from_str("leaf").unwrap(), BundleKind::Leaf);
    assert_eq!(BundleKind::from_str("not-bundle").unwrap(), BundleKind::Not);
    assert!(BundleKind::from_str("section").is_err());

    assert!(BundleKind::Leaf.is_bundle());
    assert!(!BundleKind::default().is_bundle());
}

#[test]
fn test_entry_language_from_file_name() {
    let de = entry("/site/content/blog/post/logo.de.png", BundleKind::Not, false);
    assert_eq!(de.lang(), "de");
    assert_eq!(de.translation_base_name, "logo");
    assert_eq!(de.rel_dir, "blog/post/");

    let default = entry("/site/content/blog/post/logo.png", BundleKind::Not, false);
    assert_eq!(default.lang(), "en");
}

#[test]
fn test_resource_key_is_language_independent() {
    let generic = entry("/site/content/b/logo.png", BundleKind::Not, false);
    let german = entry("/site/content/b/logo.de.png", BundleKind::Not, false);

    assert_eq!(generic.resource_key(), "b/logo.png");
    assert_eq!(generic.resource_key(), german.resource_key());
}

#[test]
fn test_owner_flag_follows_kind() {
    let owner = entry("/site/content/b/index.md", BundleKind::Leaf, true);
    let page = entry("/site/content/b/page.md", BundleKind::Not, true);

    assert!(owner.is_owner());
    assert!(!page.is_owner());
    assert!(!owner.is_dir());
    assert_eq!(owner.file_name(), Some("index.md"));
}

#[test]
fn test_overridden_lang_leaves_original_untouched() {
    let header = entry("/site/content/b/index.md", BundleKind::Leaf, true);
    let borrowed = header.with_overridden_lang("fr");

    assert_eq!(borrowed.lang(), "fr");
    assert_eq!(header.lang(), "en");
    assert_eq!(header.overridden_lang, None);
    assert_eq!(borrowed.path, header.path);
}

#[test]
fn test_config_serde_defaults() {
    let config: CaptureConfig =
        serde_json::from_str(r#"{"content_dir": "/site/content"}"#).unwrap();
    assert_eq!(config.content_dir, PathBuf::from("/site/content"));
    assert_eq!(config.default_content_language, "en");
    assert!(config.languages.is_empty());
    assert_eq!(config.workers, 0);
    assert!(!config.is_partial());
}
