//! `std::fs` backed storage.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use bundlewalk_core::{FileMeta, Fs};

/// Storage on the local operating-system filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl Fs for OsFs {
    fn read_dir_names(&self, dir: &Path) -> io::Result<Vec<OsString>> {
        std::fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect()
    }

    fn symlink_metadata(&self, path: &Path) -> io::Result<FileMeta> {
        std::fs::symlink_metadata(path).map(|m| FileMeta::from(&m))
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::canonicalize(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_read_dir_names() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.md"), "a").unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();

        let mut names = OsFs.read_dir_names(temp.path()).unwrap();
        names.sort();
        assert_eq!(names, vec![OsString::from("a.md"), OsString::from("sub")]);
    }

    #[test]
    fn test_symlink_metadata_missing() {
        let temp = TempDir::new().unwrap();
        let err = OsFs
            .symlink_metadata(&temp.path().join("missing"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_metadata_does_not_follow() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("target")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("target"), temp.path().join("link")).unwrap();

        let meta = OsFs.symlink_metadata(&temp.path().join("link")).unwrap();
        assert!(meta.is_symlink);
        assert!(!meta.is_dir);
    }
}
