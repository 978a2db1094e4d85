//! Abstractions for filesystem access to enable testing and mocking.
//!
//! File-backed sources read through [`FileSystem`], so the same adapter works
//! against the real `/proc` on Linux and against [`MockFs`](super::MockFs)
//! in tests and on other platforms.

use std::io;
use std::path::{Path, PathBuf};

/// Read-only filesystem operations used by sources.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Checks if a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Checks if a path is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Lists entries in a directory, as full paths.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Real filesystem implementation that delegates to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(path)?;
        let mut paths = Vec::new();
        for entry in entries {
            paths.push(entry?.path());
        }
        paths.sort();
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_real_fs_read_to_string() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("uptime");
        fs::write(&file, "12345.6 11000.2\n").unwrap();

        let rfs = RealFs::new();
        assert_eq!(rfs.read_to_string(&file).unwrap(), "12345.6 11000.2\n");
    }

    #[test]
    fn test_real_fs_exists_and_is_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("loadavg");
        fs::write(&file, "0.1").unwrap();

        let rfs = RealFs::new();
        assert!(rfs.exists(&file));
        assert!(!rfs.is_dir(&file));
        assert!(rfs.is_dir(dir.path()));
        assert!(!rfs.exists(Path::new("/nonexistent/path/12345")));
    }

    #[test]
    fn test_real_fs_read_dir_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b"), "2").unwrap();
        fs::write(dir.path().join("a"), "1").unwrap();
        fs::create_dir(dir.path().join("c")).unwrap();

        let entries = RealFs::new().read_dir(dir.path()).unwrap();
        let names: Vec<_> = entries
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
