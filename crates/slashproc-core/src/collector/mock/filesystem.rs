//! In-memory mock filesystem for testing sources without real `/proc`.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

use crate::collector::traits::FileSystem;

/// In-memory filesystem for testing.
///
/// Files and directories live in sorted maps, so `read_dir` order is stable.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    files: BTreeMap<PathBuf, String>,
    directories: BTreeSet<PathBuf>,
    /// Paths that exist but fail to read, like root-only sysctls.
    unreadable: BTreeSet<PathBuf>,
}

impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given content. Parent directories are created.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.insert(path, content.into());
    }

    /// Adds a file that is listed by `read_dir` but cannot be read.
    pub fn add_unreadable(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.unreadable.insert(path);
    }

    /// Adds an empty directory.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.directories.insert(path);
    }

    /// Loads a directory snapshot from disk and mounts it under `mount`.
    ///
    /// Useful for regression tests against a captured `/proc` tree.
    pub fn from_snapshot(dir: &Path, mount: &Path) -> io::Result<Self> {
        let mut fs = Self::new();
        load_directory_recursive(&mut fs, dir, mount)?;
        Ok(fs)
    }

    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }
}

fn load_directory_recursive(
    fs: &mut MockFs,
    real_path: &Path,
    virtual_path: &Path,
) -> io::Result<()> {
    fs.add_dir(virtual_path);

    for entry in std::fs::read_dir(real_path)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let virtual_child = virtual_path.join(entry.file_name());

        if file_type.is_dir() {
            load_directory_recursive(fs, &entry.path(), &virtual_child)?;
        } else if file_type.is_file() {
            match std::fs::read_to_string(entry.path()) {
                Ok(content) => fs.add_file(&virtual_child, content),
                Err(_) => fs.add_unreadable(&virtual_child),
            }
        }
    }
    Ok(())
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        if self.unreadable.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {:?}", path),
            ));
        }
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
            || self.directories.contains(path)
            || self.unreadable.contains(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.directories.contains(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.directories.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {:?}", path),
            ));
        }

        let children = self
            .files
            .keys()
            .chain(self.unreadable.iter())
            .chain(self.directories.iter())
            .filter(|p| p.parent() == Some(path))
            .cloned()
            .collect::<BTreeSet<_>>();

        Ok(children.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_fs_add_file() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/meminfo", "MemTotal: 16384 kB\n");

        assert!(fs.exists(Path::new("/proc/meminfo")));
        assert!(fs.is_dir(Path::new("/proc")));
        assert!(!fs.is_dir(Path::new("/proc/meminfo")));

        let content = fs.read_to_string(Path::new("/proc/meminfo")).unwrap();
        assert_eq!(content, "MemTotal: 16384 kB\n");
    }

    #[test]
    fn test_mock_fs_read_dir() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/sys/kernel/ostype", "Linux");
        fs.add_file("/proc/sys/kernel/pid_max", "4194304");
        fs.add_dir("/proc/sys/kernel/random");
        fs.add_unreadable("/proc/sys/kernel/cad_pid");

        let entries = fs.read_dir(Path::new("/proc/sys/kernel")).unwrap();
        assert_eq!(
            entries,
            vec![
                PathBuf::from("/proc/sys/kernel/cad_pid"),
                PathBuf::from("/proc/sys/kernel/ostype"),
                PathBuf::from("/proc/sys/kernel/pid_max"),
                PathBuf::from("/proc/sys/kernel/random"),
            ]
        );
    }

    #[test]
    fn test_mock_fs_unreadable() {
        let mut fs = MockFs::new();
        fs.add_unreadable("/proc/sys/kernel/cad_pid");
        let err = fs
            .read_to_string(Path::new("/proc/sys/kernel/cad_pid"))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert!(fs.exists(Path::new("/proc/sys/kernel/cad_pid")));
    }

    #[test]
    fn test_mock_fs_not_found() {
        let fs = MockFs::new();
        let result = fs.read_to_string(Path::new("/nonexistent"));
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::NotFound);
        assert!(fs.read_dir(Path::new("/nonexistent")).is_err());
    }

    #[test]
    fn test_mock_fs_from_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sys/vm")).unwrap();
        std::fs::write(dir.path().join("uptime"), "1.0 2.0\n").unwrap();
        std::fs::write(dir.path().join("sys/vm/swappiness"), "60\n").unwrap();

        let fs = MockFs::from_snapshot(dir.path(), Path::new("/proc")).unwrap();
        assert_eq!(
            fs.read_to_string(Path::new("/proc/uptime")).unwrap(),
            "1.0 2.0\n"
        );
        assert!(fs.is_dir(Path::new("/proc/sys/vm")));
        assert!(fs.exists(Path::new("/proc/sys/vm/swappiness")));
    }
}
