//! Filesystem capabilities consumed by the scanner, resolver and executor.
//!
//! Everything that touches the disk goes through the [`FileSystem`] trait so the
//! planning logic stays free of I/O. [`LocalFs`] is the real implementation,
//! walking the tree with `walkdir` and hashing with SHA-256.

use crate::error::FatalError;
use crate::record::Checksum;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// One raw entry yielded by traversal, before admission.
#[derive(Debug, Clone)]
pub struct RawEntry {
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
    pub is_dir: bool,
}

/// Disk operations the engine needs. Each mutating call fails with the
/// underlying I/O error on denial, missing path or device fault.
pub trait FileSystem {
    /// Lists every entry below `root` (excluding `root` itself) in a stable,
    /// name-sorted order. Only a missing or unreadable root is fatal.
    fn list_entries(&self, root: &Path) -> Result<Vec<RawEntry>, FatalError>;

    /// Platform hidden/system detection.
    fn is_hidden(&self, entry: &RawEntry) -> bool;

    /// SHA-256 of the whole file content.
    fn checksum(&self, path: &Path) -> io::Result<Checksum>;

    fn exists(&self, path: &Path) -> bool;

    /// True when both paths resolve to the same file on disk.
    fn same_file(&self, a: &Path, b: &Path) -> bool;

    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn delete_file(&self, path: &Path) -> io::Result<()>;

    fn make_dirs(&self, path: &Path) -> io::Result<()>;
}

/// Checks that `root` exists, is a directory, and can be listed.
pub fn validate_root(root: &Path) -> Result<(), FatalError> {
    let metadata = fs::metadata(root).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => FatalError::RootMissing {
            path: root.to_path_buf(),
        },
        _ => FatalError::RootUnreadable {
            path: root.to_path_buf(),
            source: e,
        },
    })?;

    if !metadata.is_dir() {
        return Err(FatalError::RootNotDirectory {
            path: root.to_path_buf(),
        });
    }

    fs::read_dir(root).map_err(|e| FatalError::RootUnreadable {
        path: root.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

/// The local disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn list_entries(&self, root: &Path) -> Result<Vec<RawEntry>, FatalError> {
        validate_root(root)?;

        let mut entries = Vec::new();
        for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log::warn!("skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if entry.path_is_symlink() {
                log::debug!("skipping symlink {}", entry.path().display());
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    log::warn!("skipping {}: {}", entry.path().display(), e);
                    continue;
                }
            };

            entries.push(RawEntry {
                path: entry.into_path(),
                size: metadata.len(),
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                is_dir: metadata.is_dir(),
            });
        }

        Ok(entries)
    }

    fn is_hidden(&self, entry: &RawEntry) -> bool {
        let dotted = entry
            .path
            .file_name()
            .map(|name| name.to_string_lossy().starts_with('.'))
            .unwrap_or(false);

        dotted || has_hidden_attribute(&entry.path)
    }

    fn checksum(&self, path: &Path) -> io::Result<Checksum> {
        let file = fs::File::open(path)?;
        let mut reader = BufReader::with_capacity(HASH_BUFFER_SIZE, file);
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; HASH_BUFFER_SIZE];
        loop {
            let n = reader.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&hasher.finalize());
        Ok(Checksum::from(digest))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn same_file(&self, a: &Path, b: &Path) -> bool {
        if a == b {
            return true;
        }
        match (fs::canonicalize(a), fs::canonicalize(b)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    fn move_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        match fs::rename(from, to) {
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                fs::copy(from, to)?;
                fs::remove_file(from)
            }
            other => other,
        }
    }

    fn copy_file(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::copy(from, to).map(|_| ())
    }

    fn delete_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn make_dirs(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }
}

#[cfg(windows)]
fn has_hidden_attribute(path: &Path) -> bool {
    use std::os::windows::fs::MetadataExt;

    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    const FILE_ATTRIBUTE_SYSTEM: u32 = 0x4;

    fs::symlink_metadata(path)
        .map(|m| m.file_attributes() & (FILE_ATTRIBUTE_HIDDEN | FILE_ATTRIBUTE_SYSTEM) != 0)
        .unwrap_or(false)
}

#[cfg(not(windows))]
fn has_hidden_attribute(_path: &Path) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_list_entries_sorted_and_recursive() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("b.txt"), "b").unwrap();
        fs::write(root.join("a.txt"), "aa").unwrap();
        fs::write(root.join("sub").join("c.txt"), "ccc").unwrap();

        let entries = LocalFs.list_entries(root).unwrap();
        let names: Vec<_> = entries
            .iter()
            .map(|e| e.path.strip_prefix(root).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            names,
            vec![
                PathBuf::from("a.txt"),
                PathBuf::from("b.txt"),
                PathBuf::from("sub"),
                PathBuf::from("sub/c.txt"),
            ]
        );
        assert_eq!(entries[0].size, 2);
        assert!(entries[2].is_dir);
    }

    #[test]
    fn test_list_entries_missing_root_is_fatal() {
        let result = LocalFs.list_entries(Path::new("/non/existent/path"));
        assert!(matches!(result, Err(FatalError::RootMissing { .. })));
    }

    #[test]
    fn test_validate_root_rejects_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("plain.txt");
        fs::write(&file, "x").unwrap();

        assert!(matches!(
            validate_root(&file),
            Err(FatalError::RootNotDirectory { .. })
        ));
    }

    #[test]
    fn test_checksum_matches_known_digest() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("abc.txt");
        fs::write(&file, "abc").unwrap();

        let checksum = LocalFs.checksum(&file).unwrap();
        assert_eq!(
            checksum.to_string(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_dot_files_are_hidden() {
        let entry = RawEntry {
            path: PathBuf::from("/tmp/.profile"),
            size: 0,
            modified: SystemTime::UNIX_EPOCH,
            is_dir: false,
        };
        assert!(LocalFs.is_hidden(&entry));
    }

    #[test]
    fn test_same_file_through_relative_components() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("sub")).unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();

        let roundabout = root.join("sub").join("..").join("a.txt");
        assert!(LocalFs.same_file(&root.join("a.txt"), &roundabout));
        assert!(!LocalFs.same_file(&root.join("a.txt"), &root.join("missing.txt")));
    }
}
