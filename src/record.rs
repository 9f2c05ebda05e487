//! Immutable per-file descriptors built from admitted traversal entries.

use crate::error::ItemError;
use crate::fs_ops::{FileSystem, RawEntry};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};

/// SHA-256 digest of a file's full content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Checksum([u8; 32]);

impl From<[u8; 32]> for Checksum {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Checksum {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// One scanned file as seen at scan time.
///
/// Everything but the checksum is fixed at construction. The checksum is only
/// filled in by [`FileRecord::ensure_checksum`], because hashing reads the
/// whole file.
#[derive(Debug, Clone)]
pub struct FileRecord {
    path: PathBuf,
    relative_path: PathBuf,
    file_name: String,
    extension: String,
    modified_at: DateTime<Utc>,
    size: u64,
    checksum: Option<Checksum>,
}

impl FileRecord {
    /// Builds a record for an admitted entry found below `root`.
    ///
    /// Returns `None` for entries without a file name (only `..`-style paths).
    pub fn from_entry(entry: &RawEntry, root: &Path) -> Option<Self> {
        let file_name = entry.path.file_name()?.to_string_lossy().into_owned();
        let relative_path = entry
            .path
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(&file_name));

        Some(Self {
            path: entry.path.clone(),
            relative_path,
            extension: normalize_extension(&entry.path),
            file_name,
            modified_at: DateTime::<Utc>::from(entry.modified),
            size: entry.size,
            checksum: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path below the scanned root.
    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Lowercase extension without the dot; empty when the file has none.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// The cached checksum, if one has been computed.
    pub fn checksum(&self) -> Option<&Checksum> {
        self.checksum.as_ref()
    }

    /// Computes the checksum on first call and caches it for the rest of the run.
    ///
    /// # Errors
    ///
    /// Returns [`ItemError::Hash`] when the file cannot be read.
    pub fn ensure_checksum(&mut self, fs: &dyn FileSystem) -> Result<Checksum, ItemError> {
        if let Some(checksum) = self.checksum {
            return Ok(checksum);
        }

        let checksum = fs.checksum(&self.path).map_err(|e| ItemError::Hash {
            path: self.path.clone(),
            source: e,
        })?;
        self.checksum = Some(checksum);
        Ok(checksum)
    }
}

fn normalize_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
