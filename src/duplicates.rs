//! Duplicate detection.
//!
//! Records are fed, in traversal order, into a [`DuplicateIndex`] owned by the
//! caller. The index keys each record by name and size or by content checksum,
//! and [`DuplicateIndex::finish`] yields the groups with at least two members.
//! The first record seen for a key is the group's keeper.

use crate::error::ItemError;
use crate::fs_ops::FileSystem;
use crate::record::{Checksum, FileRecord};
use clap::ValueEnum;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// How two files are judged to be duplicates.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateMethod {
    /// Same file name and same size. No content is read.
    NameSize,
    /// Identical SHA-256 of the full content.
    #[default]
    Checksum,
}

impl fmt::Display for DuplicateMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateMethod::NameSize => write!(f, "name-size"),
            DuplicateMethod::Checksum => write!(f, "checksum"),
        }
    }
}

/// The value records are grouped by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DuplicateKey {
    NameSize { name: String, size: u64 },
    Checksum(Checksum),
}

impl fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateKey::NameSize { name, size } => write!(f, "{} ({} bytes)", name, size),
            DuplicateKey::Checksum(checksum) => write!(f, "sha256:{}", checksum),
        }
    }
}

/// Records sharing one duplicate key, in encounter order. Always has at least
/// two members.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    key: DuplicateKey,
    members: Vec<FileRecord>,
}

impl DuplicateGroup {
    /// Returns `None` unless there is a keeper and at least one duplicate.
    pub fn new(key: DuplicateKey, members: Vec<FileRecord>) -> Option<Self> {
        (members.len() > 1).then_some(Self { key, members })
    }

    pub fn key(&self) -> &DuplicateKey {
        &self.key
    }

    /// Keeper first, then duplicates in encounter order.
    pub fn members(&self) -> &[FileRecord] {
        &self.members
    }

    /// The retained member: the first one encountered.
    pub fn keeper(&self) -> &FileRecord {
        &self.members[0]
    }

    /// Every member except the keeper.
    pub fn duplicates(&self) -> &[FileRecord] {
        &self.members[1..]
    }

    /// Bytes that would be reclaimed by removing every duplicate.
    pub fn wasted_bytes(&self) -> u64 {
        self.duplicates().iter().map(FileRecord::size).sum()
    }
}

/// A record left out of grouping because its key could not be computed.
#[derive(Debug)]
pub struct Unresolved {
    pub path: PathBuf,
    pub error: ItemError,
}

/// Result of one resolution pass.
#[derive(Debug, Default)]
pub struct Resolution {
    pub groups: Vec<DuplicateGroup>,
    pub unresolved: Vec<Unresolved>,
}

impl Resolution {
    /// Number of non-keeper members across all groups.
    pub fn duplicate_count(&self) -> usize {
        self.groups.iter().map(|g| g.duplicates().len()).sum()
    }

    pub fn wasted_bytes(&self) -> u64 {
        self.groups.iter().map(DuplicateGroup::wasted_bytes).sum()
    }
}

/// Options controlling key derivation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    pub method: DuplicateMethod,
    /// Compare names lowercased under [`DuplicateMethod::NameSize`].
    pub case_insensitive_names: bool,
}

/// Accumulator mapping duplicate keys to their members.
///
/// Built fresh for every run; nothing about it outlives the caller.
pub struct DuplicateIndex {
    options: ResolveOptions,
    order: Vec<DuplicateKey>,
    members: HashMap<DuplicateKey, Vec<FileRecord>>,
    unresolved: Vec<Unresolved>,
}

impl DuplicateIndex {
    pub fn new(options: ResolveOptions) -> Self {
        Self {
            options,
            order: Vec::new(),
            members: HashMap::new(),
            unresolved: Vec::new(),
        }
    }

    /// Adds one record. A record whose checksum cannot be computed is set aside
    /// as unresolved instead of failing the pass.
    pub fn insert(&mut self, mut record: FileRecord, fs: &dyn FileSystem) {
        let key = match self.key_for(&mut record, fs) {
            Ok(key) => key,
            Err(error) => {
                log::warn!("excluding from duplicate search: {}", error);
                self.unresolved.push(Unresolved {
                    path: record.path().to_path_buf(),
                    error,
                });
                return;
            }
        };

        match self.members.get_mut(&key) {
            Some(group) => group.push(record),
            None => {
                self.order.push(key.clone());
                self.members.insert(key, vec![record]);
            }
        }
    }

    fn key_for(
        &self,
        record: &mut FileRecord,
        fs: &dyn FileSystem,
    ) -> Result<DuplicateKey, ItemError> {
        match self.options.method {
            DuplicateMethod::NameSize => {
                let name = if self.options.case_insensitive_names {
                    record.file_name().to_lowercase()
                } else {
                    record.file_name().to_string()
                };
                Ok(DuplicateKey::NameSize {
                    name,
                    size: record.size(),
                })
            }
            DuplicateMethod::Checksum => record.ensure_checksum(fs).map(DuplicateKey::Checksum),
        }
    }

    /// Emits groups ordered by first encounter of their key, dropping singletons.
    pub fn finish(mut self) -> Resolution {
        let groups = self
            .order
            .into_iter()
            .filter_map(|key| {
                let members = self.members.remove(&key)?;
                DuplicateGroup::new(key, members)
            })
            .collect();

        Resolution {
            groups,
            unresolved: self.unresolved,
        }
    }
}

/// Groups `records` (in traversal order) into duplicate groups.
///
/// Under the checksum method, a record whose size no other record shares cannot
/// have a content twin, so it is never hashed.
pub fn resolve(
    records: Vec<FileRecord>,
    options: ResolveOptions,
    fs: &dyn FileSystem,
    progress: Option<&ProgressBar>,
) -> Resolution {
    let candidates: Vec<FileRecord> = match options.method {
        DuplicateMethod::NameSize => records,
        DuplicateMethod::Checksum => {
            let mut size_counts: HashMap<u64, usize> = HashMap::new();
            for record in &records {
                *size_counts.entry(record.size()).or_insert(0) += 1;
            }
            records
                .into_iter()
                .filter(|record| size_counts.get(&record.size()).copied().unwrap_or(0) > 1)
                .collect()
        }
    };

    if let Some(pb) = progress {
        pb.set_length(candidates.len() as u64);
    }

    let mut index = DuplicateIndex::new(options);
    for record in candidates {
        if let Some(pb) = progress {
            pb.set_message(record.file_name().to_string());
        }
        index.insert(record, fs);
        if let Some(pb) = progress {
            pb.inc(1);
        }
    }

    index.finish()
}
