//! Bucket classification for `--organize`.
//!
//! A bucket key names the subfolder of the scanned root a file belongs in:
//! its lowercase extension when organizing by type, or its modification
//! year-month when organizing by date.
//!
//! # Examples
//!
//! ```
//! use filetidy::classifier::{Classifier, ClassifyMode};
//! use filetidy::fs_ops::RawEntry;
//! use filetidy::record::FileRecord;
//! use std::path::{Path, PathBuf};
//! use std::time::{Duration, SystemTime};
//!
//! let entry = RawEntry {
//!     path: PathBuf::from("/data/Report.PDF"),
//!     size: 120,
//!     modified: SystemTime::UNIX_EPOCH + Duration::from_secs(1_710_000_000),
//!     is_dir: false,
//! };
//! let record = FileRecord::from_entry(&entry, Path::new("/data")).unwrap();
//! let classifier = Classifier::default();
//!
//! assert_eq!(classifier.classify(&record, ClassifyMode::Type).as_str(), "pdf");
//! assert_eq!(classifier.classify(&record, ClassifyMode::Date).as_str(), "2024-03");
//! ```

use crate::record::FileRecord;
use chrono::Local;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// How `--organize` derives bucket keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassifyMode {
    /// One folder per lowercase extension.
    Type,
    /// One folder per modification month (`YYYY-MM`).
    Date,
}

impl fmt::Display for ClassifyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifyMode::Type => write!(f, "type"),
            ClassifyMode::Date => write!(f, "date"),
        }
    }
}

/// Timezone in which month boundaries are evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timezone {
    #[default]
    Utc,
    /// The host's local timezone.
    Local,
}

/// Destination subfolder name for one file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey(String);

impl BucketKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `root/<bucket>/<file_name>`.
    pub fn destination(&self, root: &Path, file_name: &str) -> PathBuf {
        root.join(&self.0).join(file_name)
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps records to bucket keys. Holds only settings, so the same record and
/// mode always give the same key.
#[derive(Debug, Clone)]
pub struct Classifier {
    no_extension_bucket: String,
    timezone: Timezone,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new("no_extension", Timezone::Utc)
    }
}

impl Classifier {
    pub fn new(no_extension_bucket: impl Into<String>, timezone: Timezone) -> Self {
        Self {
            no_extension_bucket: no_extension_bucket.into(),
            timezone,
        }
    }

    pub fn classify(&self, record: &FileRecord, mode: ClassifyMode) -> BucketKey {
        match mode {
            ClassifyMode::Type => self.by_type(record),
            ClassifyMode::Date => self.by_date(record),
        }
    }

    fn by_type(&self, record: &FileRecord) -> BucketKey {
        if record.extension().is_empty() {
            BucketKey(self.no_extension_bucket.clone())
        } else {
            BucketKey(record.extension().to_string())
        }
    }

    fn by_date(&self, record: &FileRecord) -> BucketKey {
        let modified = record.modified_at();
        let month = match self.timezone {
            Timezone::Utc => modified.format("%Y-%m").to_string(),
            Timezone::Local => modified.with_timezone(&Local).format("%Y-%m").to_string(),
        };
        BucketKey(month)
    }
}
