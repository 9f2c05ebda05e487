//! Error types shared by the scan, resolve and execute stages.
//!
//! A [`FatalError`] stops a run before any action is applied. An [`ItemError`]
//! belongs to a single file and is recorded on that file's outcome.

use crate::config::ConfigError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Conditions that abort a run before any filesystem action happens.
#[derive(Debug, Error)]
pub enum FatalError {
    /// The folder to organize or deduplicate does not exist.
    #[error("root folder {} does not exist", .path.display())]
    RootMissing { path: PathBuf },

    /// The root path exists but is not a directory.
    #[error("root path {} is not a directory", .path.display())]
    RootNotDirectory { path: PathBuf },

    /// The root folder could not be listed.
    #[error("cannot read root folder {}: {source}", .path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configuration could not be loaded or compiled.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A failure confined to one file. Recorded, never propagated past the executor.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("cannot read {} for hashing: {source}", .path.display())]
    Hash {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("source {} no longer exists", .path.display())]
    MissingSource { path: PathBuf },

    #[error("keeper {} no longer exists, refusing to touch its duplicate", .path.display())]
    MissingKeeper { path: PathBuf },

    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to move {} to {}: {source}", .from.display(), .to.display())]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to copy {} to {}: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to delete {}: {source}", .path.display())]
    Delete {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} has no file name component", .path.display())]
    NoFileName { path: PathBuf },
}

impl ItemError {
    /// Short machine-readable label used in JSON reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ItemError::Hash { .. } => "hash",
            ItemError::MissingSource { .. } => "missing_source",
            ItemError::MissingKeeper { .. } => "missing_keeper",
            ItemError::CreateDir { .. } => "create_dir",
            ItemError::Move { .. } => "move",
            ItemError::Copy { .. } => "copy",
            ItemError::Delete { .. } => "delete",
            ItemError::NoFileName { .. } => "no_file_name",
        }
    }
}
