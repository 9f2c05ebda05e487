//! filetidy - folder organization and duplicate resolution
//!
//! This library scans a directory tree, sorts files into buckets by extension
//! or modification month, groups duplicate files by name and size or by
//! SHA-256 content checksum, and applies the resulting moves, copies and
//! deletions (or simulates them in a dry run) without ever overwriting a file.

pub mod classifier;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod executor;
pub mod fs_ops;
pub mod output;
pub mod planner;
pub mod record;
pub mod report;
pub mod scanner;
pub mod simulated;

pub use classifier::{BucketKey, Classifier, ClassifyMode};
pub use config::{CompiledFilters, Config, ConfigError};
pub use duplicates::{DuplicateGroup, DuplicateIndex, DuplicateMethod, Resolution};
pub use error::{FatalError, ItemError};
pub use executor::{Executor, Outcome, OutcomeStatus};
pub use fs_ops::{FileSystem, LocalFs};
pub use planner::{ActionKind, ActionReason, DuplicateAction, PlannedAction, TransferKind};
pub use record::{Checksum, FileRecord};
pub use report::RunReport;
pub use simulated::SimulatedFs;

pub use cli::{Cli, dedupe_directory, organize_directory, run_cli};
