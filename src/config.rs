//! Configuration loading and the entry admission policy.
//!
//! Settings are read from a TOML file. The `[filters]` table drives which
//! entries are admitted into a scan:
//! - Hidden/system file exclusion
//! - Exact filename matching
//! - Glob pattern matching on the root-relative path
//! - File extension matching
//! - Regex pattern matching on the file name
//! - Include (whitelist) rules that override exclude rules
//!
//! # Configuration File Format
//!
//! ```toml
//! [filters]
//! skip_hidden = false
//!
//! [filters.exclude]
//! filenames = ["Thumbs.db"]
//! patterns = ["*.tmp", "node_modules/**"]
//! extensions = ["bak"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//!
//! [organize]
//! action = "move"
//! timezone = "utc"
//! no_extension_bucket = "no_extension"
//!
//! [dedupe]
//! method = "checksum"
//! action = "delete"
//! quarantine_dir = "Duplicates"
//! case_insensitive_names = false
//! ```

use crate::classifier::Timezone;
use crate::duplicates::DuplicateMethod;
use crate::fs_ops::RawEntry;
use crate::planner::{DuplicateAction, TransferKind};
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".filetidyrc.toml";

/// Errors that can occur during configuration loading and compilation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
    /// Invalid glob pattern provided.
    #[error("invalid glob pattern '{0}': expected *.ext or dir/**")]
    InvalidGlobPattern(String),
    /// Invalid regex pattern provided with the actual error reason.
    #[error("invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },
    /// IO error while reading configuration.
    #[error("IO error reading configuration: {0}")]
    IoError(String),
}

/// Top-level configuration, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub filters: FilterRules,
    #[serde(default)]
    pub organize: OrganizeSettings,
    #[serde(default)]
    pub dedupe: DedupeSettings,
}

/// Admission rules applied to every scanned entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterRules {
    /// Reject hidden (leading dot) and system files. Defaults to false.
    #[serde(default)]
    pub skip_hidden: bool,

    /// Rules for excluding files.
    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Rules for including files (whitelist, overrides exclude rules).
    #[serde(default)]
    pub include: IncludeRules,
}

/// Rules for excluding files from a scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames to exclude (e.g., "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns to exclude (e.g., "*.tmp", "node_modules/**").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// File extensions to exclude (e.g., "bak", "tmp").
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regex patterns matched against the file name.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// Rules for including files, overriding exclude rules (whitelist).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    /// Glob patterns that override exclude rules.
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// Settings for `--organize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizeSettings {
    #[serde(default)]
    pub action: TransferKind,
    #[serde(default)]
    pub timezone: Timezone,
    #[serde(default = "default_no_extension_bucket")]
    pub no_extension_bucket: String,
}

fn default_no_extension_bucket() -> String {
    "no_extension".to_string()
}

impl Default for OrganizeSettings {
    fn default() -> Self {
        Self {
            action: TransferKind::default(),
            timezone: Timezone::default(),
            no_extension_bucket: default_no_extension_bucket(),
        }
    }
}

/// Settings for `--dedupe`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupeSettings {
    #[serde(default)]
    pub method: DuplicateMethod,
    #[serde(default)]
    pub action: DuplicateAction,
    /// Folder (relative to the scanned root) receiving moved or copied duplicates.
    #[serde(default = "default_quarantine_dir")]
    pub quarantine_dir: String,
    /// Compare file names case-insensitively for the name-size method.
    #[serde(default)]
    pub case_insensitive_names: bool,
}

fn default_quarantine_dir() -> String {
    "Duplicates".to_string()
}

impl Default for DedupeSettings {
    fn default() -> Self {
        Self {
            method: DuplicateMethod::default(),
            action: DuplicateAction::default(),
            quarantine_dir: default_quarantine_dir(),
            case_insensitive_names: false,
        }
    }
}

impl Config {
    /// Resolve the settings for a run.
    ///
    /// An explicit `config_path` must exist. Without one, the first of
    /// `./.filetidyrc.toml` and `~/.config/filetidy/config.toml` that exists
    /// is used, and built-in defaults apply when neither does.
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but cannot be read,
    /// or if any discovered file is not valid TOML.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("filetidy")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        log::debug!("loaded configuration from {}", path.display());

        toml::from_str(&content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }
}

impl FilterRules {
    /// Compile the rules into matchers.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex or glob patterns are invalid.
    pub fn compile(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(self)
    }
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
        })
        .collect()
}

/// Pre-compiled admission policy.
///
/// Glob and regex patterns are parsed once, so matching an entry never
/// reparses a rule.
#[derive(Debug)]
pub struct CompiledFilters {
    skip_hidden: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

impl CompiledFilters {
    fn new(rules: &FilterRules) -> Result<Self, ConfigError> {
        let exclude_patterns = compile_globs(&rules.exclude.patterns)?;
        let include_patterns = compile_globs(&rules.include.patterns)?;

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            skip_hidden: rules.skip_hidden,
            exclude_filenames: rules.exclude.filenames.iter().cloned().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns,
            exclude_regexes,
            include_patterns,
        })
    }

    /// Force hidden/system exclusion on, as `--skip-hidden` does.
    pub fn with_skip_hidden(mut self, skip_hidden: bool) -> Self {
        self.skip_hidden |= skip_hidden;
        self
    }

    /// Decide whether a scanned entry reaches the classifier and resolver.
    ///
    /// `relative_path` is the entry's path below the scanned root and `hidden`
    /// is the platform's verdict for the entry. Directories never pass.
    pub fn admits(&self, entry: &RawEntry, relative_path: &Path, hidden: bool) -> bool {
        if entry.is_dir {
            return false;
        }
        self.should_include(relative_path, hidden)
    }

    /// Path-level admission check.
    ///
    /// An include pattern match admits the file outright. Otherwise the file
    /// is rejected by the first rule it trips: hidden (when skipping), exact
    /// name, extension, glob, then regex on the file name.
    pub fn should_include(&self, file_path: &Path, hidden: bool) -> bool {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self.matches_include_patterns(file_path) {
            return true;
        }

        if self.skip_hidden && hidden {
            return false;
        }

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return false;
        }

        if let Some(ext) = file_path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext_lower) {
                return false;
            }
        }

        if self.matches_exclude_patterns(file_path) {
            return false;
        }

        !self.matches_exclude_regex(&file_name)
    }

    fn matches_include_patterns(&self, file_path: &Path) -> bool {
        self.include_patterns
            .iter()
            .any(|pattern| pattern.matches_path(file_path))
    }

    fn matches_exclude_patterns(&self, file_path: &Path) -> bool {
        self.exclude_patterns
            .iter()
            .any(|pattern| pattern.matches_path(file_path))
    }

    fn matches_exclude_regex(&self, file_name: &str) -> bool {
        self.exclude_regexes
            .iter()
            .any(|regex| regex.is_match(file_name))
    }
}
