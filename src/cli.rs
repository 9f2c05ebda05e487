//! Command-line interface module for filetidy.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing and validation
//! - Configuration loading and flag overrides
//! - Organize and dedupe orchestration
//! - Report printing

use crate::classifier::{Classifier, ClassifyMode};
use crate::config::Config;
use crate::duplicates::{DuplicateMethod, ResolveOptions, resolve};
use crate::error::FatalError;
use crate::executor::Executor;
use crate::fs_ops::{FileSystem, LocalFs, validate_root};
use crate::output::OutputFormatter;
use crate::planner::{DuplicateAction, TransferKind, plan_duplicates, plan_organize};
use crate::report::{RunKind, RunReport};
use crate::scanner::scan;
use crate::simulated::SimulatedFs;
use clap::{ArgAction, ArgGroup, Parser};
use indicatif::ProgressBar;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Organize a folder by file type or date, and find and resolve duplicate files.
#[derive(Parser, Debug, Clone)]
#[command(name = "filetidy", version, about, long_about = None)]
#[command(group(
    ArgGroup::new("target")
        .required(true)
        .multiple(true)
        .args(["organize", "dedupe"])
))]
pub struct Cli {
    /// Folder to organize
    #[arg(long, value_name = "FOLDER", requires = "by")]
    pub organize: Option<PathBuf>,

    /// Organize by file type or modification month
    #[arg(long, value_enum, requires = "organize")]
    pub by: Option<ClassifyMode>,

    /// Copy files into their buckets instead of moving them
    #[arg(long, requires = "organize")]
    pub copy: bool,

    /// Folder to deduplicate
    #[arg(long, value_name = "FOLDER")]
    pub dedupe: Option<PathBuf>,

    /// Duplicate detection method [default: checksum]
    #[arg(long, value_enum, requires = "dedupe")]
    pub method: Option<DuplicateMethod>,

    /// Action for duplicates [default: delete]
    #[arg(long, value_enum, requires = "dedupe")]
    pub action: Option<DuplicateAction>,

    /// Skip hidden and system files
    #[arg(long)]
    pub skip_hidden: bool,

    /// Report what would happen without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Configuration file (default: ./.filetidyrc.toml, then ~/.config/filetidy/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print the reports as JSON
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Command-line flags win over configuration values.
    pub fn apply_overrides(&self, config: &mut Config) {
        config.filters.skip_hidden |= self.skip_hidden;
        if self.copy {
            config.organize.action = TransferKind::Copy;
        }
        if let Some(method) = self.method {
            config.dedupe.method = method;
        }
        if let Some(action) = self.action {
            config.dedupe.action = action;
        }
    }
}

/// Runs every requested phase and prints the reports.
///
/// Both roots are validated before anything runs, so a missing folder aborts
/// with no action taken. Per-item failures do not make this return an error.
/// In a dry run, dedupe plans against the tree the organize pass would have
/// left, so both reports match what a real run does.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use filetidy::cli::{Cli, run_cli};
///
/// let cli = Cli::parse_from(["filetidy", "--organize", "/tmp/inbox", "--by", "type", "--dry-run"]);
/// match run_cli(&cli) {
///     Ok(reports) => println!("{} runs completed", reports.len()),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub fn run_cli(cli: &Cli) -> Result<Vec<RunReport>, FatalError> {
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);

    for root in [&cli.organize, &cli.dedupe].into_iter().flatten() {
        validate_root(root)?;
    }

    let fs = LocalFs;
    let mut reports = Vec::new();
    let mut organized_tree = None;

    if let (Some(root), Some(mode)) = (&cli.organize, cli.by) {
        if !cli.json {
            OutputFormatter::info(&format!("Organizing {} by {}", root.display(), mode));
        }
        let report = organize_directory(root, mode, &config, cli.dry_run, &fs)?;
        if !cli.json {
            OutputFormatter::print_report(&report);
        }
        if cli.dry_run && cli.dedupe.is_some() {
            organized_tree = Some(SimulatedFs::new(&fs, root, &report.outcomes)?);
        }
        reports.push(report);
    }

    if let Some(root) = &cli.dedupe {
        if !cli.json {
            OutputFormatter::info(&format!(
                "Looking for duplicates in {} by {}",
                root.display(),
                config.dedupe.method
            ));
        }
        let dedupe_fs: &dyn FileSystem = match &organized_tree {
            Some(tree) => tree,
            None => &fs,
        };
        let progress = hashing_progress(config.dedupe.method, cli.json);
        let report = dedupe_directory(root, &config, cli.dry_run, dedupe_fs, progress.as_ref());
        if let Some(pb) = &progress {
            pb.finish_and_clear();
        }
        let report = report?;
        if !cli.json {
            OutputFormatter::print_report(&report);
        }
        reports.push(report);
    }

    if cli.json {
        let value = Value::Array(reports.iter().map(RunReport::to_json).collect());
        OutputFormatter::plain(&format!("{:#}", value));
    }

    Ok(reports)
}

/// Only checksum runs read file content, so only they get a progress bar.
fn hashing_progress(method: DuplicateMethod, quiet: bool) -> Option<ProgressBar> {
    (!quiet && method == DuplicateMethod::Checksum)
        .then(|| OutputFormatter::create_progress_bar(0))
}

/// Moves (or copies) every admitted file under `root` into its bucket.
///
/// The quarantine folder is left alone, so duplicates set aside by an earlier
/// dedupe run stay there.
///
/// This function:
/// 1. Compiles the admission rules
/// 2. Scans the tree and builds file records
/// 3. Classifies each record into a bucket
/// 4. Plans one organize action per record
/// 5. Executes the plan, or simulates it when `dry_run` is set
///
/// # Errors
///
/// Returns a [`FatalError`] for invalid filter rules or a missing/unreadable root.
pub fn organize_directory(
    root: &Path,
    mode: ClassifyMode,
    config: &Config,
    dry_run: bool,
    fs: &dyn FileSystem,
) -> Result<RunReport, FatalError> {
    let filters = config.filters.compile()?;
    let quarantine = root.join(&config.dedupe.quarantine_dir);
    let scan = scan(root, fs, &filters, Some(&quarantine))?;

    let classifier = Classifier::new(
        config.organize.no_extension_bucket.clone(),
        config.organize.timezone,
    );
    let plan = plan_organize(&scan.records, root, &classifier, mode, config.organize.action);
    log::debug!("organize plan has {} actions", plan.len());

    let mut report = RunReport::new(root, RunKind::Organize(mode), dry_run);
    report.scanned = scan.scanned;
    report.admitted = scan.records.len();
    report.outcomes = Executor::new(fs, dry_run).execute(plan);
    Ok(report)
}

/// Finds duplicates under `root` and applies the configured duplicate action.
///
/// The quarantine folder is left out of the scan, so files quarantined by a
/// previous run never become keepers.
///
/// # Errors
///
/// Returns a [`FatalError`] for invalid filter rules or a missing/unreadable root.
pub fn dedupe_directory(
    root: &Path,
    config: &Config,
    dry_run: bool,
    fs: &dyn FileSystem,
    progress: Option<&ProgressBar>,
) -> Result<RunReport, FatalError> {
    let settings = &config.dedupe;
    let filters = config.filters.compile()?;
    let quarantine = root.join(&settings.quarantine_dir);
    let scan = scan(root, fs, &filters, Some(&quarantine))?;
    let admitted = scan.records.len();

    let options = ResolveOptions {
        method: settings.method,
        case_insensitive_names: settings.case_insensitive_names,
    };
    let resolution = resolve(scan.records, options, fs, progress);
    let plan = plan_duplicates(
        &resolution.groups,
        root,
        settings.action,
        &settings.quarantine_dir,
    );

    let mut report = RunReport::new(root, RunKind::Dedupe(settings.method), dry_run);
    report.scanned = scan.scanned;
    report.admitted = admitted;
    report.duplicate_groups = resolution.groups.len();
    report.duplicates_found = resolution.duplicate_count();
    report.wasted_bytes = resolution.wasted_bytes();
    report.outcomes = Executor::new(fs, dry_run).execute(plan);
    report.unresolved = resolution.unresolved;
    Ok(report)
}
