//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output, including colored output,
//! progress tracking, and run summaries. The engine never prints; everything the
//! user sees goes through [`OutputFormatter`].

use crate::executor::{Outcome, OutcomeStatus};
use crate::planner::ActionKind;
use crate::report::{RunKind, RunReport};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;

/// Manages all CLI output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
/// - Progress bars for hashing
/// - Summary tables with statistics
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use filetidy::output::OutputFormatter;
    /// OutputFormatter::success("Folder organized");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a regular message without styling.
    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a progress bar for hashing. The length is set once the number
    /// of candidate files is known.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use filetidy::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_and_clear();
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} Hashing [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// Renders one outcome as a single line, e.g. `Move a.jpg -> jpg/a.jpg`.
    pub fn outcome_line(outcome: &Outcome) -> String {
        let action = &outcome.action;
        let mut line = match (&outcome.destination, action.kind()) {
            (Some(destination), ActionKind::Move | ActionKind::Copy) => format!(
                "{} {} -> {}",
                action.kind(),
                action.source().display(),
                destination.display()
            ),
            _ => format!("{} {}", action.kind(), action.source().display()),
        };
        if let Some(requested) = &outcome.renamed_from {
            line.push_str(&format!(" (renamed, {} exists)", requested.display()));
        }
        if let Some(keeper) = action.keeper() {
            line.push_str(&format!(" [duplicate of {}]", keeper.display()));
        }
        line
    }

    /// Prints every outcome that did something or failed.
    pub fn print_outcomes(report: &RunReport) {
        for outcome in &report.outcomes {
            let line = Self::outcome_line(outcome);
            match &outcome.status {
                OutcomeStatus::Applied => Self::success(&line),
                OutcomeStatus::Simulated => Self::dry_run_notice(&line),
                OutcomeStatus::Failed(error) => Self::error(&format!("{}: {}", line, error)),
                OutcomeStatus::Unchanged => {}
            }
        }
    }

    /// Prints a summary table with file counts by bucket.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use filetidy::output::OutputFormatter;
    /// use std::collections::BTreeMap;
    ///
    /// let mut counts = BTreeMap::new();
    /// counts.insert("jpg".to_string(), 15);
    /// counts.insert("pdf".to_string(), 8);
    /// OutputFormatter::summary_table(&counts, 23);
    /// ```
    pub fn summary_table(bucket_counts: &BTreeMap<String, usize>, total_files: usize) {
        let max_bucket_len = bucket_counts
            .keys()
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
            .max(6); // At least "Bucket" width

        println!(
            "{:<width$} | {}",
            "Bucket".bold(),
            "Files".bold(),
            width = max_bucket_len
        );
        println!("{}", "-".repeat(max_bucket_len + 10));

        for (bucket, count) in bucket_counts {
            let file_word = if *count == 1 { "file" } else { "files" };
            println!(
                "{:<width$} | {} {}",
                bucket,
                count.to_string().green(),
                file_word,
                width = max_bucket_len
            );
        }

        println!("{}", "-".repeat(max_bucket_len + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            if total_files == 1 { "file" } else { "files" },
            width = max_bucket_len
        );
    }

    /// Prints the full text report for one run.
    pub fn print_report(report: &RunReport) {
        let title = match report.kind {
            RunKind::Organize(_) => "ORGANIZE SUMMARY",
            RunKind::Dedupe(_) => "DEDUPE SUMMARY",
        };

        Self::print_outcomes(report);
        Self::header(title);
        Self::plain(&format!(
            "Scanned {} files in {}, {} admitted",
            report.scanned,
            report.root.display(),
            report.admitted
        ));

        match report.kind {
            RunKind::Organize(_) => {
                let counts = report.bucket_counts();
                if !counts.is_empty() {
                    Self::summary_table(&counts, counts.values().sum());
                }
                if report.unchanged() > 0 {
                    Self::plain(&format!("{} already in place", report.unchanged()));
                }
            }
            RunKind::Dedupe(_) => {
                if report.duplicate_groups == 0 {
                    Self::info("No duplicates found.");
                } else {
                    Self::plain(&format!(
                        "{} duplicates in {} groups ({} bytes reclaimable)",
                        report.duplicates_found, report.duplicate_groups, report.wasted_bytes
                    ));
                }
            }
        }

        if report.collisions_resolved() > 0 {
            Self::info(&format!(
                "{} name collisions resolved with a numeric suffix",
                report.collisions_resolved()
            ));
        }

        if report.dry_run {
            Self::dry_run_notice(&format!(
                "{} actions simulated. No files were modified.",
                report.simulated()
            ));
        } else {
            Self::success(&format!("{} actions applied", report.applied()));
        }

        let failures = report.failures();
        if !failures.is_empty() {
            Self::warning(&format!("{} items failed:", failures.len()));
            for (path, error) in failures {
                Self::error(&format!("  {}: {}", path.display(), error));
            }
        }
    }
}
