//! Per-run summaries handed back to the caller.
//!
//! A [`RunReport`] looks the same whether the run was real or a dry run; only
//! the outcome statuses differ (`applied` vs `simulated`).

use crate::classifier::ClassifyMode;
use crate::duplicates::{DuplicateMethod, Unresolved};
use crate::error::ItemError;
use crate::executor::{Outcome, OutcomeStatus};
use crate::planner::ActionKind;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Which phase produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Organize(ClassifyMode),
    Dedupe(DuplicateMethod),
}

#[derive(Debug)]
pub struct RunReport {
    pub root: PathBuf,
    pub kind: RunKind,
    pub dry_run: bool,
    /// Files seen by traversal, before filtering.
    pub scanned: usize,
    /// Files that passed the admission policy.
    pub admitted: usize,
    pub duplicate_groups: usize,
    pub duplicates_found: usize,
    pub wasted_bytes: u64,
    pub outcomes: Vec<Outcome>,
    /// Files left out of duplicate grouping because they could not be hashed.
    pub unresolved: Vec<Unresolved>,
}

impl RunReport {
    pub fn new(root: &Path, kind: RunKind, dry_run: bool) -> Self {
        Self {
            root: root.to_path_buf(),
            kind,
            dry_run,
            scanned: 0,
            admitted: 0,
            duplicate_groups: 0,
            duplicates_found: 0,
            wasted_bytes: 0,
            outcomes: Vec::new(),
            unresolved: Vec::new(),
        }
    }

    /// Actions of `kind` that were applied or simulated.
    pub fn count(&self, kind: ActionKind) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.action.kind() == kind && o.took_effect())
            .count()
    }

    pub fn applied(&self) -> usize {
        self.count_status(|s| matches!(s, OutcomeStatus::Applied))
    }

    pub fn simulated(&self) -> usize {
        self.count_status(|s| matches!(s, OutcomeStatus::Simulated))
    }

    pub fn unchanged(&self) -> usize {
        self.count_status(|s| matches!(s, OutcomeStatus::Unchanged))
    }

    fn count_status(&self, predicate: impl Fn(&OutcomeStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.status)).count()
    }

    pub fn collisions_resolved(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.renamed_from.is_some())
            .count()
    }

    /// Every per-item failure: unhashable files first, then failed actions.
    pub fn failures(&self) -> Vec<(&Path, &ItemError)> {
        let unresolved = self
            .unresolved
            .iter()
            .map(|u| (u.path.as_path(), &u.error));
        let failed = self
            .outcomes
            .iter()
            .filter_map(|o| o.error().map(|e| (o.action.source(), e)));
        unresolved.chain(failed).collect()
    }

    /// Files placed (or that would be placed) per bucket, for organize runs.
    pub fn bucket_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for outcome in self.outcomes.iter().filter(|o| o.took_effect()) {
            if let Some(bucket) = outcome.action.bucket() {
                *counts.entry(bucket.to_string()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Machine-readable form of the report.
    pub fn to_json(&self) -> Value {
        let (command, mode) = match self.kind {
            RunKind::Organize(mode) => ("organize", mode.to_string()),
            RunKind::Dedupe(method) => ("dedupe", method.to_string()),
        };

        json!({
            "command": command,
            "mode": mode,
            "root": self.root.to_string_lossy().to_string(),
            "dry_run": self.dry_run,
            "scanned": self.scanned,
            "admitted": self.admitted,
            "duplicate_groups": self.duplicate_groups,
            "duplicates_found": self.duplicates_found,
            "wasted_bytes": self.wasted_bytes,
            "applied": self.applied(),
            "simulated": self.simulated(),
            "unchanged": self.unchanged(),
            "outcomes": self.outcomes.iter().map(outcome_json).collect::<Vec<_>>(),
            "failures": self.failures().iter().map(|(path, error)| {
                json!({
                    "path": path.to_string_lossy().to_string(),
                    "kind": error.kind(),
                    "message": error.to_string(),
                })
            }).collect::<Vec<_>>(),
        })
    }
}

fn outcome_json(outcome: &Outcome) -> Value {
    let path_value =
        |path: Option<&Path>| path.map(|p| Value::String(p.to_string_lossy().to_string()));

    json!({
        "kind": outcome.action.kind(),
        "reason": outcome.action.reason(),
        "source": outcome.action.source().to_string_lossy().to_string(),
        "destination": path_value(outcome.destination.as_deref()),
        "renamed_from": path_value(outcome.renamed_from.as_deref()),
        "keeper": path_value(outcome.action.keeper()),
        "status": outcome.status.label(),
        "error": outcome.error().map(|e| e.to_string()),
    })
}
