/// Turning classification and duplicate decisions into filesystem actions.
///
/// The planner never touches the disk. It emits [`PlannedAction`]s in a
/// deterministic order (traversal order for organize, group order then
/// member order for duplicates) which the executor then applies one by one.
use crate::classifier::{BucketKey, Classifier, ClassifyMode};
use crate::duplicates::DuplicateGroup;
use crate::record::FileRecord;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// How `--organize` places a file into its bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferKind {
    #[default]
    Move,
    Copy,
}

/// What happens to each non-keeper member of a duplicate group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateAction {
    #[default]
    Delete,
    /// Move into the quarantine folder.
    Move,
    /// Copy into the quarantine folder, leaving the duplicate in place.
    Copy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Move,
    Copy,
    Delete,
    Skip,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionKind::Move => "Move",
            ActionKind::Copy => "Copy",
            ActionKind::Delete => "Delete",
            ActionKind::Skip => "Skip",
        };
        f.write_str(label)
    }
}

impl From<TransferKind> for ActionKind {
    fn from(kind: TransferKind) -> Self {
        match kind {
            TransferKind::Move => ActionKind::Move,
            TransferKind::Copy => ActionKind::Copy,
        }
    }
}

impl From<DuplicateAction> for ActionKind {
    fn from(action: DuplicateAction) -> Self {
        match action {
            DuplicateAction::Delete => ActionKind::Delete,
            DuplicateAction::Move => ActionKind::Move,
            DuplicateAction::Copy => ActionKind::Copy,
        }
    }
}

/// Why an action was planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionReason {
    Organize,
    Duplicate,
}

/// One intended filesystem operation.
///
/// Built only through the constructors, so `destination` is present exactly
/// for move and copy actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAction {
    kind: ActionKind,
    source: PathBuf,
    destination: Option<PathBuf>,
    reason: ActionReason,
    bucket: Option<BucketKey>,
    keeper: Option<PathBuf>,
}

impl PlannedAction {
    /// A move or copy of `source` to `destination`.
    pub fn transfer(
        kind: TransferKind,
        source: PathBuf,
        destination: PathBuf,
        reason: ActionReason,
    ) -> Self {
        Self {
            kind: kind.into(),
            source,
            destination: Some(destination),
            reason,
            bucket: None,
            keeper: None,
        }
    }

    pub fn delete(source: PathBuf, reason: ActionReason) -> Self {
        Self {
            kind: ActionKind::Delete,
            source,
            destination: None,
            reason,
            bucket: None,
            keeper: None,
        }
    }

    pub fn skip(source: PathBuf, reason: ActionReason) -> Self {
        Self {
            kind: ActionKind::Skip,
            source,
            destination: None,
            reason,
            bucket: None,
            keeper: None,
        }
    }

    fn in_bucket(mut self, bucket: BucketKey) -> Self {
        self.bucket = Some(bucket);
        self
    }

    fn duplicate_of(mut self, keeper: &Path) -> Self {
        self.keeper = Some(keeper.to_path_buf());
        self
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Requested destination, before any collision disambiguation.
    pub fn destination(&self) -> Option<&Path> {
        self.destination.as_deref()
    }

    pub fn reason(&self) -> ActionReason {
        self.reason
    }

    /// Bucket targeted by an organize action.
    pub fn bucket(&self) -> Option<&BucketKey> {
        self.bucket.as_ref()
    }

    /// Keeper of the group a duplicate action belongs to.
    pub fn keeper(&self) -> Option<&Path> {
        self.keeper.as_deref()
    }
}

/// One organize action per record, targeting `root/<bucket>/<file_name>`.
///
/// A record already sitting at its destination gets a skip.
pub fn plan_organize(
    records: &[FileRecord],
    root: &Path,
    classifier: &Classifier,
    mode: ClassifyMode,
    transfer: TransferKind,
) -> Vec<PlannedAction> {
    records
        .iter()
        .map(|record| {
            let bucket = classifier.classify(record, mode);
            let destination = bucket.destination(root, record.file_name());
            let action = if destination == record.path() {
                PlannedAction::skip(record.path().to_path_buf(), ActionReason::Organize)
            } else {
                PlannedAction::transfer(
                    transfer,
                    record.path().to_path_buf(),
                    destination,
                    ActionReason::Organize,
                )
            };
            action.in_bucket(bucket)
        })
        .collect()
}

/// One action per non-keeper member of each group.
///
/// Move and copy target `root/<quarantine_dir>/<file_name>`.
pub fn plan_duplicates(
    groups: &[DuplicateGroup],
    root: &Path,
    action: DuplicateAction,
    quarantine_dir: &str,
) -> Vec<PlannedAction> {
    let quarantine = root.join(quarantine_dir);
    let mut plan = Vec::new();

    for group in groups {
        let keeper = group.keeper().path();
        for duplicate in group.duplicates() {
            let source = duplicate.path().to_path_buf();
            let planned = match action {
                DuplicateAction::Delete => PlannedAction::delete(source, ActionReason::Duplicate),
                DuplicateAction::Move => PlannedAction::transfer(
                    TransferKind::Move,
                    source,
                    quarantine.join(duplicate.file_name()),
                    ActionReason::Duplicate,
                ),
                DuplicateAction::Copy => PlannedAction::transfer(
                    TransferKind::Copy,
                    source,
                    quarantine.join(duplicate.file_name()),
                    ActionReason::Duplicate,
                ),
            };
            plan.push(planned.duplicate_of(keeper));
        }
    }

    plan
}
