//! Applying (or simulating) a plan.
//!
//! Every [`PlannedAction`] gets exactly one [`Outcome`]. Failures stay on their
//! outcome and never stop later actions. Destinations that already exist are
//! never overwritten: the file name stem gets `_1`, `_2`, ... appended instead.
//!
//! The executor tracks the paths its own actions have claimed and vacated, so a
//! dry run resolves collisions against the tree as it would look mid-run, and
//! reports the same destinations a real run produces.

use crate::error::ItemError;
use crate::fs_ops::FileSystem;
use crate::planner::{ActionKind, PlannedAction};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// What happened to one planned action.
#[derive(Debug)]
pub enum OutcomeStatus {
    /// Performed on disk.
    Applied,
    /// Would have been performed; dry run.
    Simulated,
    /// Nothing to do: a skip, or source and destination are the same file.
    Unchanged,
    Failed(ItemError),
}

impl OutcomeStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OutcomeStatus::Applied => "applied",
            OutcomeStatus::Simulated => "simulated",
            OutcomeStatus::Unchanged => "unchanged",
            OutcomeStatus::Failed(_) => "failed",
        }
    }
}

#[derive(Debug)]
pub struct Outcome {
    pub action: PlannedAction,
    /// Final destination after collision disambiguation.
    pub destination: Option<PathBuf>,
    /// Set when the requested destination was taken and a suffixed name was used.
    pub renamed_from: Option<PathBuf>,
    pub status: OutcomeStatus,
}

impl Outcome {
    fn new(action: PlannedAction, status: OutcomeStatus) -> Self {
        Self {
            action,
            destination: None,
            renamed_from: None,
            status,
        }
    }

    fn failed(action: PlannedAction, error: ItemError) -> Self {
        Self::new(action, OutcomeStatus::Failed(error))
    }

    /// Applied for real or simulated in a dry run.
    pub fn took_effect(&self) -> bool {
        matches!(
            self.status,
            OutcomeStatus::Applied | OutcomeStatus::Simulated
        )
    }

    pub fn error(&self) -> Option<&ItemError> {
        match &self.status {
            OutcomeStatus::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// Paths created or removed by earlier actions of this run.
#[derive(Debug, Default)]
struct Overlay {
    claimed: HashSet<PathBuf>,
    vacated: HashSet<PathBuf>,
}

impl Overlay {
    fn exists(&self, fs: &dyn FileSystem, path: &Path) -> bool {
        self.claimed.contains(path) || (!self.vacated.contains(path) && fs.exists(path))
    }

    fn claim(&mut self, path: &Path) {
        self.vacated.remove(path);
        self.claimed.insert(path.to_path_buf());
    }

    fn vacate(&mut self, path: &Path) {
        self.claimed.remove(path);
        self.vacated.insert(path.to_path_buf());
    }
}

/// Applies plans in order against a [`FileSystem`].
pub struct Executor<'a> {
    fs: &'a dyn FileSystem,
    dry_run: bool,
    overlay: Overlay,
}

impl<'a> Executor<'a> {
    pub fn new(fs: &'a dyn FileSystem, dry_run: bool) -> Self {
        Self {
            fs,
            dry_run,
            overlay: Overlay::default(),
        }
    }

    /// Runs every item in plan order and returns one outcome per item.
    pub fn execute(&mut self, items: Vec<PlannedAction>) -> Vec<Outcome> {
        items.into_iter().map(|item| self.apply(item)).collect()
    }

    fn apply(&mut self, action: PlannedAction) -> Outcome {
        match action.kind() {
            ActionKind::Skip => Outcome::new(action, OutcomeStatus::Unchanged),
            ActionKind::Delete => self.apply_delete(action),
            ActionKind::Move | ActionKind::Copy => self.apply_transfer(action),
        }
    }

    fn done(&self) -> OutcomeStatus {
        if self.dry_run {
            OutcomeStatus::Simulated
        } else {
            OutcomeStatus::Applied
        }
    }

    /// Shared preconditions: the source is still there, and for a duplicate
    /// action, so is the keeper it duplicates.
    fn check_preconditions(&self, action: &PlannedAction) -> Result<(), ItemError> {
        if !self.overlay.exists(self.fs, action.source()) {
            return Err(ItemError::MissingSource {
                path: action.source().to_path_buf(),
            });
        }
        if let Some(keeper) = action.keeper()
            && !self.overlay.exists(self.fs, keeper)
        {
            return Err(ItemError::MissingKeeper {
                path: keeper.to_path_buf(),
            });
        }
        Ok(())
    }

    fn apply_delete(&mut self, action: PlannedAction) -> Outcome {
        if let Err(e) = self.check_preconditions(&action) {
            return Outcome::failed(action, e);
        }

        let source = action.source().to_path_buf();
        if !self.dry_run
            && let Err(e) = self.fs.delete_file(&source)
        {
            return Outcome::failed(action, ItemError::Delete { path: source, source: e });
        }

        self.overlay.vacate(&source);
        let status = self.done();
        Outcome::new(action, status)
    }

    fn apply_transfer(&mut self, action: PlannedAction) -> Outcome {
        let Some(requested) = action.destination().map(Path::to_path_buf) else {
            return Outcome::new(action, OutcomeStatus::Unchanged);
        };

        if let Err(e) = self.check_preconditions(&action) {
            return Outcome::failed(action, e);
        }

        let source = action.source().to_path_buf();
        if self.fs.same_file(&source, &requested) {
            log::debug!("{} is already in place", source.display());
            let mut outcome = Outcome::new(action, OutcomeStatus::Unchanged);
            outcome.destination = Some(requested);
            return outcome;
        }

        if action.kind() == ActionKind::Copy && self.holds_copy_of(&requested, &source) {
            log::debug!("{} already holds a copy of {}", requested.display(), source.display());
            let mut outcome = Outcome::new(action, OutcomeStatus::Unchanged);
            outcome.destination = Some(requested);
            return outcome;
        }

        let destination = match self.free_destination(&requested) {
            Ok(path) => path,
            Err(e) => return Outcome::failed(action, e),
        };
        let renamed_from = (destination != requested).then(|| {
            log::info!(
                "collision resolved: {} exists, using {}",
                requested.display(),
                destination.display()
            );
            requested.clone()
        });

        if !self.dry_run
            && let Err(e) = self.transfer(action.kind(), &source, &destination)
        {
            return Outcome::failed(action, e);
        }

        self.overlay.claim(&destination);
        if action.kind() == ActionKind::Move {
            self.overlay.vacate(&source);
        }

        let status = self.done();
        Outcome {
            action,
            destination: Some(destination),
            renamed_from,
            status,
        }
    }

    fn transfer(&self, kind: ActionKind, source: &Path, destination: &Path) -> Result<(), ItemError> {
        if let Some(parent) = destination.parent() {
            self.fs.make_dirs(parent).map_err(|e| ItemError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        match kind {
            ActionKind::Copy => self.fs.copy_file(source, destination).map_err(|e| ItemError::Copy {
                from: source.to_path_buf(),
                to: destination.to_path_buf(),
                source: e,
            }),
            _ => self.fs.move_file(source, destination).map_err(|e| ItemError::Move {
                from: source.to_path_buf(),
                to: destination.to_path_buf(),
                source: e,
            }),
        }
    }

    /// True when `destination` was on disk before this run and its content
    /// matches `source`. Paths written by this run never count, so a second
    /// source with the same content still gets its own name.
    fn holds_copy_of(&self, destination: &Path, source: &Path) -> bool {
        if self.overlay.claimed.contains(destination)
            || self.overlay.vacated.contains(destination)
            || !self.fs.exists(destination)
        {
            return false;
        }
        matches!(
            (self.fs.checksum(source), self.fs.checksum(destination)),
            (Ok(a), Ok(b)) if a == b
        )
    }

    /// `requested` if nothing occupies it, else the first free `stem_N.ext`.
    fn free_destination(&self, requested: &Path) -> Result<PathBuf, ItemError> {
        if !self.overlay.exists(self.fs, requested) {
            return Ok(requested.to_path_buf());
        }

        let stem = requested
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| ItemError::NoFileName {
                path: requested.to_path_buf(),
            })?;
        let extension = requested
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let parent = requested.parent().unwrap_or_else(|| Path::new(""));

        let mut counter = 1u32;
        loop {
            let candidate = parent.join(format!("{}_{}{}", stem, counter, extension));
            if !self.overlay.exists(self.fs, &candidate) {
                return Ok(candidate);
            }
            counter += 1;
        }
    }
}
