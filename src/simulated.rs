//! The tree as a dry run left it.
//!
//! A dry run never touches the disk, so a later phase scanning the same folder
//! would still see the original layout. [`SimulatedFs`] lays the moves and
//! copies reported by earlier outcomes over another [`FileSystem`], and that
//! phase then plans against the tree a real run would have produced.

use crate::error::FatalError;
use crate::executor::Outcome;
use crate::fs_ops::{FileSystem, RawEntry};
use crate::planner::ActionKind;
use crate::record::Checksum;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

/// Read-only view of `root` after a set of simulated moves and copies.
pub struct SimulatedFs<'a> {
    base: &'a dyn FileSystem,
    root: PathBuf,
    /// Every entry under `root` as it would be after the run.
    entries: Vec<RawEntry>,
    /// Simulated path -> path of the content on disk.
    origins: HashMap<PathBuf, PathBuf>,
    vacated: HashSet<PathBuf>,
}

impl<'a> SimulatedFs<'a> {
    /// Replays every move and copy in `outcomes` that took effect, over the
    /// entries currently under `root`.
    ///
    /// # Errors
    ///
    /// Fails like [`FileSystem::list_entries`] when `root` cannot be listed.
    pub fn new(
        base: &'a dyn FileSystem,
        root: &Path,
        outcomes: &[Outcome],
    ) -> Result<Self, FatalError> {
        let mut placements: HashMap<&Path, Vec<(ActionKind, &Path)>> = HashMap::new();
        for outcome in outcomes.iter().filter(|o| o.took_effect()) {
            let kind = outcome.action.kind();
            if let (ActionKind::Move | ActionKind::Copy, Some(destination)) =
                (kind, outcome.destination.as_deref())
            {
                placements
                    .entry(outcome.action.source())
                    .or_default()
                    .push((kind, destination));
            }
        }

        let mut entries = Vec::new();
        let mut origins = HashMap::new();
        let mut vacated = HashSet::new();

        for entry in base.list_entries(root)? {
            let Some(placed) = placements.get(entry.path.as_path()) else {
                entries.push(entry);
                continue;
            };

            let mut moved = false;
            for &(kind, destination) in placed {
                origins.insert(destination.to_path_buf(), entry.path.clone());
                entries.push(RawEntry {
                    path: destination.to_path_buf(),
                    ..entry.clone()
                });
                moved |= kind == ActionKind::Move;
            }
            if moved {
                vacated.insert(entry.path.clone());
            } else {
                entries.push(entry);
            }
        }

        log::debug!(
            "simulated tree under {}: {} relocated entries",
            root.display(),
            origins.len()
        );

        Ok(Self {
            base,
            root: root.to_path_buf(),
            entries,
            origins,
            vacated,
        })
    }

    /// Where the content shown at `path` lives on disk.
    fn on_disk<'p>(&'p self, path: &'p Path) -> &'p Path {
        self.origins.get(path).map(PathBuf::as_path).unwrap_or(path)
    }

    fn is_simulated(&self, path: &Path) -> bool {
        self.origins.contains_key(path) || self.vacated.contains(path)
    }
}

fn read_only(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("{} belongs to a simulated tree", path.display()),
    )
}

impl FileSystem for SimulatedFs<'_> {
    /// Entries outside the simulated root come from disk as usual.
    fn list_entries(&self, root: &Path) -> Result<Vec<RawEntry>, FatalError> {
        let mut entries: Vec<RawEntry> = self
            .base
            .list_entries(root)?
            .into_iter()
            .filter(|e| !e.path.starts_with(&self.root))
            .collect();

        entries.extend(
            self.entries
                .iter()
                .filter(|e| e.path.starts_with(root) && e.path != root)
                .cloned(),
        );
        // Component-wise order matches the name-sorted, depth-first walk.
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    fn is_hidden(&self, entry: &RawEntry) -> bool {
        let on_disk = RawEntry {
            path: self.on_disk(&entry.path).to_path_buf(),
            ..entry.clone()
        };
        self.base.is_hidden(&on_disk)
    }

    fn checksum(&self, path: &Path) -> io::Result<Checksum> {
        self.base.checksum(self.on_disk(path))
    }

    fn exists(&self, path: &Path) -> bool {
        self.origins.contains_key(path)
            || (!self.vacated.contains(path) && self.base.exists(path))
    }

    fn same_file(&self, a: &Path, b: &Path) -> bool {
        if a == b {
            return true;
        }
        if self.is_simulated(a) || self.is_simulated(b) {
            return false;
        }
        self.base.same_file(a, b)
    }

    fn move_file(&self, from: &Path, _to: &Path) -> io::Result<()> {
        Err(read_only(from))
    }

    fn copy_file(&self, from: &Path, _to: &Path) -> io::Result<()> {
        Err(read_only(from))
    }

    fn delete_file(&self, path: &Path) -> io::Result<()> {
        Err(read_only(path))
    }

    fn make_dirs(&self, path: &Path) -> io::Result<()> {
        Err(read_only(path))
    }
}
