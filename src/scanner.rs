//! Traversal + admission: raw entries in, file records out.

use crate::config::CompiledFilters;
use crate::error::FatalError;
use crate::fs_ops::FileSystem;
use crate::record::FileRecord;
use std::path::Path;

/// Admitted records of one scan, in traversal order.
#[derive(Debug, Default)]
pub struct Scan {
    pub records: Vec<FileRecord>,
    /// Non-directory entries seen, admitted or not.
    pub scanned: usize,
}

/// Lists `root`, runs every entry through `filters`, and builds records for
/// the admitted ones. Entries under `exclude_dir` are dropped without being
/// counted.
///
/// # Errors
///
/// Only a missing or unreadable root is fatal.
pub fn scan(
    root: &Path,
    fs: &dyn FileSystem,
    filters: &CompiledFilters,
    exclude_dir: Option<&Path>,
) -> Result<Scan, FatalError> {
    let entries = fs.list_entries(root)?;
    let mut scan = Scan::default();

    for entry in entries {
        if let Some(excluded) = exclude_dir
            && entry.path.starts_with(excluded)
        {
            continue;
        }
        if !entry.is_dir {
            scan.scanned += 1;
        }

        let relative = entry.path.strip_prefix(root).unwrap_or(&entry.path);
        if !filters.admits(&entry, relative, fs.is_hidden(&entry)) {
            if !entry.is_dir {
                log::debug!("not admitted: {}", entry.path.display());
            }
            continue;
        }

        match FileRecord::from_entry(&entry, root) {
            Some(record) => scan.records.push(record),
            None => log::warn!("skipping nameless entry {}", entry.path.display()),
        }
    }

    log::info!(
        "scanned {} files under {}, {} admitted",
        scan.scanned,
        root.display(),
        scan.records.len()
    );
    Ok(scan)
}
