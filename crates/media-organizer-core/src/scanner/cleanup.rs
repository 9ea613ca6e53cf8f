use super::walk::{is_walkable, IgnoreSet, MediaKind};
use crate::platform;
use crate::progress::RunLog;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Deletes every visible file under `root` that is neither a video nor a subtitle.
/// Returns the number of files removed.
pub fn remove_unwanted_files(root: &Path, ignore: &IgnoreSet, log: &RunLog) -> usize {
    let mut removed = 0;
    for entry in WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| is_walkable(entry, ignore))
        .filter_map(|entry| entry.ok())
    {
        let path = entry.path();
        if !entry.file_type().is_file()
            || platform::is_hidden(path)
            || MediaKind::of(path) != MediaKind::Other
        {
            continue;
        }
        match fs::remove_file(path) {
            Ok(()) => {
                log.info(format!("Deleted file '{}'", path.display()));
                removed += 1;
            }
            Err(e) => log.error(format!("Error deleting file '{}': {}", path.display(), e)),
        }
    }
    removed
}

/// Removes empty directories below `root`, children before parents. `root` itself is kept.
/// Returns the number of directories removed.
pub fn prune_empty_dirs(root: &Path, ignore: &IgnoreSet, log: &RunLog) -> usize {
    let mut removed = 0;
    for entry in WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_entry(|entry| is_walkable(entry, ignore))
        .filter_map(|entry| entry.ok())
    {
        if !entry.file_type().is_dir() {
            continue;
        }
        let path = entry.path();
        let is_empty = fs::read_dir(path)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if !is_empty {
            continue;
        }
        match fs::remove_dir(path) {
            Ok(()) => {
                log.info(format!("Deleted empty folder '{}'", path.display()));
                removed += 1;
            }
            Err(e) => log.error(format!(
                "Error deleting folder '{}': {}",
                path.display(),
                e
            )),
        }
    }
    removed
}
