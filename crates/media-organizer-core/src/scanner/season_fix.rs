use super::walk::{is_walkable, IgnoreSet};
use crate::error::Error;
use crate::parser;
use crate::progress::RunLog;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn folder_name(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// Season folders sitting directly inside another season folder, deepest first.
fn nested_season_folders(root: &Path, ignore: &IgnoreSet) -> Vec<(PathBuf, usize)> {
    let mut nested: Vec<(PathBuf, usize)> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| is_walkable(entry, ignore))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir())
        .filter(|entry| {
            let own = folder_name(entry.path()).unwrap_or_default();
            let parent = entry
                .path()
                .parent()
                .and_then(folder_name)
                .unwrap_or_default();
            parser::is_season_folder(&own) && parser::is_season_folder(&parent)
        })
        .map(|entry| {
            let depth = entry.depth();
            (entry.into_path(), depth)
        })
        .collect();
    nested.sort_by(|a, b| b.1.cmp(&a.1));
    nested
}

/// Moves every season folder found inside another season folder into a new series folder
/// created in that parent, named after the folder with its `Season N` token removed.
/// Returns the number of folders moved.
pub fn fix_nested_season_folders(
    root: &Path,
    ignore: &IgnoreSet,
    log: &RunLog,
) -> Result<usize, Error> {
    let mut moved = 0;
    for (folder, _) in nested_season_folders(root, ignore) {
        let (Some(parent), Some(name)) = (folder.parent(), folder_name(&folder)) else {
            continue;
        };
        let series_folder = parent.join(parser::series_title_from_season_folder(&name));
        let target = series_folder.join(&name);
        if target.exists() {
            log.warn(format!(
                "Cannot move season folder '{}': '{}' already exists",
                folder.display(),
                target.display()
            ));
            continue;
        }

        let result = fs::create_dir_all(&series_folder).and_then(|_| fs::rename(&folder, &target));
        match result {
            Ok(()) => {
                log.info(format!(
                    "Moved season folder '{}' to '{}'",
                    folder.display(),
                    target.display()
                ));
                moved += 1;
            }
            Err(e) => log.error(format!(
                "Error moving season folder '{}': {}",
                folder.display(),
                e
            )),
        }
    }
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_nested_season_folder_gets_series_folder() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        let nested = root.join("Season 1").join("Other Show Season 2");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("ep.mkv"), "x").unwrap();

        let moved = fix_nested_season_folders(root, &IgnoreSet::default(), &RunLog::silent())
            .unwrap();
        assert_eq!(moved, 1);
        assert!(root
            .join("Season 1/Other Show/Other Show Season 2/ep.mkv")
            .exists());
        assert!(!nested.exists());
    }

    #[test]
    fn test_bare_nested_season_goes_to_unknown_series() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("Season 1/Season 2")).unwrap();

        fix_nested_season_folders(root, &IgnoreSet::default(), &RunLog::silent()).unwrap();
        assert!(root
            .join("Season 1")
            .join(parser::UNKNOWN_SERIES)
            .join("Season 2")
            .is_dir());
    }

    #[test]
    fn test_plain_season_folders_untouched() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("Show/Season 1")).unwrap();
        fs::create_dir_all(root.join("Show/Season 2")).unwrap();

        let moved = fix_nested_season_folders(root, &IgnoreSet::default(), &RunLog::silent())
            .unwrap();
        assert_eq!(moved, 0);
        assert!(root.join("Show/Season 2").is_dir());
    }
}
