use super::sonarr::EpisodeRegistry;
use crate::parser;
use crate::platform;
use crate::progress::RunLog;
use crate::scanner::MediaKind;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Series title to the (season, episode) pairs missing on disk, both in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissingEpisodesReport {
    pub series: BTreeMap<String, Vec<(u32, u32)>>,
}

impl MissingEpisodesReport {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn total_missing(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }
}

fn visible_subdirectories(path: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(path)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir() && !platform::is_hidden(path))
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Pairs present on disk: video files with an `E<digits>` marker inside `Season N` folders.
pub fn existing_episodes(series_path: &Path) -> io::Result<BTreeSet<(u32, u32)>> {
    let mut found = BTreeSet::new();
    for season_path in visible_subdirectories(series_path)? {
        let season_name = season_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Some(season) = parser::season_number_from_folder(&season_name) else {
            continue;
        };
        for entry in fs::read_dir(&season_path)?.filter_map(|entry| entry.ok()) {
            let path = entry.path();
            if !path.is_file() || MediaKind::of(&path) != MediaKind::Video {
                continue;
            }
            let stem = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            if let Some(episode) = parser::episode_number_from_stem(&stem) {
                found.insert((season, episode));
            }
        }
    }
    Ok(found)
}

/// Compares each series folder directly under the roots with the registry. Lookup failures
/// and unknown series are logged and skipped.
pub fn analyze_missing_episodes(
    roots: &[PathBuf],
    registry: &mut dyn EpisodeRegistry,
    log: &RunLog,
) -> MissingEpisodesReport {
    let mut report = MissingEpisodesReport::default();

    for root in roots {
        let series_dirs = match visible_subdirectories(root) {
            Ok(dirs) => dirs,
            Err(e) => {
                log.error(format!("Error reading folder '{}': {}", root.display(), e));
                continue;
            }
        };

        for series_path in series_dirs {
            let folder = series_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let title = parser::strip_year_suffix(&folder);

            let series_id = match registry.series_id(&title) {
                Ok(Some(id)) => id,
                Ok(None) => {
                    log.info(format!("Series '{}' not found in Sonarr.", title));
                    continue;
                }
                Err(e) => {
                    log.warn(format!("Error fetching series ID for '{}': {}", title, e));
                    continue;
                }
            };

            let expected = match registry.episodes(series_id) {
                Ok(episodes) if !episodes.is_empty() => episodes,
                Ok(_) => {
                    log.info(format!("No episodes found for series '{}' in Sonarr.", title));
                    continue;
                }
                Err(e) => {
                    log.warn(format!(
                        "Error fetching episodes for series '{}': {}",
                        title, e
                    ));
                    continue;
                }
            };

            let present = match existing_episodes(&series_path) {
                Ok(present) => present,
                Err(e) => {
                    log.error(format!(
                        "Error reading series folder '{}': {}",
                        series_path.display(),
                        e
                    ));
                    continue;
                }
            };

            let missing: BTreeSet<(u32, u32)> = expected
                .into_iter()
                .filter(|pair| !present.contains(pair))
                .collect();
            if !missing.is_empty() {
                log.info(format!(
                    "Series '{}' is missing {} episode(s)",
                    title,
                    missing.len()
                ));
                report
                    .series
                    .entry(title)
                    .or_default()
                    .extend(missing);
            }
        }
    }

    for episodes in report.series.values_mut() {
        episodes.sort_unstable();
        episodes.dedup();
    }
    report
}
