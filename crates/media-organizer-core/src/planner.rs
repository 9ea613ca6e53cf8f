//! Destination folder and filename for organized media.

use crate::parser;
use crate::platform::{self, VolumeProbe};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

lazy_static! {
    static ref FORBIDDEN_CHARACTERS: Regex = Regex::new(r#"[<>:"/\\|?*]"#).unwrap();
    static ref COPY_SUFFIX: Regex = Regex::new(r"(?i)_copy\d*$").unwrap();
}

/// `Heat (1995)_copy2` -> `Heat (1995)`. Kept duplicates are named after their original with
/// one of these suffixes.
pub fn strip_copy_suffix(stem: &str) -> &str {
    match COPY_SUFFIX.find(stem) {
        Some(m) => &stem[..m.start()],
        None => stem,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationPlan {
    pub folder: PathBuf,
    pub filename: String,
}

impl DestinationPlan {
    pub fn path(&self) -> PathBuf {
        self.folder.join(&self.filename)
    }

    /// True when the plan points at the file it was computed for, or when the file is a kept
    /// duplicate (`{stem}_copy{N}{ext}`) sitting beside the planned file.
    pub fn is_in_place(&self, source: &Path) -> bool {
        if platform::paths_equal_ignore_case(&self.path(), source) {
            return true;
        }
        let in_folder = source
            .parent()
            .map(|parent| platform::paths_equal_ignore_case(parent, &self.folder))
            .unwrap_or(false);
        if !in_folder {
            return false;
        }

        let planned = Path::new(&self.filename);
        let (Some(stem), Some(planned_stem)) = (source.file_stem(), planned.file_stem()) else {
            return false;
        };
        let stem = stem.to_string_lossy();
        let original = strip_copy_suffix(&stem);
        let lowercase_ext =
            |path: &Path| path.extension().map(|ext| ext.to_string_lossy().to_lowercase());

        original.len() < stem.len()
            && platform::names_equal_ignore_case(original, &planned_stem.to_string_lossy())
            && lowercase_ext(source) == lowercase_ext(planned)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieIdentity {
    pub title: String,
    pub year: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeTarget {
    pub series: String,
    pub series_year: Option<u16>,
    pub season: u32,
    pub episode: u32,
}

/// Removes characters that are not allowed in file names and trims dots and spaces from
/// both ends.
pub fn sanitize_component(name: &str) -> String {
    let cleaned = FORBIDDEN_CHARACTERS.replace_all(name, "");
    cleaned
        .trim_matches(|c: char| c == '.' || c.is_whitespace())
        .to_string()
}

fn extension_suffix(source: &Path) -> String {
    source
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

fn with_year(name: &str, year: Option<u16>) -> String {
    match year {
        Some(year) => format!("{} ({})", name, year),
        None => name.to_string(),
    }
}

impl MovieIdentity {
    /// `Title (Year)`, used for both the folder and the file stem.
    pub fn stem(&self) -> String {
        with_year(&sanitize_component(&self.title), self.year)
    }
}

impl EpisodeTarget {
    pub fn series_folder_name(&self) -> String {
        with_year(&sanitize_component(&self.series), self.series_year)
    }

    pub fn season_folder_name(&self) -> String {
        format!("Season {:02}", self.season)
    }

    pub fn file_stem(&self) -> String {
        format!(
            "{} S{:02}E{:02}",
            sanitize_component(&self.series),
            self.season,
            self.episode
        )
    }
}

/// Plans destinations against the run's roots. Only roots on the source's volume are
/// considered for folder reuse; roots are searched in configuration order.
pub struct PathPlanner<'a> {
    roots: &'a [PathBuf],
    volumes: &'a dyn VolumeProbe,
}

impl<'a> PathPlanner<'a> {
    pub fn new(roots: &'a [PathBuf], volumes: &'a dyn VolumeProbe) -> Self {
        Self { roots, volumes }
    }

    fn same_volume_roots<'b>(&'b self, source: &'b Path) -> impl Iterator<Item = &'a PathBuf> + 'b {
        self.roots
            .iter()
            .filter(move |root| self.volumes.same_volume(root, source))
    }

    pub fn plan_movie(&self, source: &Path, identity: &MovieIdentity) -> DestinationPlan {
        let stem = identity.stem();
        let filename = format!("{}{}", stem, extension_suffix(source));
        let parent = source.parent().unwrap_or_else(|| Path::new(""));

        let folder = if folder_name_is(parent, &stem) {
            parent.to_path_buf()
        } else if let Some(existing) = self
            .same_volume_roots(source)
            .map(|root| root.join(&stem))
            .find(|candidate| candidate.is_dir())
        {
            debug!("Reusing movie folder {}", existing.display());
            existing
        } else {
            parent.join(&stem)
        };

        DestinationPlan { folder, filename }
    }

    pub fn plan_episode(&self, source: &Path, target: &EpisodeTarget) -> DestinationPlan {
        let series_folder = target.series_folder_name();
        let season_folder = target.season_folder_name();
        let filename = format!("{}{}", target.file_stem(), extension_suffix(source));
        let parent = source.parent().unwrap_or_else(|| Path::new(""));

        let already_filed = folder_name_is(parent, &season_folder)
            && parent
                .parent()
                .map(|series| folder_name_is(series, &series_folder))
                .unwrap_or(false);

        let folder = if already_filed {
            parent.to_path_buf()
        } else {
            let existing = self
                .same_volume_roots(source)
                .map(|root| root.join(&series_folder))
                .find(|candidate| candidate.is_dir());
            let series_path = match existing {
                Some(path) => {
                    debug!("Reusing series folder {}", path.display());
                    path
                }
                None => match self.same_volume_roots(source).next() {
                    Some(root) => root.join(&series_folder),
                    None => parent.join(&series_folder),
                },
            };
            series_path.join(&season_folder)
        };

        DestinationPlan { folder, filename }
    }
}

fn folder_name_is(folder: &Path, name: &str) -> bool {
    folder
        .file_name()
        .map(|actual| platform::names_equal_ignore_case(&actual.to_string_lossy(), name))
        .unwrap_or(false)
}

/// Series title from the folder layout: the nearest ancestor of `source` that is not a season
/// folder and lies strictly inside one of `roots`, without a trailing ` (YYYY)`.
pub fn series_title_from_folders(source: &Path, roots: &[PathBuf]) -> Option<String> {
    let root = roots.iter().find(|root| source.starts_with(root))?;
    source
        .ancestors()
        .skip(1)
        .take_while(|ancestor| *ancestor != root.as_path() && ancestor.starts_with(root))
        .filter_map(|ancestor| ancestor.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .find(|name| !parser::is_season_folder(name))
        .map(|name| parser::strip_year_suffix(&name))
        .filter(|name| !name.trim().is_empty())
}
