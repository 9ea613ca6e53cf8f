//! Best-effort enrichment from embedded tags and TVMaze. Nothing here is fatal: failures are
//! logged on the run log and reported as absent.

pub mod tags;
pub mod tvmaze;

use crate::config::AppConfig;
use crate::error::Error;
use crate::parser;
use crate::progress::RunLog;
use std::collections::HashMap;
use std::path::Path;

pub use tags::{FfprobeTagReader, MediaTracks, TagReader, Track, TrackKind};
pub use tvmaze::{ShowDirectory, TvMazeClient};

pub struct MetadataResolver {
    tags: Box<dyn TagReader>,
    shows: Option<Box<dyn ShowDirectory>>,
    series_years: HashMap<String, Option<u16>>,
}

impl MetadataResolver {
    pub fn new(tags: Box<dyn TagReader>, shows: Option<Box<dyn ShowDirectory>>) -> Self {
        Self {
            tags,
            shows,
            series_years: HashMap::new(),
        }
    }

    /// ffprobe tags plus TVMaze when enabled.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let shows: Option<Box<dyn ShowDirectory>> = if config.tvmaze.enabled {
            Some(Box::new(TvMazeClient::new(
                &config.tvmaze.base_url,
                config.http_timeout(),
            )?))
        } else {
            None
        };
        Ok(Self::new(
            Box::new(FfprobeTagReader::new(&config.ffprobe_path)),
            shows,
        ))
    }

    fn read_tags(&self, path: &Path, log: &RunLog) -> Option<MediaTracks> {
        match self.tags.parse(path) {
            Ok(tracks) => Some(tracks),
            Err(e) => {
                log.warn(format!("Error reading metadata for '{}': {}", path.display(), e));
                None
            }
        }
    }

    /// Year of the first date field present, in recorded, encoded, tagged, modified, created
    /// order.
    pub fn release_year(&self, path: &Path, log: &RunLog) -> Option<u16> {
        let tracks = self.read_tags(path, log)?;
        tags::DATE_FIELDS
            .iter()
            .find_map(|field| tracks.general_field(field))
            .and_then(parser::year_from_text)
    }

    /// Series name from the album tag.
    pub fn series_name_from_tags(&self, path: &Path, log: &RunLog) -> Option<String> {
        let tracks = self.read_tags(path, log)?;
        tracks.general_field(tags::ALBUM).map(str::to_string)
    }

    /// Premiere year of a show, falling back to the premiere of its first season. Each title
    /// is looked up at most once per resolver.
    pub fn series_release_year(&mut self, title: &str, log: &RunLog) -> Option<u16> {
        let key = title.to_lowercase();
        if let Some(year) = self.series_years.get(&key) {
            return *year;
        }

        let year = self
            .show_premiere_year(title, log)
            .or_else(|| self.season_release_year(title, 1, log));
        self.series_years.insert(key, year);
        year
    }

    pub fn season_release_year(&self, title: &str, season: u32, log: &RunLog) -> Option<u16> {
        let shows = self.shows.as_ref()?;
        match shows.season_premiere_date(title, season) {
            Ok(date) => date.as_deref().and_then(parser::year_from_text),
            Err(e) => {
                log.warn(format!(
                    "Error fetching season {} year for '{}': {}",
                    season, title, e
                ));
                None
            }
        }
    }

    fn show_premiere_year(&self, title: &str, log: &RunLog) -> Option<u16> {
        let shows = self.shows.as_ref()?;
        match shows.premiere_date(title) {
            Ok(date) => date.as_deref().and_then(parser::year_from_text),
            Err(e) => {
                log.warn(format!("Error fetching release year for '{}': {}", title, e));
                None
            }
        }
    }
}
