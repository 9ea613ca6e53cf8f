use crate::error::Error;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Registry of the episodes a series is supposed to have.
pub trait EpisodeRegistry: Send {
    /// Id of the series whose title matches case-insensitively.
    fn series_id(&mut self, title: &str) -> Result<Option<u64>, Error>;

    /// All (season, episode) pairs known for a series.
    fn episodes(&mut self, series_id: u64) -> Result<Vec<(u32, u32)>, Error>;
}

#[derive(Debug, Clone, Deserialize)]
struct SeriesRecord {
    id: u64,
    title: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EpisodeRecord {
    season_number: u32,
    episode_number: u32,
}

pub struct SonarrClient {
    client: Client,
    base_url: String,
    api_key: String,
    series: Option<Vec<SeriesRecord>>,
}

impl SonarrClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder()
            .user_agent(concat!("media-organizer/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            series: None,
        })
    }

    fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<String, Error> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!("GET {}", url);
        let response = self
            .client
            .get(&url)
            .query(&[("apikey", self.api_key.as_str())])
            .query(query)
            .send()?
            .error_for_status()?;
        Ok(response.text()?)
    }

    fn all_series(&mut self) -> Result<&[SeriesRecord], Error> {
        if self.series.is_none() {
            let body = self.get("series", &[])?;
            self.series = Some(parse_series(&body)?);
        }
        Ok(self.series.as_deref().unwrap_or_default())
    }
}

impl EpisodeRegistry for SonarrClient {
    fn series_id(&mut self, title: &str) -> Result<Option<u64>, Error> {
        Ok(find_series(self.all_series()?, title))
    }

    fn episodes(&mut self, series_id: u64) -> Result<Vec<(u32, u32)>, Error> {
        let body = self.get("episode", &[("seriesId", series_id.to_string())])?;
        parse_episodes(&body)
    }
}

fn parse_series(json: &str) -> Result<Vec<SeriesRecord>, Error> {
    Ok(serde_json::from_str(json)?)
}

fn parse_episodes(json: &str) -> Result<Vec<(u32, u32)>, Error> {
    let records: Vec<EpisodeRecord> = serde_json::from_str(json)?;
    Ok(records
        .into_iter()
        .map(|record| (record.season_number, record.episode_number))
        .collect())
}

fn find_series(series: &[SeriesRecord], title: &str) -> Option<u64> {
    let wanted = title.to_lowercase();
    series
        .iter()
        .find(|record| record.title.to_lowercase() == wanted)
        .map(|record| record.id)
}
