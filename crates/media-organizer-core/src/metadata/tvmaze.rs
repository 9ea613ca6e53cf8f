use crate::error::Error;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Lookup of premiere dates (`YYYY-MM-DD`) by show title.
pub trait ShowDirectory: Send {
    fn premiere_date(&self, title: &str) -> Result<Option<String>, Error>;

    fn season_premiere_date(&self, title: &str, season: u32) -> Result<Option<String>, Error>;
}

#[derive(Debug, Deserialize)]
struct Show {
    premiered: Option<String>,
    #[serde(rename = "_embedded", default)]
    embedded: Option<Embedded>,
}

#[derive(Debug, Deserialize)]
struct Embedded {
    #[serde(default)]
    seasons: Vec<Season>,
}

#[derive(Debug, Deserialize)]
struct Season {
    number: Option<u32>,
    #[serde(rename = "premiereDate")]
    premiere_date: Option<String>,
}

pub struct TvMazeClient {
    client: Client,
    base_url: String,
}

impl TvMazeClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder()
            .user_agent(concat!("media-organizer/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `None` when TVMaze has no show with that title.
    fn single_search(&self, title: &str, embed_seasons: bool) -> Result<Option<Show>, Error> {
        let url = format!("{}/singlesearch/shows", self.base_url);
        let mut request = self.client.get(&url).query(&[("q", title)]);
        if embed_seasons {
            request = request.query(&[("embed", "seasons")]);
        }

        let response = request.send()?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("TVMaze has no show named '{}'", title);
            return Ok(None);
        }
        let text = response.error_for_status()?.text()?;
        parse_show(&text).map(Some)
    }
}

fn parse_show(json: &str) -> Result<Show, Error> {
    Ok(serde_json::from_str(json)?)
}

fn season_premiere(show: &Show, season: u32) -> Option<String> {
    show.embedded
        .as_ref()?
        .seasons
        .iter()
        .find(|s| s.number == Some(season))
        .and_then(|s| s.premiere_date.clone())
}

impl ShowDirectory for TvMazeClient {
    fn premiere_date(&self, title: &str) -> Result<Option<String>, Error> {
        Ok(self
            .single_search(title, false)?
            .and_then(|show| show.premiered))
    }

    fn season_premiere_date(&self, title: &str, season: u32) -> Result<Option<String>, Error> {
        Ok(self
            .single_search(title, true)?
            .and_then(|show| season_premiere(&show, season)))
    }
}
