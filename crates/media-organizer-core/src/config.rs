use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_SONARR_URL: &str = "http://localhost:8989/api/v3";
const DEFAULT_TVMAZE_URL: &str = "https://api.tvmaze.com";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub root_paths: Vec<String>,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    #[serde(default)]
    pub sonarr: SonarrConfig,
    #[serde(default)]
    pub tvmaze: TvMazeConfig,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SonarrConfig {
    #[serde(default = "default_sonarr_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TvMazeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_tvmaze_url")]
    pub base_url: String,
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_ffprobe_path() -> String {
    "ffprobe".to_string()
}

fn default_sonarr_url() -> String {
    DEFAULT_SONARR_URL.to_string()
}

fn default_tvmaze_url() -> String {
    DEFAULT_TVMAZE_URL.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root_paths: Vec::new(),
            ignore_patterns: Vec::new(),
            sonarr: SonarrConfig::default(),
            tvmaze: TvMazeConfig::default(),
            http_timeout_secs: default_http_timeout_secs(),
            ffprobe_path: default_ffprobe_path(),
        }
    }
}

impl Default for SonarrConfig {
    fn default() -> Self {
        Self {
            url: default_sonarr_url(),
            api_key: String::new(),
        }
    }
}

impl Default for TvMazeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_tvmaze_url(),
        }
    }
}

impl AppConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Roots for a run: the command-line roots when given, otherwise the configured ones,
    /// reduced to non-overlapping directories in their original order.
    pub fn media_roots(&self, overrides: &[PathBuf]) -> Vec<PathBuf> {
        let roots: Vec<PathBuf> = if overrides.is_empty() {
            self.root_paths.iter().map(PathBuf::from).collect()
        } else {
            overrides.to_vec()
        };
        non_overlapping_directories(roots)
    }
}

/// Layered configuration: an optional `Config` file (toml, json, yaml...) in the working
/// directory, then `MEDIA_ORGANIZER_*` environment variables (`__` separates nested keys).
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(
            Environment::with_prefix("MEDIA_ORGANIZER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("root_paths")
                .with_list_parse_key("ignore_patterns"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

/// Remove directories that are subdirectories of other directories in the list.
/// Surviving entries keep the order in which they were first given.
pub fn non_overlapping_directories(dirs: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for dir in dirs {
        if result.iter().any(|kept| dir.starts_with(kept)) {
            continue;
        }
        if let Some(pos) = result.iter().position(|kept| kept.starts_with(&dir)) {
            result[pos] = dir;
            dedupe_nested(&mut result, pos);
        } else {
            result.push(dir);
        }
    }

    result
}

fn dedupe_nested(result: &mut Vec<PathBuf>, keep: usize) {
    let parent = result[keep].clone();
    let mut index = 0;
    result.retain(|dir| {
        let retain = index == keep || !dir.starts_with(&parent);
        index += 1;
        retain
    });
}
