pub mod missing_episodes;
pub mod sonarr;

pub use missing_episodes::{analyze_missing_episodes, existing_episodes, MissingEpisodesReport};
pub use sonarr::{EpisodeRegistry, SonarrClient};
