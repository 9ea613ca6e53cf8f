pub mod analysis;
pub mod config;
pub mod duplicate;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod metadata;
pub mod parser;
pub mod planner;
pub mod platform;
pub mod progress;
pub mod scanner;

pub use analysis::{EpisodeRegistry, MissingEpisodesReport};
pub use config::AppConfig;
pub use duplicate::{DeletionQueue, DuplicateDecision};
pub use engine::{OrganizeMode, Organizer, RunHandle, RunState, RunSummary};
pub use error::Error;
pub use metadata::MetadataResolver;
pub use platform::{SystemVolumes, VolumeProbe};
pub use progress::{LogLevel, ProgressCounters, ProgressUpdate, ProgressTracker, RunEvent, RunLog};
