use clap::{Parser, Subcommand, ValueEnum};
use media_organizer_core::OrganizeMode;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "media-organizer")]
#[command(about = "Organize movie and TV collections and clean up duplicate files", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Move media into the canonical folder layout, then remove debris and duplicates
    Organize {
        #[arg(long, value_enum)]
        mode: Mode,
        /// Media roots; defaults to `root_paths` from the configuration
        roots: Vec<PathBuf>,
        /// Delete every proposed duplicate without asking
        #[arg(long)]
        yes: bool,
    },
    /// List episodes Sonarr knows about that are missing on disk
    MissingEpisodes {
        /// Media roots; defaults to `root_paths` from the configuration
        roots: Vec<PathBuf>,
        /// Also write the missing episodes to a CSV file
        #[arg(long, value_name = "FILE")]
        csv: Option<PathBuf>,
    },
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Mode {
    Movies,
    Tv,
}

impl From<Mode> for OrganizeMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Movies => OrganizeMode::Movies,
            Mode::Tv => OrganizeMode::Tv,
        }
    }
}
