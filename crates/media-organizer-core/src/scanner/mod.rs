pub mod cleanup;
pub mod season_fix;
pub mod walk;

pub use cleanup::{prune_empty_dirs, remove_unwanted_files};
pub use season_fix::fix_nested_season_folders;
pub use walk::{walk_root, CandidateFile, IgnoreSet, MediaKind};
