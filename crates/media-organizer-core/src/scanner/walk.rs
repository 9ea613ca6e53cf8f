use crate::error::Error;
use crate::platform;
use glob::Pattern;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use walkdir::{DirEntry, WalkDir};

pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "wmv", "flv", "mpg", "mpeg", "m4v",
];
pub const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "sub", "idx", "ssa", "ass", "vtt"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Subtitle,
    Other,
}

impl MediaKind {
    pub fn of(path: &Path) -> Self {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
            MediaKind::Video
        } else if SUBTITLE_EXTENSIONS.contains(&extension.as_str()) {
            MediaKind::Subtitle
        } else {
            MediaKind::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub extension: String,
    pub kind: MediaKind,
    pub hidden: bool,
}

impl CandidateFile {
    pub fn new(path: PathBuf) -> Self {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();
        let kind = MediaKind::of(&path);
        let hidden = platform::is_hidden(&path);
        Self {
            path,
            extension,
            kind,
            hidden,
        }
    }
}

/// Compiled `ignore_patterns`.
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    patterns: Vec<Pattern>,
}

impl IgnoreSet {
    pub fn new(globs: &[String]) -> Result<Self, Error> {
        let patterns = globs
            .iter()
            .map(|glob| Pattern::new(glob))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_path(path))
    }
}

/// Whether the walker should enter or yield this entry. The root itself is always walked.
pub(crate) fn is_walkable(entry: &DirEntry, ignore: &IgnoreSet) -> bool {
    if entry.depth() == 0 {
        return true;
    }
    if ignore.matches(entry.path()) {
        return false;
    }
    !(entry.file_type().is_dir() && platform::is_hidden(entry.path()))
}

/// Every regular file below `root`, in file-name order. Hidden directories and ignored paths
/// are skipped; hidden files are returned flagged. Unreadable entries are logged and skipped.
pub fn walk_root(root: &Path, ignore: &IgnoreSet) -> Result<Vec<CandidateFile>, Error> {
    if !root.is_dir() {
        return Err(io::Error::new(
            ErrorKind::NotFound,
            format!("Media root {} is not a readable directory", root.display()),
        )
        .into());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| is_walkable(entry, ignore))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                error!("Error reading entry under {}: {}", root.display(), e);
                continue;
            }
        };
        if entry.file_type().is_file() {
            files.push(CandidateFile::new(entry.into_path()));
        }
    }

    debug!("Found {} files under {}", files.len(), root.display());
    Ok(files)
}
