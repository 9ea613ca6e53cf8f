use crate::error::Error;
use chrono::{DateTime, Local};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::SystemTime;
use tracing::debug;

pub const RECORDED_DATE: &str = "recorded_date";
pub const ENCODED_DATE: &str = "encoded_date";
pub const TAGGED_DATE: &str = "tagged_date";
pub const FILE_MODIFIED_DATE: &str = "file_last_modification_date";
pub const FILE_CREATED_DATE: &str = "file_created_date";
pub const ALBUM: &str = "album";

/// Date fields of the General track, most trustworthy first.
pub const DATE_FIELDS: [&str; 5] = [
    RECORDED_DATE,
    ENCODED_DATE,
    TAGGED_DATE,
    FILE_MODIFIED_DATE,
    FILE_CREATED_DATE,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    General,
    Video,
    Audio,
    Text,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub kind: TrackKind,
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaTracks {
    pub tracks: Vec<Track>,
}

impl MediaTracks {
    pub fn general(&self) -> Option<&Track> {
        self.tracks
            .iter()
            .find(|track| track.kind == TrackKind::General)
    }

    /// A General-track field, ignoring blank values.
    pub fn general_field(&self, name: &str) -> Option<&str> {
        self.general()
            .and_then(|track| track.fields.get(name))
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

/// Source of embedded container tags.
pub trait TagReader: Send {
    fn parse(&self, path: &Path) -> Result<MediaTracks, Error>;
}

/// Reads container tags with `ffprobe` and adds the file's own timestamps. If `ffprobe` is
/// missing or fails, only the filesystem dates are reported.
pub struct FfprobeTagReader {
    program: PathBuf,
}

impl FfprobeTagReader {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn container_tags(&self, path: &Path) -> Result<BTreeMap<String, String>, Error> {
        let output = Command::new(&self.program)
            .args(["-v", "quiet", "-show_format", "-print_format", "json"])
            .arg(path)
            .output()?;
        if !output.status.success() {
            return Err(Error::Other(format!(
                "{} exited with {} for {}",
                self.program.display(),
                output.status,
                path.display()
            )));
        }
        parse_ffprobe_output(&String::from_utf8_lossy(&output.stdout))
    }
}

impl TagReader for FfprobeTagReader {
    fn parse(&self, path: &Path) -> Result<MediaTracks, Error> {
        let mut fields = match self.container_tags(path) {
            Ok(fields) => fields,
            Err(e) => {
                debug!("No container tags for {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };

        let metadata = fs::metadata(path)?;
        if let Ok(modified) = metadata.modified() {
            fields.insert(FILE_MODIFIED_DATE.to_string(), format_time(modified));
        }
        if let Ok(created) = metadata.created() {
            fields.insert(FILE_CREATED_DATE.to_string(), format_time(created));
        }

        Ok(MediaTracks {
            tracks: vec![Track {
                kind: TrackKind::General,
                fields,
            }],
        })
    }
}

fn format_time(time: SystemTime) -> String {
    let local: DateTime<Local> = time.into();
    local.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

/// Maps the container tags of an `ffprobe -show_format` JSON document onto General-track
/// field names. Tag names are matched case-insensitively; the first alias present wins.
fn parse_ffprobe_output(json: &str) -> Result<BTreeMap<String, String>, Error> {
    let output: FfprobeOutput = serde_json::from_str(json)?;
    let tags: BTreeMap<String, String> = output
        .format
        .map(|format| format.tags)
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (key.to_lowercase(), value))
        .collect();

    let aliases: [(&str, &[&str]); 4] = [
        (RECORDED_DATE, &["date", "date_recorded"]),
        (ENCODED_DATE, &["creation_time", "encoded_date"]),
        (TAGGED_DATE, &["tagged_date"]),
        (ALBUM, &["album"]),
    ];

    let mut fields = BTreeMap::new();
    for (field, names) in aliases {
        if let Some(value) = names.iter().find_map(|name| tags.get(*name)) {
            fields.insert(field.to_string(), value.clone());
        }
    }
    Ok(fields)
}
