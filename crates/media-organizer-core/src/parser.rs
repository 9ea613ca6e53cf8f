//! Filename parsing for movies and TV episodes.
//!
//! Both parsers first drop bracketed groups and release noise (resolution, source, codec and
//! scene-group tokens), then collapse separator runs into single spaces.

use lazy_static::lazy_static;
use regex::Regex;

pub const UNKNOWN_SERIES: &str = "Unknown Series";

const NOISE_TERMS: &[&str] = &[
    "720p", "1080p", "2160p", "480p",
    "BRRip", "BluRay", "WEBRip", "WEB-DL",
    "HDRip", "DVDRip", "DVDSCR", "CAM",
    "XviD", "x264", "h264", "H.264", "H264",
    "AAC", "MP3", "RARBG", "YIFY", "YTS", "ETRG", "Ganool",
    "10bit", "6CH", "HEVC", "HQ", "HD", "TS",
    "PROPER", "NEW", "PSA", "CPG", "GalaxyRG", "999MB",
    "Rip", "DvD", "DvDRip", "x265", "DivX", "AMZN", "WEB", "WEB-DLRip",
    "NF", "Remastered", "Atmos", "HC", "HDCAM", "Line", "Subs",
    "EXTENDED", "UNRATED", "Director's Cut", "IMAX", "Repack", "READNFO",
    "FIX", "V2", "V3", "FINAL", "LIMITED",
];

lazy_static! {
    static ref BRACKETED: Regex = Regex::new(r"[\[\(\{].*?[\]\)\}]").unwrap();
    static ref NOISE: Regex = noise_pattern();
    static ref YEAR: Regex = Regex::new(r"\b(?:19|20)\d{2}\b").unwrap();
    static ref SEPARATORS: Regex = Regex::new(r"[.\-_\s]+").unwrap();
    static ref SEASON_FOLDER: Regex = Regex::new(r"(?i)season\s*(\d+)").unwrap();
    static ref EPISODE_MARKER: Regex = Regex::new(r"[eE](\d+)").unwrap();
    static ref YEAR_SUFFIX: Regex = Regex::new(r"\s\(\d{4}\)$").unwrap();
    static ref FIRST_YEAR_DIGITS: Regex = Regex::new(r"\d{4}").unwrap();
    static ref EPISODE_SHAPES: Vec<EpisodeShape> = vec![
        // Show Name S01E02
        EpisodeShape::new(r"(?i)^(.*?)[\s.]+s(\d+)[\s.]*e(\d+)", Layout::TitleFirst, false),
        // Show Name 1x02
        EpisodeShape::new(r"(?i)^(.*?)[\s.]+(\d+)x(\d+)", Layout::TitleFirst, false),
        // Show Name Season 1 Episode 2
        EpisodeShape::new(
            r"(?i)^(.*?)[\s.]+season[\s.]*(\d+)[\s.]+episode[\s.]*(\d+)",
            Layout::TitleFirst,
            false,
        ),
        // Show Name 102: the last two digits are always the episode.
        EpisodeShape::new(r"^(.*?)\s*[.-]?\s*(\d{1,2})(\d{2})", Layout::TitleFirst, true),
        // S01E02 Show Name
        EpisodeShape::new(r"(?i)^s(\d+)e(\d+)\s*(.*?)$", Layout::TitleLast, false),
    ];
}

fn noise_pattern() -> Regex {
    let mut terms: Vec<&str> = NOISE_TERMS.to_vec();
    // Longest first so that WEB-DLRip is not cut down to -DLRip by WEB.
    terms.sort_by(|a, b| b.len().cmp(&a.len()));
    let alternation = terms
        .iter()
        .map(|term| regex::escape(term))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)).unwrap()
}

#[derive(Debug, Clone, Copy)]
enum Layout {
    TitleFirst,
    TitleLast,
}

#[derive(Debug)]
struct EpisodeShape {
    pattern: Regex,
    layout: Layout,
    masks_years: bool,
}

impl EpisodeShape {
    fn new(pattern: &str, layout: Layout, masks_years: bool) -> Self {
        Self {
            pattern: Regex::new(pattern).unwrap(),
            layout,
            masks_years,
        }
    }

    fn capture(&self, name: &str) -> Option<EpisodeIdentity> {
        let masked;
        let haystack = if self.masks_years {
            masked = collapse_separators(&YEAR.replace_all(name, ""));
            masked.as_str()
        } else {
            name
        };

        let caps = self.pattern.captures(haystack)?;
        let group = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or_default();
        let (title, season, episode) = match self.layout {
            Layout::TitleFirst => (group(1), group(2), group(3)),
            Layout::TitleLast => (group(3), group(1), group(2)),
        };

        let title = title.trim();
        Some(EpisodeIdentity {
            series: (!title.is_empty()).then(|| title.to_string()),
            season: season.parse().ok(),
            episode: episode.parse().ok(),
        })
    }
}

/// What a TV filename says about itself. Any part may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpisodeIdentity {
    pub series: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

fn strip_noise(name: &str) -> String {
    let without_groups = BRACKETED.replace_all(name, "");
    let spaced = without_groups.replace('_', " ");
    NOISE.replace_all(&spaced, "").into_owned()
}

fn collapse_separators(name: &str) -> String {
    SEPARATORS.replace_all(name, " ").trim().to_string()
}

/// Movie title from a filename stem. Release years are removed as well; the year is
/// resolved separately from the file's metadata. May return an empty string.
pub fn parse_movie_title(stem: &str) -> String {
    let cleaned = strip_noise(stem);
    let cleaned = YEAR.replace_all(&cleaned, "");
    collapse_separators(&cleaned)
}

/// Series, season and episode from a filename stem. Shapes are tried in a fixed order and
/// the first match wins; an unrecognised name yields an empty identity.
pub fn parse_tv_filename(stem: &str) -> EpisodeIdentity {
    let cleaned = collapse_separators(&strip_noise(stem));
    EPISODE_SHAPES
        .iter()
        .find_map(|shape| shape.capture(&cleaned))
        .unwrap_or_default()
}

/// Upper-cases the first letter of every word and lower-cases the rest.
pub fn capitalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn is_season_folder(name: &str) -> bool {
    SEASON_FOLDER.is_match(name)
}

pub fn season_number_from_folder(name: &str) -> Option<u32> {
    SEASON_FOLDER
        .captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

pub fn episode_number_from_stem(stem: &str) -> Option<u32> {
    EPISODE_MARKER
        .captures(stem)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Series title hidden in a season folder name such as `Show Name Season 2`.
pub fn series_title_from_season_folder(name: &str) -> String {
    let title = SEASON_FOLDER.replace_all(name, "");
    let title = title.trim();
    if title.is_empty() {
        UNKNOWN_SERIES.to_string()
    } else {
        title.to_string()
    }
}

/// `Show Name (2010)` -> `Show Name`
pub fn strip_year_suffix(name: &str) -> String {
    YEAR_SUFFIX.replace(name, "").into_owned()
}

/// First run of four digits in a date-ish string, e.g. `UTC 2014-03-02 10:00:00`.
pub fn year_from_text(text: &str) -> Option<u16> {
    FIRST_YEAR_DIGITS
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(series: Option<&str>, season: u32, episode: u32) -> EpisodeIdentity {
        EpisodeIdentity {
            series: series.map(str::to_string),
            season: Some(season),
            episode: Some(episode),
        }
    }

    #[test]
    fn test_movie_title_strips_noise_and_year() {
        assert_eq!(
            parse_movie_title("The.Matrix.1999.1080p.BluRay.x264-YIFY"),
            "The Matrix"
        );
        assert_eq!(
            parse_movie_title("Blade_Runner_2049_2017_2160p_WEB-DLRip"),
            "Blade Runner"
        );
    }

    #[test]
    fn test_movie_title_noise_is_case_insensitive() {
        assert_eq!(parse_movie_title("heat.1995.BLURAY.hevc.aac"), "heat");
        assert_eq!(parse_movie_title("Amelie (2001) [rarbg] {extended}"), "Amelie");
    }

    #[test]
    fn test_movie_title_keeps_words_containing_noise() {
        assert_eq!(parse_movie_title("Scam.Artists.CAM"), "Scam Artists");
    }

    #[test]
    fn test_movie_title_may_end_up_empty() {
        assert_eq!(parse_movie_title("1080p.BluRay.2019"), "");
    }

    #[test]
    fn test_tv_season_episode_marker() {
        assert_eq!(
            parse_tv_filename("Show.Name.S02E05.1080p"),
            episode(Some("Show Name"), 2, 5)
        );
        assert_eq!(
            parse_tv_filename("show_name_s10e11_WEBRip"),
            episode(Some("show name"), 10, 11)
        );
    }

    #[test]
    fn test_tv_cross_marker() {
        assert_eq!(parse_tv_filename("Show Name 3x07"), episode(Some("Show Name"), 3, 7));
    }

    #[test]
    fn test_tv_spelled_out() {
        assert_eq!(
            parse_tv_filename("Show Name Season 4 Episode 12"),
            episode(Some("Show Name"), 4, 12)
        );
    }

    #[test]
    fn test_tv_three_digit_run() {
        assert_eq!(parse_tv_filename("Show 205"), episode(Some("Show"), 2, 5));
        assert_eq!(parse_tv_filename("Show.1012"), episode(Some("Show"), 10, 12));
    }

    #[test]
    fn test_tv_year_is_not_an_episode_number() {
        assert_eq!(parse_tv_filename("Doctor Who 2005"), EpisodeIdentity::default());
        assert_eq!(
            parse_tv_filename("Doctor Who 2005 101"),
            episode(Some("Doctor Who"), 1, 1)
        );
    }

    #[test]
    fn test_tv_prefix_marker() {
        assert_eq!(
            parse_tv_filename("S01E02 Pilot Show"),
            episode(Some("Pilot Show"), 1, 2)
        );
        assert_eq!(parse_tv_filename("s03e04"), episode(None, 3, 4));
    }

    #[test]
    fn test_tv_marker_wins_over_later_shapes() {
        assert_eq!(
            parse_tv_filename("Show 24 S01E02"),
            episode(Some("Show 24"), 1, 2)
        );
    }

    #[test]
    fn test_tv_unrecognised() {
        assert_eq!(parse_tv_filename("Holiday Special"), EpisodeIdentity::default());
    }

    #[test]
    fn test_capitalize_title() {
        assert_eq!(capitalize_title("the  dark KNIGHT"), "The Dark Knight");
        assert_eq!(capitalize_title(""), "");
    }

    #[test]
    fn test_season_folder_helpers() {
        assert!(is_season_folder("Season 1"));
        assert!(is_season_folder("Show SEASON02"));
        assert!(!is_season_folder("Specials"));
        assert_eq!(season_number_from_folder("Season 07"), Some(7));
        assert_eq!(series_title_from_season_folder("Show Name Season 3"), "Show Name");
        assert_eq!(series_title_from_season_folder("Season 3"), UNKNOWN_SERIES);
    }

    #[test]
    fn test_episode_and_year_helpers() {
        assert_eq!(episode_number_from_stem("Show Name S01E09"), Some(9));
        assert_eq!(episode_number_from_stem("no marker"), None);
        assert_eq!(strip_year_suffix("Show Name (2010)"), "Show Name");
        assert_eq!(strip_year_suffix("Show Name"), "Show Name");
        assert_eq!(year_from_text("UTC 2014-03-02 10:00:00"), Some(2014));
        assert_eq!(year_from_text("unknown"), None);
    }
}
