use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use tempfile::tempdir;

use media_organizer_core::config::TvMazeConfig;
use media_organizer_core::metadata::{MediaTracks, TagReader, Track, TrackKind};
use media_organizer_core::platform::VolumeId;
use media_organizer_core::{
    AppConfig, Error, MetadataResolver, OrganizeMode, Organizer, ProgressTracker, RunEvent,
    RunLog, RunState, RunSummary, VolumeProbe,
};

/// Reports the same General-track fields for every file.
struct FixedTags(Vec<(&'static str, &'static str)>);

impl TagReader for FixedTags {
    fn parse(&self, _path: &Path) -> Result<MediaTracks, Error> {
        Ok(MediaTracks {
            tracks: vec![Track {
                kind: TrackKind::General,
                fields: self
                    .0
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            }],
        })
    }
}

/// One volume for volume identity, but paths under `crowded` report less free space.
struct FakeVolumes {
    crowded: Option<PathBuf>,
}

impl VolumeProbe for FakeVolumes {
    fn volume_id(&self, _path: &Path) -> Option<VolumeId> {
        Some(VolumeId::new("disk"))
    }

    fn free_space(&self, path: &Path) -> io::Result<u64> {
        match &self.crowded {
            Some(crowded) if path.starts_with(crowded) => Ok(10),
            _ => Ok(1_000),
        }
    }
}

/// One volume whose free-space lookup fails for everything under `broken`.
struct BrokenVolumes {
    broken: PathBuf,
}

impl VolumeProbe for BrokenVolumes {
    fn volume_id(&self, _path: &Path) -> Option<VolumeId> {
        Some(VolumeId::new("disk"))
    }

    fn free_space(&self, path: &Path) -> io::Result<u64> {
        if path.starts_with(&self.broken) {
            Err(io::Error::new(io::ErrorKind::Other, "volume unavailable"))
        } else {
            Ok(1_000)
        }
    }
}

fn file_names(folder: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(folder)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn organizer(
    root: &Path,
    tags: Vec<(&'static str, &'static str)>,
    crowded: Option<PathBuf>,
) -> Organizer {
    let config = AppConfig {
        tvmaze: TvMazeConfig {
            enabled: false,
            ..TvMazeConfig::default()
        },
        ..AppConfig::default()
    };
    Organizer::new(config)
        .unwrap()
        .with_roots(vec![root.to_path_buf()])
        .with_metadata(MetadataResolver::new(Box::new(FixedTags(tags)), None))
        .with_volume_probe(Box::new(FakeVolumes { crowded }))
}

/// Runs synchronously, confirming every proposed deletion when `confirm_all` is set.
fn run(
    organizer: &mut Organizer,
    mode: OrganizeMode,
    confirm_all: bool,
) -> (RunSummary, Vec<PathBuf>) {
    let mut proposed = Vec::new();
    let summary = organizer
        .run(
            mode,
            &RunLog::silent(),
            &mut ProgressTracker::silent(),
            &mut |paths: &[PathBuf]| {
                proposed = paths.to_vec();
                if confirm_all {
                    paths.to_vec()
                } else {
                    Vec::new()
                }
            },
        )
        .unwrap();
    (summary, proposed)
}

#[test]
fn test_movie_is_filed_with_year_and_subtitle() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("movies");
    let downloads = root.join("downloads");
    fs::create_dir_all(&downloads).unwrap();
    fs::write(
        downloads.join("the.matrix.1999.1080p.bluray.x264-yify.mkv"),
        "matrix",
    )
    .unwrap();
    fs::write(
        downloads.join("the.matrix.1999.1080p.bluray.x264-yify.en.srt"),
        "subs",
    )
    .unwrap();
    fs::write(downloads.join("release.nfo"), "junk").unwrap();

    let mut organizer = organizer(&root, vec![("recorded_date", "1999")], None);
    let (summary, proposed) = run(&mut organizer, OrganizeMode::Movies, true);

    let folder = downloads.join("The Matrix (1999)");
    assert_eq!(
        fs::read_to_string(folder.join("The Matrix (1999).mkv")).unwrap(),
        "matrix"
    );
    assert!(folder.join("The Matrix (1999).en.srt").exists());
    assert!(!downloads.join("release.nfo").exists());
    assert_eq!(summary.moved, 1);
    assert_eq!(summary.subtitles_moved, 1);
    assert_eq!(summary.unwanted_removed, 1);
    assert!(proposed.is_empty());
}

#[test]
fn test_second_movie_run_changes_nothing() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("movies");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("Heat.1995.720p.mkv"), "heat").unwrap();
    fs::write(root.join("amelie.avi"), "amelie").unwrap();

    let mut organizer = organizer(&root, vec![("encoded_date", "UTC 1995-12-15")], None);
    let (first, _) = run(&mut organizer, OrganizeMode::Movies, true);
    assert_eq!(first.moved, 2);

    let (second, proposed) = run(&mut organizer, OrganizeMode::Movies, true);
    assert_eq!(second.moved, 0);
    assert_eq!(second.renamed_copies, 0);
    assert_eq!(second.duplicates_queued, 0);
    assert_eq!(second.already_in_place, 2);
    assert!(proposed.is_empty());
    assert!(root.join("Heat (1995)/Heat (1995).mkv").exists());
    assert!(root.join("Amelie (1995)/Amelie (1995).avi").exists());
}

#[test]
fn test_episode_is_filed_under_series_and_season() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("tv");
    let incoming = root.join("incoming");
    fs::create_dir_all(&incoming).unwrap();
    fs::write(incoming.join("Show.Name.S01E02.720p.WEBRip.mkv"), "ep").unwrap();

    let mut organizer = organizer(&root, vec![], None);
    let (summary, _) = run(&mut organizer, OrganizeMode::Tv, true);

    assert_eq!(summary.moved, 1);
    assert!(root
        .join("Show Name/Season 01/Show Name S01E02.mkv")
        .exists());
    assert!(!incoming.exists());

    let (again, _) = run(&mut organizer, OrganizeMode::Tv, true);
    assert_eq!(again.moved, 0);
    assert_eq!(again.already_in_place, 1);
}

#[test]
fn test_episode_identity_falls_back_to_folders() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("tv");
    let season = root.join("The Wire (2002)").join("Season 1");
    fs::create_dir_all(&season).unwrap();
    fs::write(season.join("The Wire E03.mkv"), "ep").unwrap();

    let mut organizer = organizer(&root, vec![], None);
    run(&mut organizer, OrganizeMode::Tv, true);

    assert!(root
        .join("The Wire/Season 01/The Wire S01E03.mkv")
        .exists());
    assert!(!root.join("The Wire (2002)").exists());
}

#[test]
fn test_episode_series_from_album_tag() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("tv");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("s02e05.mkv"), "ep").unwrap();

    let mut organizer = organizer(&root, vec![("album", "the expanse")], None);
    run(&mut organizer, OrganizeMode::Tv, true);

    assert!(root
        .join("The Expanse/Season 02/The Expanse S02E05.mkv")
        .exists());
}

#[test]
fn test_nested_season_folder_is_fixed_before_filing() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("tv");
    let nested = root.join("Season 1").join("Lost Season 2");
    fs::create_dir_all(&nested).unwrap();
    fs::write(nested.join("Lost 2x04.mkv"), "ep").unwrap();

    let mut organizer = organizer(&root, vec![], None);
    let (summary, _) = run(&mut organizer, OrganizeMode::Tv, true);

    assert_eq!(summary.season_folders_fixed, 1);
    assert!(root.join("Lost/Season 02/Lost S02E04.mkv").exists());
}

#[cfg(not(target_os = "windows"))]
#[test]
fn test_hidden_files_are_left_alone() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("movies");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join(".secret.mkv"), "hidden").unwrap();
    fs::write(root.join(".notes.txt"), "hidden").unwrap();

    let mut organizer = organizer(&root, vec![("recorded_date", "2001")], None);
    let (summary, _) = run(&mut organizer, OrganizeMode::Movies, true);

    assert_eq!(summary.moved, 0);
    assert_eq!(summary.unwanted_removed, 0);
    assert!(root.join(".secret.mkv").exists());
    assert!(root.join(".notes.txt").exists());
}

#[test]
fn test_identical_duplicate_on_crowded_volume_is_deleted() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("movies");
    let existing = root.join("Heat (1995)");
    let incoming = root.join("incoming");
    fs::create_dir_all(&existing).unwrap();
    fs::create_dir_all(&incoming).unwrap();
    fs::write(existing.join("Heat (1995).mkv"), "same bytes").unwrap();
    fs::write(incoming.join("heat.mkv"), "same bytes").unwrap();

    let mut organizer = organizer(
        &root,
        vec![("recorded_date", "1995")],
        Some(incoming.clone()),
    );
    let (summary, proposed) = run(&mut organizer, OrganizeMode::Movies, true);

    assert_eq!(proposed, vec![incoming.join("heat.mkv")]);
    assert_eq!(summary.duplicates_queued, 1);
    assert_eq!(summary.duplicates_deleted, 1);
    assert!(existing.join("Heat (1995).mkv").exists());
    assert!(!incoming.exists());
}

#[test]
fn test_free_space_tie_proposes_destination() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("movies");
    let existing = root.join("Heat (1995)");
    fs::create_dir_all(&existing).unwrap();
    fs::write(existing.join("Heat (1995).mkv"), "same bytes").unwrap();
    fs::write(root.join("heat.mkv"), "same bytes").unwrap();

    let mut organizer = organizer(&root, vec![("recorded_date", "1995")], None);
    let (summary, proposed) = run(&mut organizer, OrganizeMode::Movies, false);

    assert_eq!(proposed, vec![existing.join("Heat (1995).mkv")]);
    assert_eq!(summary.duplicates_deleted, 0);
    assert!(existing.join("Heat (1995).mkv").exists());
    assert!(root.join("heat.mkv").exists());
}

#[test]
fn test_same_size_different_content_is_renamed() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("movies");
    let existing = root.join("Heat (1995)");
    fs::create_dir_all(&existing).unwrap();
    fs::write(existing.join("Heat (1995).mkv"), "aaaa").unwrap();
    fs::write(root.join("heat.mkv"), "bbbb").unwrap();

    let mut organizer = organizer(&root, vec![("recorded_date", "1995")], None);
    let (summary, proposed) = run(&mut organizer, OrganizeMode::Movies, true);

    assert!(proposed.is_empty());
    assert_eq!(summary.renamed_copies, 1);
    assert_eq!(
        fs::read_to_string(existing.join("Heat (1995)_copy.mkv")).unwrap(),
        "bbbb"
    );
    assert_eq!(
        fs::read_to_string(existing.join("Heat (1995).mkv")).unwrap(),
        "aaaa"
    );
}

#[test]
fn test_kept_movie_copy_stays_put_on_later_runs() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("movies");
    let existing = root.join("Heat (1995)");
    fs::create_dir_all(&existing).unwrap();
    fs::write(existing.join("Heat (1995).mkv"), "aaaa").unwrap();
    fs::write(root.join("Heat.1995.1080p.mkv"), "bbbb").unwrap();

    let mut organizer = organizer(&root, vec![("recorded_date", "1995")], None);
    let (first, _) = run(&mut organizer, OrganizeMode::Movies, true);
    assert_eq!(first.renamed_copies, 1);

    for _ in 0..2 {
        let (again, proposed) = run(&mut organizer, OrganizeMode::Movies, true);
        assert_eq!(again.moved, 0);
        assert_eq!(again.renamed_copies, 0);
        assert_eq!(again.already_in_place, 2);
        assert!(proposed.is_empty());
    }
    assert_eq!(file_names(&root), vec!["Heat (1995)"]);
    assert_eq!(
        file_names(&existing),
        vec!["Heat (1995).mkv", "Heat (1995)_copy.mkv"]
    );
}

#[test]
fn test_kept_episode_copy_stays_put_on_later_runs() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("tv");
    let season = root.join("Show Name").join("Season 01");
    fs::create_dir_all(&season).unwrap();
    fs::write(season.join("Show Name S01E02.mkv"), "aaaa").unwrap();
    fs::write(root.join("show.name.s01e02.mkv"), "bbbb").unwrap();

    let mut organizer = organizer(&root, vec![], None);
    let (first, _) = run(&mut organizer, OrganizeMode::Tv, true);
    assert_eq!(first.renamed_copies, 1);

    for _ in 0..2 {
        let (again, _) = run(&mut organizer, OrganizeMode::Tv, true);
        assert_eq!(again.moved, 0);
        assert_eq!(again.renamed_copies, 0);
        assert_eq!(again.already_in_place, 2);
    }
    assert_eq!(
        file_names(&season),
        vec!["Show Name S01E02.mkv", "Show Name S01E02_copy.mkv"]
    );
    assert_eq!(
        fs::read_to_string(season.join("Show Name S01E02_copy.mkv")).unwrap(),
        "bbbb"
    );
}

#[test]
fn test_failing_files_do_not_stop_the_run() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("movies");
    let existing = root.join("Heat (1995)");
    let broken = root.join("broken");
    fs::create_dir_all(&existing).unwrap();
    fs::create_dir_all(&broken).unwrap();
    fs::write(existing.join("Heat (1995).mkv"), "same bytes").unwrap();
    fs::write(broken.join("heat.mkv"), "same bytes").unwrap();
    // A plain file where the movie folder for alien.mkv would go.
    fs::write(root.join("Alien (1995)"), "in the way").unwrap();
    fs::write(root.join("alien.mkv"), "alien").unwrap();
    fs::write(root.join("amelie.avi"), "amelie").unwrap();

    let mut organizer = organizer(&root, vec![("recorded_date", "1995")], None)
        .with_volume_probe(Box::new(BrokenVolumes {
            broken: broken.clone(),
        }));
    let (summary, proposed) = run(&mut organizer, OrganizeMode::Movies, true);

    assert_eq!(summary.files_found, 4);
    assert_eq!(summary.conflicts_abandoned, 1);
    assert_eq!(summary.failures, 1);
    assert_eq!(summary.moved, 1);
    assert_eq!(summary.already_in_place, 1);
    assert!(proposed.is_empty());
    assert_eq!(fs::read_to_string(broken.join("heat.mkv")).unwrap(), "same bytes");
    assert_eq!(fs::read_to_string(root.join("alien.mkv")).unwrap(), "alien");
    assert!(root.join("Amelie (1995)/Amelie (1995).avi").exists());
    assert!(existing.join("Heat (1995).mkv").exists());
}

#[test]
fn test_missing_root_fails_the_run() {
    let tmp = tempdir().unwrap();
    let mut organizer = organizer(&tmp.path().join("gone"), vec![], None);

    let (tx, rx) = mpsc::channel();
    let log = RunLog::new(tx);
    let result = organizer.run(
        OrganizeMode::Movies,
        &log,
        &mut ProgressTracker::silent(),
        &mut |_: &[PathBuf]| Vec::new(),
    );
    drop(log);

    assert!(result.is_err());
    let states: Vec<RunState> = rx
        .iter()
        .filter_map(|event| match event {
            RunEvent::StateChanged(state) => Some(state),
            _ => None,
        })
        .collect();
    assert_eq!(states.last(), Some(&RunState::Failed));
}

#[test]
fn test_empty_tree_reports_full_progress() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("empty");
    fs::create_dir_all(&root).unwrap();
    let mut organizer = organizer(&root, vec![], None);

    let (tx, rx) = mpsc::channel();
    let mut tracker = ProgressTracker::new(tx);
    organizer
        .run(
            OrganizeMode::Movies,
            &RunLog::silent(),
            &mut tracker,
            &mut |_: &[PathBuf]| Vec::new(),
        )
        .unwrap();
    drop(tracker);

    let last = rx.iter().last().unwrap();
    assert_eq!(last.total, 0);
    assert_eq!(last.percent, 100);
}

#[test]
fn test_spawned_run_waits_for_confirmation() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("movies");
    let existing = root.join("Heat (1995)");
    fs::create_dir_all(&existing).unwrap();
    fs::write(existing.join("Heat (1995).mkv"), "same bytes").unwrap();
    fs::write(root.join("heat.mkv"), "same bytes").unwrap();

    let handle =
        organizer(&root, vec![("recorded_date", "1995")], None).spawn(OrganizeMode::Movies);

    let mut states = Vec::new();
    for event in handle.events.iter() {
        match event {
            RunEvent::DeletionProposed(paths) => {
                let mut selection = paths.clone();
                selection.push(PathBuf::from("/not/proposed.mkv"));
                handle.confirm_deletions(selection);
            }
            RunEvent::StateChanged(state) => states.push(state),
            RunEvent::Log { .. } => {}
        }
    }
    let summary = handle.join().unwrap();

    assert_eq!(summary.duplicates_deleted, 1);
    assert!(!existing.join("Heat (1995).mkv").exists());
    assert!(root.join("heat.mkv").exists());
    assert_eq!(
        states,
        vec![
            RunState::Walking,
            RunState::Processing,
            RunState::CleaningUp,
            RunState::AwaitingDeletionConfirmation,
            RunState::Deleting,
            RunState::Done,
        ]
    );
}
