use crate::analysis::{self, EpisodeRegistry, MissingEpisodesReport, SonarrClient};
use crate::config::{self, AppConfig};
use crate::duplicate::{self, DeletionQueue, DuplicateDecision};
use crate::error::Error;
use crate::metadata::MetadataResolver;
use crate::parser;
use crate::planner::{self, DestinationPlan, EpisodeTarget, MovieIdentity, PathPlanner};
use crate::platform::{self, SystemVolumes, VolumeProbe};
use crate::progress::{ProgressTracker, ProgressUpdate, RunEvent, RunLog};
use crate::scanner::{self, CandidateFile, IgnoreSet, MediaKind};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizeMode {
    Movies,
    Tv,
}

impl fmt::Display for OrganizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrganizeMode::Movies => write!(f, "movies"),
            OrganizeMode::Tv => write!(f, "TV shows"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Walking,
    Processing,
    CleaningUp,
    AwaitingDeletionConfirmation,
    Deleting,
    Done,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files_found: usize,
    pub season_folders_fixed: usize,
    pub moved: usize,
    pub renamed_copies: usize,
    pub already_in_place: usize,
    pub subtitles_moved: usize,
    pub duplicates_queued: usize,
    pub conflicts_abandoned: usize,
    pub failures: usize,
    pub unwanted_removed: usize,
    pub dirs_pruned: usize,
    pub duplicates_deleted: usize,
}

/// What happened to one video file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileOutcome {
    AlreadyInPlace,
    Moved { subtitles: usize },
    RenamedCopy { subtitles: usize },
    QueuedForDeletion,
    AlreadyQueued,
    Hidden,
    Vanished,
    ConflictAbandoned,
}

impl RunSummary {
    fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::AlreadyInPlace => self.already_in_place += 1,
            FileOutcome::Moved { subtitles } => {
                self.moved += 1;
                self.subtitles_moved += subtitles;
            }
            FileOutcome::RenamedCopy { subtitles } => {
                self.renamed_copies += 1;
                self.subtitles_moved += subtitles;
            }
            FileOutcome::QueuedForDeletion => self.duplicates_queued += 1,
            FileOutcome::ConflictAbandoned => self.conflicts_abandoned += 1,
            FileOutcome::AlreadyQueued | FileOutcome::Hidden | FileOutcome::Vanished => {}
        }
    }
}

/// Handle on a run executing on its worker thread.
pub struct RunHandle<T> {
    pub events: Receiver<RunEvent>,
    pub progress: Receiver<ProgressUpdate>,
    confirm: Sender<Vec<PathBuf>>,
    worker: JoinHandle<Result<T, Error>>,
}

impl<T> RunHandle<T> {
    /// Answers a `RunEvent::DeletionProposed`. Paths that were not proposed are ignored.
    pub fn confirm_deletions(&self, selection: Vec<PathBuf>) {
        let _ = self.confirm.send(selection);
    }

    /// Waits for the worker. An unanswered deletion proposal is treated as an empty selection.
    pub fn join(self) -> Result<T, Error> {
        let RunHandle {
            confirm, worker, ..
        } = self;
        drop(confirm);
        worker
            .join()
            .map_err(|_| Error::Other("Worker thread panicked".to_string()))?
    }
}

/// Drives organization runs and missing-episode analysis over a set of media roots.
pub struct Organizer {
    config: AppConfig,
    roots: Vec<PathBuf>,
    ignore: IgnoreSet,
    volumes: Box<dyn VolumeProbe>,
    metadata: MetadataResolver,
}

impl Organizer {
    pub fn new(config: AppConfig) -> Result<Self, Error> {
        let roots = config.media_roots(&[]);
        let ignore = IgnoreSet::new(&config.ignore_patterns)?;
        let metadata = MetadataResolver::from_config(&config)?;
        Ok(Self {
            config,
            roots,
            ignore,
            volumes: Box::new(SystemVolumes),
            metadata,
        })
    }

    /// Replaces the configured roots. Nested roots are folded into their parents.
    pub fn with_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.roots = config::non_overlapping_directories(roots);
        self
    }

    pub fn with_volume_probe(mut self, volumes: Box<dyn VolumeProbe>) -> Self {
        self.volumes = volumes;
        self
    }

    pub fn with_metadata(mut self, metadata: MetadataResolver) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Runs an organization pass on a worker thread.
    pub fn spawn(self, mode: OrganizeMode) -> RunHandle<RunSummary> {
        spawn_worker(move |log, tracker, confirmations| {
            let mut organizer = self;
            let mut confirm = |_: &[PathBuf]| confirmations.recv().unwrap_or_default();
            organizer.run(mode, log, tracker, &mut confirm)
        })
    }

    /// Runs missing-episode analysis on a worker thread.
    pub fn spawn_missing_episodes_analysis(self) -> RunHandle<MissingEpisodesReport> {
        spawn_worker(move |log, _tracker, _confirmations| self.missing_episodes(log))
    }

    /// Runs an organization pass on the calling thread. `confirm` receives the proposed
    /// deletions and returns the subset to delete.
    pub fn run(
        &mut self,
        mode: OrganizeMode,
        log: &RunLog,
        progress: &mut ProgressTracker,
        confirm: &mut dyn FnMut(&[PathBuf]) -> Vec<PathBuf>,
    ) -> Result<RunSummary, Error> {
        let result = self.run_inner(mode, log, progress, confirm);
        match &result {
            Ok(summary) => {
                log.send(RunEvent::StateChanged(RunState::Done));
                log.info(format!(
                    "Organization of {} complete: {} moved, {} renamed, {} already in place, {} duplicates deleted, {} failures",
                    mode,
                    summary.moved,
                    summary.renamed_copies,
                    summary.already_in_place,
                    summary.duplicates_deleted,
                    summary.failures
                ));
            }
            Err(e) => {
                log.send(RunEvent::StateChanged(RunState::Failed));
                log.error(format!("Organization of {} failed: {:?}", mode, e));
            }
        }
        result
    }

    fn run_inner(
        &mut self,
        mode: OrganizeMode,
        log: &RunLog,
        progress: &mut ProgressTracker,
        confirm: &mut dyn FnMut(&[PathBuf]) -> Vec<PathBuf>,
    ) -> Result<RunSummary, Error> {
        let mut summary = RunSummary::default();
        let roots = self.roots.clone();
        if roots.is_empty() {
            return Err(Error::Other("No media roots configured".to_string()));
        }
        log.info(format!("Organizing {} in {:?}", mode, roots));

        log.send(RunEvent::StateChanged(RunState::Walking));
        for root in &roots {
            if !root.is_dir() {
                return Err(Error::Other(format!(
                    "Media root {} is not a directory",
                    root.display()
                )));
            }
        }
        if mode == OrganizeMode::Tv {
            for root in &roots {
                summary.season_folders_fixed +=
                    scanner::fix_nested_season_folders(root, &self.ignore, log)?;
            }
        }
        let mut videos: Vec<CandidateFile> = Vec::new();
        for root in &roots {
            videos.extend(
                scanner::walk_root(root, &self.ignore)?
                    .into_iter()
                    .filter(|file| file.kind == MediaKind::Video),
            );
        }
        summary.files_found = videos.len();
        debug!("{} video files to process", videos.len());

        log.send(RunEvent::StateChanged(RunState::Processing));
        progress.set_total(videos.len());
        let mut queue = DeletionQueue::new();
        for candidate in &videos {
            match self.process_file(mode, candidate, &mut queue, log) {
                Ok(outcome) => summary.record(outcome),
                Err(e) => {
                    log.error(format!(
                        "Error processing file '{}': {}",
                        candidate.path.display(),
                        e
                    ));
                    summary.failures += 1;
                }
            }
            progress.advance();
        }

        log.send(RunEvent::StateChanged(RunState::CleaningUp));
        for root in &roots {
            summary.unwanted_removed += scanner::remove_unwanted_files(root, &self.ignore, log);
            summary.dirs_pruned += scanner::prune_empty_dirs(root, &self.ignore, log);
        }

        if !queue.is_empty() {
            log.send(RunEvent::StateChanged(RunState::AwaitingDeletionConfirmation));
            log.send(RunEvent::DeletionProposed(queue.paths().to_vec()));
            let selection = confirm(queue.paths());
            let confirmed = queue.confirmed(&selection);

            log.send(RunEvent::StateChanged(RunState::Deleting));
            if confirmed.is_empty() {
                log.info("No duplicates confirmed for deletion.");
            }
            for path in &confirmed {
                if platform::is_hidden(path) {
                    continue;
                }
                match fs::remove_file(path) {
                    Ok(()) => {
                        log.info(format!("Deleted duplicate file '{}'", path.display()));
                        summary.duplicates_deleted += 1;
                    }
                    Err(e) => {
                        log.error(format!("Error deleting file '{}': {}", path.display(), e));
                        summary.failures += 1;
                    }
                }
            }
            if summary.duplicates_deleted > 0 {
                for root in &roots {
                    summary.dirs_pruned += scanner::prune_empty_dirs(root, &self.ignore, log);
                }
            }
        }

        Ok(summary)
    }

    fn process_file(
        &mut self,
        mode: OrganizeMode,
        candidate: &CandidateFile,
        queue: &mut DeletionQueue,
        log: &RunLog,
    ) -> Result<FileOutcome, Error> {
        let source = candidate.path.as_path();
        if candidate.hidden {
            debug!("Skipping hidden file {}", source.display());
            return Ok(FileOutcome::Hidden);
        }
        if !source.is_file() {
            log.warn(format!("File '{}' disappeared before processing", source.display()));
            return Ok(FileOutcome::Vanished);
        }

        let plan = match mode {
            OrganizeMode::Movies => self.plan_movie(source, log),
            OrganizeMode::Tv => self.plan_episode(source, log),
        };
        if plan.is_in_place(source) {
            return Ok(FileOutcome::AlreadyInPlace);
        }

        fs::create_dir_all(&plan.folder)?;
        let destination = plan.path();
        if !destination.exists() {
            platform::move_file(source, &destination)?;
            log.info(format!(
                "Moved '{}' to '{}'",
                source.display(),
                destination.display()
            ));
            let subtitles = move_companion_subtitles(source, &destination, log);
            return Ok(FileOutcome::Moved { subtitles });
        }

        match duplicate::resolve(source, &destination, self.volumes.as_ref()) {
            Ok(DuplicateDecision::Skip) => Ok(FileOutcome::AlreadyInPlace),
            Ok(DuplicateDecision::Rename) => {
                let copy = duplicate::copy_destination(&destination);
                platform::move_file(source, &copy)?;
                log.info(format!(
                    "Renamed and moved duplicate '{}' to '{}'",
                    source.display(),
                    copy.display()
                ));
                let subtitles = move_companion_subtitles(source, &copy, log);
                Ok(FileOutcome::RenamedCopy { subtitles })
            }
            Ok(DuplicateDecision::DeferDeletion(doomed)) => {
                if queue.push(doomed.clone()) {
                    log.info(format!(
                        "Duplicate found: '{}' and '{}' are identical, '{}' proposed for deletion",
                        source.display(),
                        destination.display(),
                        doomed.display()
                    ));
                    Ok(FileOutcome::QueuedForDeletion)
                } else {
                    Ok(FileOutcome::AlreadyQueued)
                }
            }
            Err(e) => {
                log.warn(format!(
                    "Could not compare '{}' with '{}', leaving it in place: {}",
                    source.display(),
                    destination.display(),
                    e
                ));
                Ok(FileOutcome::ConflictAbandoned)
            }
        }
    }

    fn plan_movie(&mut self, source: &Path, log: &RunLog) -> DestinationPlan {
        let stem = planner::strip_copy_suffix(&file_stem(source)).to_string();
        let mut title = parser::parse_movie_title(&stem);
        if title.is_empty() {
            title = source
                .parent()
                .and_then(|parent| parent.file_name())
                .map(|name| parser::parse_movie_title(&name.to_string_lossy()))
                .filter(|title| !title.is_empty())
                .unwrap_or_else(|| stem.clone());
            log.info(format!("Movie title inferred as '{}'", title));
        }
        let title = parser::capitalize_title(&title);
        let year = self.metadata.release_year(source, log);

        PathPlanner::new(&self.roots, self.volumes.as_ref())
            .plan_movie(source, &MovieIdentity { title, year })
    }

    fn plan_episode(&mut self, source: &Path, log: &RunLog) -> DestinationPlan {
        let stem = planner::strip_copy_suffix(&file_stem(source)).to_string();
        let identity = parser::parse_tv_filename(&stem);

        let series = match identity.series.filter(|s| !s.trim().is_empty()) {
            Some(series) => series,
            None => self.fallback_series_title(source, log),
        };
        let series = parser::capitalize_title(&series);

        let season = identity.season.unwrap_or_else(|| {
            let from_folder = source
                .parent()
                .and_then(|parent| parent.file_name())
                .and_then(|name| parser::season_number_from_folder(&name.to_string_lossy()));
            match from_folder {
                Some(season) => {
                    log.info(format!("Season number inferred from folder: '{}'", season));
                    season
                }
                None => {
                    log.info("Season number not found, defaulting to '1'");
                    1
                }
            }
        });

        let episode = identity.episode.unwrap_or_else(|| {
            match parser::episode_number_from_stem(&stem) {
                Some(episode) => {
                    log.info(format!("Episode number inferred from filename: '{}'", episode));
                    episode
                }
                None => {
                    log.info("Episode number not found, defaulting to '1'");
                    1
                }
            }
        });

        let series_year = self.metadata.series_release_year(&series, log);
        let target = EpisodeTarget {
            series,
            series_year,
            season,
            episode,
        };
        PathPlanner::new(&self.roots, self.volumes.as_ref()).plan_episode(source, &target)
    }

    fn fallback_series_title(&self, source: &Path, log: &RunLog) -> String {
        if let Some(title) = planner::series_title_from_folders(source, &self.roots) {
            log.info(format!("Series title inferred from folder: '{}'", title));
            return title;
        }
        if let Some(title) = self.metadata.series_name_from_tags(source, log) {
            log.info(format!("Series title extracted from metadata: '{}'", title));
            return title;
        }
        log.info(format!(
            "Series title not found, defaulting to '{}'",
            parser::UNKNOWN_SERIES
        ));
        parser::UNKNOWN_SERIES.to_string()
    }

    /// Missing-episode analysis with the configured Sonarr instance. Without an API key
    /// nothing is looked up and the report is empty.
    pub fn missing_episodes(&self, log: &RunLog) -> Result<MissingEpisodesReport, Error> {
        if self.config.sonarr.api_key.trim().is_empty() {
            log.warn("Sonarr API key not set. Cannot analyze missing episodes.");
            log.send(RunEvent::StateChanged(RunState::Done));
            return Ok(MissingEpisodesReport::default());
        }
        let mut sonarr = match SonarrClient::new(
            &self.config.sonarr.url,
            &self.config.sonarr.api_key,
            self.config.http_timeout(),
        ) {
            Ok(client) => client,
            Err(e) => {
                log.send(RunEvent::StateChanged(RunState::Failed));
                log.error(format!("Missing episodes analysis failed: {:?}", e));
                return Err(e);
            }
        };
        Ok(self.missing_episodes_with(&mut sonarr, log))
    }

    pub fn missing_episodes_with(
        &self,
        registry: &mut dyn EpisodeRegistry,
        log: &RunLog,
    ) -> MissingEpisodesReport {
        log.info("Starting missing episodes analysis...");
        log.send(RunEvent::StateChanged(RunState::Processing));
        let report = analysis::analyze_missing_episodes(&self.roots, registry, log);
        log.send(RunEvent::StateChanged(RunState::Done));
        log.info(format!(
            "Missing episodes analysis completed: {} missing across {} series.",
            report.total_missing(),
            report.series.len()
        ));
        report
    }
}

fn spawn_worker<T, F>(job: F) -> RunHandle<T>
where
    T: Send + 'static,
    F: FnOnce(&RunLog, &mut ProgressTracker, Receiver<Vec<PathBuf>>) -> Result<T, Error>
        + Send
        + 'static,
{
    let (event_tx, events) = mpsc::channel();
    let (progress_tx, progress) = mpsc::channel();
    let (confirm, confirmations) = mpsc::channel();

    let worker = thread::spawn(move || {
        let log = RunLog::new(event_tx);
        let mut tracker = ProgressTracker::new(progress_tx);
        job(&log, &mut tracker, confirmations)
    });

    RunHandle {
        events,
        progress,
        confirm,
        worker,
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Moves subtitles named after `source` (`Movie.srt`, `Movie.en.srt`) next to `destination`,
/// renamed to its stem. Returns how many were moved.
fn move_companion_subtitles(source: &Path, destination: &Path, log: &RunLog) -> usize {
    let (Some(source_dir), Some(target_dir)) = (source.parent(), destination.parent()) else {
        return 0;
    };
    let source_stem = file_stem(source);
    let target_stem = file_stem(destination);

    let entries = match fs::read_dir(source_dir) {
        Ok(entries) => entries,
        Err(e) => {
            log.warn(format!(
                "Could not look for subtitles in '{}': {}",
                source_dir.display(),
                e
            ));
            return 0;
        }
    };

    let mut moved = 0;
    for entry in entries.filter_map(|entry| entry.ok()) {
        let path = entry.path();
        if !path.is_file() || MediaKind::of(&path) != MediaKind::Subtitle || platform::is_hidden(&path)
        {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(suffix) = name.strip_prefix(&source_stem) else {
            continue;
        };
        if !suffix.starts_with('.') {
            continue;
        }

        let target = target_dir.join(format!("{}{}", target_stem, suffix));
        if target.exists() {
            log.warn(format!(
                "Subtitle '{}' not moved: '{}' already exists",
                path.display(),
                target.display()
            ));
            continue;
        }
        match platform::move_file(&path, &target) {
            Ok(()) => {
                log.info(format!("Moved '{}' to '{}'", path.display(), target.display()));
                moved += 1;
            }
            Err(e) => log.error(format!("Error moving subtitle '{}': {}", path.display(), e)),
        }
    }
    moved
}
