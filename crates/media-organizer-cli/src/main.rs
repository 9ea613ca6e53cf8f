mod commands;
mod logging;
mod progress;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use console::Term;
use dotenv::dotenv;
use media_organizer_core::{
    AppConfig, MissingEpisodesReport, OrganizeMode, Organizer, RunEvent, RunSummary,
};
use progress::RunView;
use tracing::{error, info, warn};

fn main() {
    dotenv().ok();

    let guard = logging::init_logger();
    let result = run(Cli::parse());
    if let Err(err) = &result {
        error!("Error: {:#}", err);
    }

    // Flush the log file before exiting.
    drop(guard);
    if result.is_err() {
        process::exit(1);
    }
}

fn run(args: Cli) -> anyhow::Result<()> {
    let config = media_organizer_core::config::load_configuration()
        .context("Error loading configuration")?;

    match args.command {
        Some(Commands::Organize { mode, roots, yes }) => {
            run_organize(&config, mode.into(), &roots, yes)
        }
        Some(Commands::MissingEpisodes { roots, csv }) => {
            run_missing_episodes(&config, &roots, csv.as_deref())
        }
        Some(Commands::PrintConfig) => {
            let mut shown = config.clone();
            if !shown.sonarr.api_key.is_empty() {
                shown.sonarr.api_key = "********".to_string();
            }
            println!("Configuration: {:#?}", shown);
            Ok(())
        }
        None => {
            Cli::command().print_long_help()?;
            Ok(())
        }
    }
}

fn organizer_for(config: &AppConfig, roots: &[PathBuf]) -> anyhow::Result<Organizer> {
    let organizer = Organizer::new(config.clone())
        .context("Failed to set up the organizer")?
        .with_roots(config.media_roots(roots));
    if organizer.roots().is_empty() {
        bail!("No media roots: pass them on the command line or set root_paths in the configuration");
    }
    info!("Media roots: {:?}", organizer.roots());
    Ok(organizer)
}

fn run_organize(
    config: &AppConfig,
    mode: OrganizeMode,
    roots: &[PathBuf],
    yes: bool,
) -> anyhow::Result<()> {
    let handle = organizer_for(config, roots)?.spawn(mode);
    let view = RunView::new(&format!("Organizing {}", mode));

    loop {
        match handle.events.recv_timeout(Duration::from_millis(100)) {
            Ok(RunEvent::Log { level, message }) => view.log(level, &message),
            Ok(RunEvent::StateChanged(state)) => view.set_state(state),
            Ok(RunEvent::DeletionProposed(paths)) => {
                let selection = match view.suspend(|| choose_deletions(&paths, yes)) {
                    Ok(selection) => selection,
                    Err(err) => {
                        error!("Error reading confirmation: {}", err);
                        Vec::new()
                    }
                };
                handle.confirm_deletions(selection);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        for update in handle.progress.try_iter() {
            view.update(update);
        }
    }
    view.finish();

    let summary = handle.join().context("Organization failed")?;
    print_summary(&summary);
    Ok(())
}

/// Asks once for the whole list, then file by file.
fn choose_deletions(paths: &[PathBuf], yes: bool) -> io::Result<Vec<PathBuf>> {
    println!();
    println!("{}", "Duplicate files proposed for deletion:".bold());
    for path in paths {
        println!("  {}", path.display().to_string().red());
    }

    if yes {
        return Ok(paths.to_vec());
    }
    if !Term::stdout().is_term() {
        warn!("Not running in a terminal and --yes not given; no files will be deleted");
        return Ok(Vec::new());
    }

    if prompt_confirm(
        &format!("Delete all {} duplicate files?", paths.len()),
        Some(false),
    )? {
        return Ok(paths.to_vec());
    }

    let mut selection = Vec::new();
    for path in paths {
        if prompt_confirm(&format!("Delete '{}'?", path.display()), Some(false))? {
            selection.push(path.clone());
        }
    }
    Ok(selection)
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!(
        "{} video files: {} moved, {} renamed copies, {} already in place",
        summary.files_found,
        format!("{}", summary.moved).green(),
        format!("{}", summary.renamed_copies).yellow(),
        format!("{}", summary.already_in_place).cyan(),
    );
    println!(
        "{} subtitles moved, {} season folders fixed, {} unwanted files removed, {} folders pruned",
        summary.subtitles_moved,
        summary.season_folders_fixed,
        summary.unwanted_removed,
        summary.dirs_pruned,
    );
    println!(
        "{} duplicates proposed, {} deleted, {} conflicts left in place, {} failures",
        summary.duplicates_queued,
        format!("{}", summary.duplicates_deleted).red(),
        summary.conflicts_abandoned,
        format!("{}", summary.failures).red(),
    );
}

fn run_missing_episodes(
    config: &AppConfig,
    roots: &[PathBuf],
    csv_path: Option<&Path>,
) -> anyhow::Result<()> {
    let handle = organizer_for(config, roots)?.spawn_missing_episodes_analysis();
    let view = RunView::new("Checking series against Sonarr");
    for event in handle.events.iter() {
        if let RunEvent::Log { level, message } = event {
            view.log(level, &message);
        }
    }
    view.finish();

    let report = handle.join().context("Missing episodes analysis failed")?;
    print_report(&report);
    if let Some(path) = csv_path {
        write_csv(&report, path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Missing episodes written to {}", path.display());
    }
    Ok(())
}

fn print_report(report: &MissingEpisodesReport) {
    if report.is_empty() {
        println!("{}", "No missing episodes found.".green());
        return;
    }
    for (series, episodes) in &report.series {
        println!("{} ({} missing)", series.bold(), episodes.len());
        for (season, episode) in episodes {
            println!("  S{:02}E{:02}", season, episode);
        }
    }
}

fn write_csv(report: &MissingEpisodesReport, path: &Path) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["series", "season", "episode"])?;
    for (series, episodes) in &report.series {
        for (season, episode) in episodes {
            let season = season.to_string();
            let episode = episode.to_string();
            writer.write_record([series.as_str(), season.as_str(), episode.as_str()])?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" | "YES" => return Ok(true),
            "N" | "NO" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
