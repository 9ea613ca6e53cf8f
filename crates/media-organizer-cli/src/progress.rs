use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use media_organizer_core::{LogLevel, ProgressUpdate, RunState};
use std::time::Duration;

/// Terminal rendering of a run: a progress bar fed by the progress channel, with log entries
/// printed above it.
pub struct RunView {
    bar: ProgressBar,
}

impl RunView {
    pub fn new(message: &str) -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "  {spinner:.cyan} {msg} [{bar:30.cyan/dim}] {pos}/{len} files ({percent}%)",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━╸─")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        let line = match level {
            LogLevel::Info => message.normal(),
            LogLevel::Warn => message.yellow(),
            LogLevel::Error => message.red(),
        };
        self.bar.println(line.to_string());
    }

    pub fn set_state(&self, state: RunState) {
        let label = match state {
            RunState::Idle => "Idle",
            RunState::Walking => "Scanning folders",
            RunState::Processing => "Processing files",
            RunState::CleaningUp => "Cleaning up",
            RunState::AwaitingDeletionConfirmation => "Waiting for confirmation",
            RunState::Deleting => "Deleting duplicates",
            RunState::Done => "Done",
            RunState::Failed => "Failed",
        };
        self.bar.set_message(label.to_string());
        if state == RunState::Failed {
            self.bar.println(format!("{}", label.red().bold()));
        }
    }

    pub fn update(&self, update: ProgressUpdate) {
        if self.bar.length() != Some(update.total as u64) {
            self.bar.set_length(update.total as u64);
        }
        self.bar.set_position(update.processed as u64);
    }

    /// Hides the bar while `f` talks to the terminal.
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.bar.suspend(f)
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
