use crate::engine::RunState;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// Events published by the worker on the log channel.
#[derive(Debug, Clone)]
pub enum RunEvent {
    Log { level: LogLevel, message: String },
    StateChanged(RunState),
    /// The run is suspended until the caller confirms a subset of these paths.
    DeletionProposed(Vec<PathBuf>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub processed: usize,
    pub total: usize,
    pub percent: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressCounters {
    pub total_files: usize,
    pub processed_files: usize,
}

impl ProgressCounters {
    pub fn percent(&self) -> u8 {
        if self.total_files == 0 {
            return 100;
        }
        let done = self.processed_files.min(self.total_files);
        (done * 100 / self.total_files) as u8
    }
}

/// User-facing log stream of a run. Every entry is also emitted as a `tracing` event so
/// that whichever subscriber the binary installs (console, file) receives it.
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    tx: Option<Sender<RunEvent>>,
}

impl RunLog {
    pub fn new(tx: Sender<RunEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A log that only emits `tracing` events.
    pub fn silent() -> Self {
        Self { tx: None }
    }

    pub fn info(&self, message: impl Into<String>) {
        let message = message.into();
        info!("{}", message);
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        error!("{}", message);
        self.log(LogLevel::Error, message);
    }

    pub fn send(&self, event: RunEvent) {
        if let Some(tx) = &self.tx {
            // The caller may have stopped listening; the run carries on regardless.
            let _ = tx.send(event);
        }
    }

    fn log(&self, level: LogLevel, message: String) {
        self.send(RunEvent::Log { level, message });
    }
}

/// Owns the run's `ProgressCounters` and publishes every change on the progress channel.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    counters: ProgressCounters,
    tx: Option<Sender<ProgressUpdate>>,
}

impl ProgressTracker {
    pub fn new(tx: Sender<ProgressUpdate>) -> Self {
        Self {
            counters: ProgressCounters::default(),
            tx: Some(tx),
        }
    }

    pub fn silent() -> Self {
        Self::default()
    }

    pub fn counters(&self) -> ProgressCounters {
        self.counters
    }

    pub fn set_total(&mut self, total_files: usize) {
        self.counters = ProgressCounters {
            total_files,
            processed_files: 0,
        };
        self.publish();
    }

    pub fn advance(&mut self) {
        self.counters.processed_files += 1;
        self.publish();
    }

    fn publish(&self) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(ProgressUpdate {
                processed: self.counters.processed_files,
                total: self.counters.total_files,
                percent: self.counters.percent(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_empty_run_reports_complete() {
        assert_eq!(ProgressCounters::default().percent(), 100);
    }

    #[test]
    fn test_tracker_publishes_each_step() {
        let (tx, rx) = mpsc::channel();
        let mut tracker = ProgressTracker::new(tx);
        tracker.set_total(3);
        tracker.advance();
        tracker.advance();
        tracker.advance();
        drop(tracker);

        let percents: Vec<u8> = rx.iter().map(|update| update.percent).collect();
        assert_eq!(percents, vec![0, 33, 66, 100]);
    }

    #[test]
    fn test_run_log_forwards_events() {
        let (tx, rx) = mpsc::channel();
        let log = RunLog::new(tx);
        log.warn("year lookup failed");
        drop(log);

        match rx.recv().unwrap() {
            RunEvent::Log { level, message } => {
                assert_eq!(level, LogLevel::Warn);
                assert_eq!(message, "year lookup failed");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
