//! Progress reporting for index builds

use tracing::debug;

/// Receiver of build progress
///
/// Notifications are one-way and never affect the build.
pub trait ProgressSink {
    /// Called once before the first file is processed
    fn reset(&mut self);

    /// Called after each file with the number of files completed so far
    fn report(&mut self, completed: usize, total: usize);
}

/// Discards all progress
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn reset(&mut self) {}

    fn report(&mut self, _completed: usize, _total: usize) {}
}

/// Emits a debug log line per report
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn reset(&mut self) {
        debug!("Progress reset");
    }

    fn report(&mut self, completed: usize, total: usize) {
        let percent = if total == 0 {
            100
        } else {
            completed * 100 / total
        };
        debug!("Progress: {}/{} ({}%)", completed, total, percent);
    }
}
