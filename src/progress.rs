//! Progress reporting for split operations.
//!
//! Progress is a side channel: sinks must never block or fail the split.

use crate::accounting::bytes_to_mb;
use crossbeam_channel::Sender;
use std::io::Write;

/// Rows between progress updates emitted by the splitters.
pub const PROGRESS_INTERVAL: u64 = 8192;

/// Unit of a progress update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressUnit {
    Rows,
    Bytes,
}

impl ProgressUnit {
    pub fn label(&self) -> &'static str {
        match self {
            ProgressUnit::Rows => "rows",
            ProgressUnit::Bytes => "MB",
        }
    }
}

/// A single progress update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub done: u64,
    pub total: u64,
    pub unit: ProgressUnit,
}

impl ProgressUpdate {
    /// Completed percentage, clamped to 100.
    pub fn percent(&self) -> u64 {
        if self.total == 0 {
            100
        } else {
            (self.done.min(self.total) * 100) / self.total
        }
    }
}

/// Receiver of `(done, total, unit)` updates.
pub trait ProgressSink {
    fn update(&mut self, done: u64, total: u64, unit: ProgressUnit);
}

/// Discards all updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&mut self, _done: u64, _total: u64, _unit: ProgressUnit) {}
}

/// Forwards updates over a bounded channel without blocking.
///
/// Updates are dropped when the channel is full or disconnected.
pub struct ChannelProgress {
    tx: Sender<ProgressUpdate>,
}

impl ChannelProgress {
    pub fn new(tx: Sender<ProgressUpdate>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgress {
    fn update(&mut self, done: u64, total: u64, unit: ProgressUnit) {
        let _ = self.tx.try_send(ProgressUpdate { done, total, unit });
    }
}

/// Renders a single progress line, redrawn when the percentage changes.
pub struct StderrProgress<W: Write> {
    out: W,
    label: String,
    last_percent: Option<u64>,
}

impl StderrProgress<std::io::Stderr> {
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_writer(std::io::stderr(), label)
    }
}

impl<W: Write> StderrProgress<W> {
    pub fn with_writer(out: W, label: impl Into<String>) -> Self {
        Self {
            out,
            label: label.into(),
            last_percent: None,
        }
    }

    /// Draw an update if it moves the displayed percentage.
    pub fn render(&mut self, update: ProgressUpdate) {
        let percent = update.percent();
        if self.last_percent == Some(percent) {
            return;
        }
        self.last_percent = Some(percent);

        let _ = match update.unit {
            ProgressUnit::Rows => write!(
                self.out,
                "\r{}: {:>3}% ({}/{} {})",
                self.label,
                percent,
                update.done,
                update.total,
                update.unit.label()
            ),
            ProgressUnit::Bytes => write!(
                self.out,
                "\r{}: {:>3}% ({:.2}/{:.2} {})",
                self.label,
                percent,
                bytes_to_mb(update.done),
                bytes_to_mb(update.total),
                update.unit.label()
            ),
        };
        let _ = self.out.flush();
    }

    /// Terminate the progress line.
    pub fn finish(&mut self) {
        if self.last_percent.is_some() {
            let _ = writeln!(self.out);
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ProgressSink for StderrProgress<W> {
    fn update(&mut self, done: u64, total: u64, unit: ProgressUnit) {
        self.render(ProgressUpdate { done, total, unit });
    }
}

/// Collects updates in memory.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub(crate) struct RecordingProgress {
    pub updates: Vec<ProgressUpdate>,
}

#[cfg(test)]
impl ProgressSink for RecordingProgress {
    fn update(&mut self, done: u64, total: u64, unit: ProgressUnit) {
        self.updates.push(ProgressUpdate { done, total, unit });
    }
}
