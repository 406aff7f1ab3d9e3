//! Terminal progress for the per-day stages
//!
//! One bar per stage, grouped under an indicatif [`MultiProgress`]. A hidden
//! reporter draws nothing, so progress never changes what a run does.
//!
//! Log lines bound for the terminal go through [`ProgressLogWriter`], which clears
//! the bars while a line is printed and redraws them afterwards.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};
use tracing_subscriber::fmt::MakeWriter;

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}";

/// Factory for stage progress bars
#[derive(Clone)]
pub struct ProgressReporter {
    multi: MultiProgress,
}

impl ProgressReporter {
    /// Reporter drawing to stderr
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
        }
    }

    /// Reporter that draws nothing
    pub fn hidden() -> Self {
        Self {
            multi: MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
        }
    }

    /// Whether bars are drawn
    pub fn is_hidden(&self) -> bool {
        self.multi.is_hidden()
    }

    /// Stderr log writer that keeps this reporter's bars intact
    pub fn log_writer(&self) -> ProgressLogWriter {
        ProgressLogWriter {
            multi: self.multi.clone(),
        }
    }

    /// Start a bar for one stage of `total` tasks
    pub fn stage(&self, total: u64, message: impl Into<String>) -> StageProgress {
        let bar = self.multi.add(ProgressBar::new(total));
        let style = ProgressStyle::default_bar()
            .template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        bar.set_message(message.into());
        StageProgress { bar }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes log output to stderr with the progress bars suspended
#[derive(Clone)]
pub struct ProgressLogWriter {
    multi: MultiProgress,
}

impl Write for ProgressLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.multi.suspend(|| io::stderr().write_all(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl<'a> MakeWriter<'a> for ProgressLogWriter {
    type Writer = ProgressLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Progress of one stage, advanced once per settled task
pub struct StageProgress {
    bar: ProgressBar,
}

impl StageProgress {
    /// One more task settled
    pub fn settle(&self) {
        self.bar.inc(1);
    }

    /// Tasks settled so far
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Finish the bar, leaving `message` in place
    pub fn finish(self, message: impl Into<String>) {
        self.bar.finish_with_message(message.into());
    }
}
