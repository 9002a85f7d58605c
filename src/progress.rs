//! Per-phase progress bars.
//!
//! Every pipeline stage takes a `&ProgressBar`. In quiet mode (and in tests)
//! the bars are hidden, so stages tick them unconditionally.
//!
//! `Progress` is also the log writer: each event is buffered and written to
//! stderr with the bars suspended, so log lines never land inside a bar.

use std::io::{self, Write};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tracing_subscriber::fmt::MakeWriter;

const BAR_TEMPLATE: &str = "{spinner:.green} {msg:<28} [{bar:40.cyan/blue}] {pos}/{len} ({eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg:<28} {pos} found ({elapsed})";

/// Creates progress bars for each phase of a run
#[derive(Debug, Clone)]
pub struct Progress {
    multi: MultiProgress,
    enabled: bool,
}

impl Progress {
    pub fn new(enabled: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            enabled,
        }
    }

    /// Progress that never draws anything
    pub fn hidden() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Spinner for phases of unknown length (the scan)
    pub fn spinner(&self, message: &'static str) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(
            ProgressStyle::with_template(SPINNER_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    }

    /// Bar for phases of known length
    pub fn bar(&self, len: usize, message: &'static str) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new(len as u64));
        pb.set_style(
            ProgressStyle::with_template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message(message);
        pb
    }
}

/// One log event, flushed to stderr on drop
pub struct ProgressWriter {
    multi: MultiProgress,
    buf: Vec<u8>,
}

impl Write for ProgressWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ProgressWriter {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        self.multi.suspend(|| {
            let _ = io::stderr().write_all(&self.buf);
        });
    }
}

impl<'a> MakeWriter<'a> for Progress {
    type Writer = ProgressWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ProgressWriter {
            multi: self.multi.clone(),
            buf: Vec::new(),
        }
    }
}
