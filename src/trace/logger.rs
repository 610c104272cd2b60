use std::{
    fs::OpenOptions,
    io::Write,
    path::Path,
    sync::Mutex,
    sync::atomic::{AtomicUsize, Ordering},
};

use tracing::warn;

use crate::trace::trace::TranslationTraceEvent;

/// Appends one JSON line per translated file. A logger that failed to open
/// its file drops events instead of failing the run.
pub struct TraceLogger {
    file: Option<Mutex<std::fs::File>>,
    written: AtomicUsize,
}

impl TraceLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => Some(Mutex::new(f)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not open trace file");
                None
            }
        };
        Self {
            file,
            written: AtomicUsize::new(0),
        }
    }

    /// A logger that records nothing.
    pub fn disabled() -> Self {
        Self {
            file: None,
            written: AtomicUsize::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }

    /// Events successfully appended so far.
    pub fn records(&self) -> usize {
        self.written.load(Ordering::Relaxed)
    }

    pub fn log(&self, event: &TranslationTraceEvent) {
        let Some(file_mutex) = &self.file else {
            return;
        };

        let json = match serde_json::to_string(event) {
            Ok(j) => j,
            Err(e) => {
                warn!(file = %event.file, error = %e, "failed to serialize trace event");
                return;
            }
        };

        let mut file = match file_mutex.lock() {
            Ok(f) => f,
            Err(e) => {
                warn!(error = %e, "trace logger lock poisoned");
                return;
            }
        };

        match writeln!(file, "{}", json) {
            Ok(()) => {
                self.written.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => warn!(file = %event.file, error = %e, "failed to write trace event"),
        }
    }
}
