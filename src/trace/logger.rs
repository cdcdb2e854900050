use std::{fs::File, fs::OpenOptions, io::Write, path::Path, sync::Mutex};

use tracing::warn;

use crate::trace::trace::TraceEvent;

/// Append-only JSONL sink for fill events. Open and write failures are
/// logged and otherwise ignored so a fill never fails on its trace.
pub struct TraceLogger {
    file: Option<Mutex<File>>,
}

impl TraceLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .inspect_err(|e| warn!(path = %path.display(), error = %e, "could not open trace file"))
            .ok()
            .map(Mutex::new);
        Self { file }
    }

    pub fn log(&self, event: &TraceEvent) {
        let Some(file) = &self.file else {
            return;
        };

        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "failed to serialize trace event");
                return;
            }
        };

        match file.lock() {
            Ok(mut f) => {
                if let Err(e) = writeln!(f, "{}", line) {
                    warn!(error = %e, "failed to write trace event");
                }
            }
            Err(e) => warn!(error = %e, "trace logger lock poisoned"),
        }
    }
}
