//! Scoped execution-trace capture for `--trace FILE`

use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;

/// Owns the trace output file for the duration of a run.
///
/// The guard is created before the logging subscriber is installed and its
/// writer handed to an extra TRACE-level layer; dropping the guard syncs the
/// file. The driver keeps it on the stack so every exit path, including
/// early error returns, releases it.
pub struct TraceGuard {
    file: Arc<File>,
}

impl TraceGuard {
    pub fn create(path: &Path) -> io::Result<TraceGuard> {
        let file = File::create(path)?;
        Ok(TraceGuard {
            file: Arc::new(file),
        })
    }

    /// Writer handle for the subscriber layer.
    pub fn writer(&self) -> Arc<File> {
        Arc::clone(&self.file)
    }
}

impl Drop for TraceGuard {
    fn drop(&mut self) {
        let _ = self.file.sync_all();
    }
}
