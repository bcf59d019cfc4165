//! User-facing output sink.
//!
//! Everything the tool prints for the user goes through a [`Console`] handle instead of
//! `println!`, so a run can be redirected to a log file (or captured in tests) without
//! touching process-wide state. Dropping the last handle flushes the destination; stdout
//! is untouched and becomes the destination again for anything printed afterwards.

use std::fmt::Display;
use std::fs::File;
use std::io::{self, LineWriter, Write};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

#[derive(Clone)]
pub struct Console {
    writer: SharedWriter,
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

impl Console {
    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stdout() -> Self {
        Self::from_writer(io::stdout())
    }

    /// Truncates `path` and writes line by line so partial runs still leave a readable log.
    pub fn log_file(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        log::debug!(
            target: "hb_conv::console",
            "Routing output to log file {}",
            path.display()
        );
        Ok(Self::from_writer(LineWriter::new(file)))
    }

    /// Write one line. Sink failures are logged, never fatal.
    pub fn line(&self, text: impl Display) {
        let mut guard = self.writer.lock();
        if let Err(e) = writeln!(guard, "{}", text) {
            log::warn!(target: "hb_conv::console", "Failed to write output: {}", e);
        }
    }

    /// Pass through raw bytes (e.g. ffprobe output) unchanged.
    pub fn raw(&self, bytes: &[u8]) {
        let mut guard = self.writer.lock();
        if let Err(e) = guard.write_all(bytes) {
            log::warn!(target: "hb_conv::console", "Failed to write output: {}", e);
        }
    }

    pub fn flush(&self) {
        let mut guard = self.writer.lock();
        if let Err(e) = guard.flush() {
            log::warn!(target: "hb_conv::console", "Failed to flush output: {}", e);
        }
    }
}

impl Drop for Console {
    fn drop(&mut self) {
        if Arc::strong_count(&self.writer) == 1 {
            self.flush();
        }
    }
}

/// In-memory sink; clones share the same buffer.
#[derive(Clone, Default, Debug)]
pub struct MemorySink(Arc<Mutex<Vec<u8>>>);

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
