//! Line-oriented log sinks shared across worker threads.

use anyhow::{Context, Result};
use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::ErrorRecord;

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// One owned writer behind a mutex. Clones share the writer; each line is formatted first and
/// written with a single `write_all` under the lock, so lines from different workers never interleave.
#[derive(Clone)]
pub struct LogSink {
    writer: SharedWriter,
    lines: Arc<AtomicUsize>,
}

impl LogSink {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        LogSink {
            writer: Arc::new(Mutex::new(Box::new(writer))),
            lines: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create (truncate) `path` and log into it through a buffer.
    pub fn create(path: &Path) -> Result<Self> {
        let file =
            File::create(path).with_context(|| format!("create log file {}", path.display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }

    /// Discard everything (still counts lines).
    pub fn discard() -> Self {
        Self::new(io::sink())
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        // A worker that panicked mid-write leaves at worst a partial line; keep logging.
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append one line. A failing sink is reported through `log` and never stops the caller.
    pub fn write_line(&self, line: impl Display) {
        let mut buf = line.to_string();
        buf.push('\n');
        if let Err(e) = self.lock().write_all(buf.as_bytes()) {
            log::error!("log sink write failed: {}", e);
            return;
        }
        self.lines.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record(&self, record: &ErrorRecord) {
        self.write_line(record);
    }

    /// Lines written so far through this sink and its clones.
    pub fn lines(&self) -> usize {
        self.lines.load(Ordering::Relaxed)
    }

    pub fn flush(&self) -> Result<()> {
        self.lock().flush().context("flush log sink")
    }
}

/// Cloneable in-memory writer. Every clone appends to the same buffer.
#[derive(Clone, Default, Debug)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer contents as (lossy) UTF-8.
    pub fn contents(&self) -> String {
        let buf = self.0.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Non-empty lines in the buffer.
    pub fn lines(&self) -> Vec<String> {
        self.contents()
            .lines()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
