//! Batch slicing: split a file list into numbered, fixed-size batch files.

use anyhow::{Context, Result};
use log::debug;
use std::fs::{self, File};
use std::io::{self, BufRead, BufWriter, Write};
use std::mem;
use std::path::{Path, PathBuf};

use crate::engine::log_sink::LogSink;
use crate::utils::config::OutputNames;
use crate::{ErrorRecord, SliceSummary};

/// Where batches are persisted. Batch numbers start at 1 and are never reused.
pub trait BatchStore {
    type Writer: Write;

    fn open_batch(&mut self, number: u64) -> io::Result<Self::Writer>;
}

/// One file per batch inside a directory, named by [`OutputNames::batch_file`].
#[derive(Clone, Debug)]
pub struct DirBatchStore {
    dir: PathBuf,
}

impl DirBatchStore {
    /// Use `dir` as is; batch creation fails if it does not exist.
    pub fn new(dir: PathBuf) -> Self {
        DirBatchStore { dir }
    }

    /// Create `dir` (and ancestors) first. Failure is a setup error.
    pub fn create(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("create batches directory {}", dir.display()))?;
        Ok(Self::new(dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn batch_path(&self, number: u64) -> PathBuf {
        self.dir.join(OutputNames::batch_file(number))
    }

    /// Batch files present in the directory, ordered by batch number (not by name, which stops
    /// sorting numerically past six digits).
    pub fn batch_paths(&self) -> Result<Vec<PathBuf>> {
        let mut numbered: Vec<(u64, PathBuf)> = fs::read_dir(&self.dir)
            .with_context(|| format!("read batches directory {}", self.dir.display()))?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .filter_map(|p| {
                let number = p.file_name().and_then(|n| n.to_str()).and_then(batch_number)?;
                Some((number, p))
            })
            .collect();
        numbered.sort_by_key(|(number, _)| *number);
        Ok(numbered.into_iter().map(|(_, p)| p).collect())
    }
}

/// Batch number encoded in a `batch_<n>.txt` file name.
fn batch_number(file_name: &str) -> Option<u64> {
    file_name
        .strip_prefix("batch_")?
        .strip_suffix(".txt")?
        .parse()
        .ok()
}

impl BatchStore for DirBatchStore {
    type Writer = BufWriter<File>;

    fn open_batch(&mut self, number: u64) -> io::Result<Self::Writer> {
        File::create(self.batch_path(number)).map(BufWriter::new)
    }
}

/// Rollover state. Each state that owns a batch counts the lines routed to it so a batch is sealed
/// at capacity whether or not its lines could be written.
enum BatchState<W> {
    NoBatch,
    Open { number: u64, writer: W, lines: usize },
    Unusable { number: u64, lines: usize },
}

/// Line-at-a-time slicer over a [`BatchStore`].
pub struct BatchSlicer<'a, S: BatchStore> {
    store: &'a mut S,
    batch_size: usize,
    errors: &'a LogSink,
    state: BatchState<S::Writer>,
    summary: SliceSummary,
}

impl<'a, S: BatchStore> BatchSlicer<'a, S> {
    pub fn new(store: &'a mut S, batch_size: usize, errors: &'a LogSink) -> Result<Self> {
        if batch_size == 0 {
            anyhow::bail!("batch size must be at least 1");
        }
        Ok(BatchSlicer {
            store,
            batch_size,
            errors,
            state: BatchState::NoBatch,
            summary: SliceSummary::default(),
        })
    }

    fn current_is_full(&self) -> bool {
        match &self.state {
            BatchState::NoBatch => true,
            BatchState::Open { lines, .. } | BatchState::Unusable { lines, .. } => {
                *lines >= self.batch_size
            }
        }
    }

    /// Flush and release whatever batch is current. `NoBatch` afterwards.
    fn seal(&mut self) {
        if let BatchState::Open {
            number, mut writer, ..
        } = mem::replace(&mut self.state, BatchState::NoBatch)
            && let Err(e) = writer.flush()
        {
            self.errors.record(&ErrorRecord::BatchFlush {
                batch: number,
                reason: e.to_string(),
            });
        }
    }

    /// Seal the current batch and start the next number. An open failure leaves the batch
    /// `Unusable`: its lines are dropped and logged, and it still fills up before the next one starts.
    fn roll_over(&mut self) {
        self.seal();
        self.summary.batches += 1;
        let number = self.summary.batches;
        self.state = match self.store.open_batch(number) {
            Ok(writer) => {
                debug!("opened batch {}", number);
                BatchState::Open {
                    number,
                    writer,
                    lines: 0,
                }
            }
            Err(e) => {
                self.summary.failed_batches += 1;
                self.errors.record(&ErrorRecord::BatchCreate {
                    batch: number,
                    reason: e.to_string(),
                });
                BatchState::Unusable { number, lines: 0 }
            }
        };
    }

    /// Route one input line to the current batch, rolling over first when it is full.
    pub fn push_line(&mut self, line: &str) {
        if self.current_is_full() {
            self.roll_over();
        }
        self.summary.lines += 1;
        match &mut self.state {
            BatchState::Open { writer, lines, .. } => {
                *lines += 1;
                match writeln!(writer, "{}", line) {
                    Ok(()) => self.summary.written_lines += 1,
                    Err(e) => {
                        self.summary.failed_lines += 1;
                        self.errors.record(&ErrorRecord::LineWrite {
                            line: line.to_string(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
            BatchState::Unusable { number, lines } => {
                *lines += 1;
                self.summary.dropped_lines += 1;
                self.errors.record(&ErrorRecord::DroppedLine {
                    batch: *number,
                    line: line.to_string(),
                });
            }
            BatchState::NoBatch => {}
        }
    }

    /// Seal the last batch and return the counts.
    pub fn finish(mut self) -> SliceSummary {
        self.seal();
        self.summary
    }
}

/// Split `files` into batches of at most `batch_size` lines, in input order, persisted through `store`.
///
/// Batch and line failures are recorded in `errors` and slicing continues. A reader error seals the
/// open batch and then fails the call.
pub fn slice_batches<R: BufRead, S: BatchStore>(
    files: R,
    batch_size: usize,
    store: &mut S,
    errors: &LogSink,
) -> Result<SliceSummary> {
    let mut slicer = BatchSlicer::new(store, batch_size, errors)?;
    for (idx, line) in files.lines().enumerate() {
        match line {
            Ok(line) => slicer.push_line(&line),
            Err(e) => {
                let summary = slicer.finish();
                errors.flush()?;
                return Err(anyhow::Error::new(e).context(format!(
                    "files list reader failed at line {} after {} batches",
                    idx + 1,
                    summary.batches
                )));
            }
        }
    }
    let summary = slicer.finish();
    errors.flush()?;
    debug!(
        "sliced {} lines into {} batches ({} unusable)",
        summary.lines, summary.batches, summary.failed_batches
    );
    Ok(summary)
}
