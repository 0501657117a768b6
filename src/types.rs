//! Public and internal types for the rbackup API and pipeline.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::pipeline::retry::RetryPolicy;
use crate::utils::config::DEFAULT_BATCH_SIZE;

/// What the walk found at a path. Anything else is reported, never listed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    RegularFile,
}

/// One classified path from the source walk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// What the skeleton builder does when a target directory cannot be created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MissingDirPolicy {
    /// Skip the directory silently.
    None,
    /// Write an error record and continue.
    #[default]
    Report,
    /// Abort the whole skeleton build.
    Stop,
}

impl fmt::Display for MissingDirPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingDirPolicy::None => write!(f, "none"),
            MissingDirPolicy::Report => write!(f, "report"),
            MissingDirPolicy::Stop => write!(f, "stop"),
        }
    }
}

/// Whether a full run finishes the skeleton before copying or builds it alongside the copy.
///
/// `Overlapped` relies on the copy worker's bounded retry to wait for directories the
/// skeleton thread has not reached yet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PhaseMode {
    #[default]
    Sequential,
    Overlapped,
}

/// One unit of copy work. Owned by exactly one worker once received.
#[derive(Clone, Debug)]
pub struct CopyTask {
    pub seq: u64,
    pub source: PathBuf,
    pub source_root: Arc<Path>,
    pub target_root: Arc<Path>,
}

/// Result of one copy task. `target` is `None` only when the source is outside the source root.
#[derive(Clone, Debug)]
pub struct CopyOutcome {
    pub seq: u64,
    pub source: PathBuf,
    pub target: Option<PathBuf>,
    pub mtime: Option<SystemTime>,
    pub error: Option<String>,
}

impl CopyOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// One backup-log line: sequence number, source, resolved target, status.
    pub fn backup_line(&self) -> String {
        let target = self
            .target
            .as_ref()
            .map(|t| t.display().to_string())
            .unwrap_or_else(|| "<unresolved>".to_string());
        let status = if self.is_ok() { "ok" } else { "failed" };
        format!(
            "file #{} ({} -> {}) {}",
            self.seq,
            self.source.display(),
            target,
            status
        )
    }
}

/// One line of an error log. Each variant carries enough context to find the offending input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorRecord {
    /// The walk could not read an entry.
    Unreadable { path: Option<PathBuf>, reason: String },
    /// The walk found something that is neither a directory nor a regular file.
    Unsupported { path: PathBuf },
    /// A target directory could not be created during the skeleton build.
    MissingDirectory { source: PathBuf, reason: String },
    /// A batch file could not be created; its lines are dropped.
    BatchCreate { batch: u64, reason: String },
    /// A line destined for an unusable batch.
    DroppedLine { batch: u64, line: String },
    /// Writing one line into an open batch failed.
    LineWrite { line: String, reason: String },
    /// Flushing a sealed batch failed; some of its lines may be missing.
    BatchFlush { batch: u64, reason: String },
    /// An input line that cannot become a copy task.
    MalformedLine { line_no: usize, line: String, reason: String },
    /// A copy task ended in a terminal failure.
    Copy { seq: u64, source: PathBuf, reason: String },
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreadable { path, reason } => match path {
                Some(p) => write!(f, "failed to read entry. path: {}, error: {}", p.display(), reason),
                None => write!(f, "failed to read entry. error: {}", reason),
            },
            Self::Unsupported { path } => {
                write!(f, "not a directory or regular file. path: {}", path.display())
            }
            Self::MissingDirectory { source, reason } => write!(
                f,
                "failed to create target directory. source: {}, error: {}",
                source.display(),
                reason
            ),
            Self::BatchCreate { batch, reason } => write!(
                f,
                "failed to create batch file. batch_number: {}, error: {}",
                batch, reason
            ),
            Self::DroppedLine { batch, line } => write!(
                f,
                "dropped line for unusable batch. batch_number: {}, line: {}",
                batch, line
            ),
            Self::LineWrite { line, reason } => {
                write!(f, "failed to write line. line: {}, error: {}", line, reason)
            }
            Self::BatchFlush { batch, reason } => write!(
                f,
                "failed to flush batch file. batch_number: {}, error: {}",
                batch, reason
            ),
            Self::MalformedLine {
                line_no,
                line,
                reason,
            } => write!(
                f,
                "skipped input line. line_number: {}, line: {:?}, error: {}",
                line_no, line, reason
            ),
            Self::Copy {
                seq,
                source,
                reason,
            } => write!(
                f,
                "failed to copy file #{}. source: {}, error: {}",
                seq,
                source.display(),
                reason
            ),
        }
    }
}

/// Walk options for [`list_sources`](crate::scan::list_sources).
#[derive(Clone, Copy, Debug, Default)]
pub struct ScanOpts {
    /// Follow symbolic links (links to files are listed as files).
    pub follow_links: bool,
    /// Walk with jwalk on the rayon pool instead of serial walkdir.
    pub parallel_walk: bool,
}

impl From<&Opts> for ScanOpts {
    fn from(o: &Opts) -> Self {
        ScanOpts {
            follow_links: o.follow_links,
            parallel_walk: o.parallel_walk,
        }
    }
}

/// Full options (CLI, config file, whole-run orchestration).
#[derive(Clone, Debug)]
pub struct Opts {
    /// Maximum file paths per batch.
    pub batch_size: usize,
    /// Copy worker count and task queue capacity. `None` derives it from threads and FD limit.
    pub pipeline_length: Option<usize>,
    /// Skeleton behavior when a target directory cannot be created.
    pub missing_dir_policy: MissingDirPolicy,
    /// Bound on waiting for an unavailable target root.
    pub retry: RetryPolicy,
    /// Follow symbolic links while listing and copying.
    pub follow_links: bool,
    /// Use the parallel walk.
    pub parallel_walk: bool,
    /// Progress bar and debug logging.
    pub verbose: bool,
    /// Sequential or overlapped skeleton/copy in a full run.
    pub phase_mode: PhaseMode,
}

impl Default for Opts {
    fn default() -> Self {
        Opts {
            batch_size: DEFAULT_BATCH_SIZE,
            pipeline_length: None,
            missing_dir_policy: MissingDirPolicy::default(),
            retry: RetryPolicy::default(),
            follow_links: false,
            parallel_walk: false,
            verbose: false,
            phase_mode: PhaseMode::default(),
        }
    }
}

/// Counts from one source scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub dirs: usize,
    pub files: usize,
    pub errors: usize,
}

/// Counts from one skeleton build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SkeletonSummary {
    pub processed: usize,
    pub created: usize,
    pub failed: usize,
}

/// Counts from one slicing pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SliceSummary {
    /// Input lines read.
    pub lines: usize,
    /// Batch numbers assigned, including unusable ones.
    pub batches: u64,
    pub failed_batches: u64,
    pub written_lines: usize,
    pub dropped_lines: usize,
    pub failed_lines: usize,
}

/// Counts from one copy pipeline run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CopySummary {
    pub dispatched: usize,
    pub copied: usize,
    pub failed: usize,
    /// Input lines that never became tasks.
    pub malformed: usize,
    /// Sequence number of the last dispatched task (first sequence - 1 when nothing ran).
    pub last_seq: u64,
}

impl CopySummary {
    /// Fold another run's counts into this one (used across batches).
    pub fn absorb(&mut self, other: &CopySummary) {
        self.dispatched += other.dispatched;
        self.copied += other.copied;
        self.failed += other.failed;
        self.malformed += other.malformed;
        self.last_seq = self.last_seq.max(other.last_seq);
    }
}
