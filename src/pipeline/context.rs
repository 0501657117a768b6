//! Pipeline context: shared data passed into the walk thread and the copy workers.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::path::PathBuf;

use crate::engine::cancel::CancelToken;
use crate::engine::log_sink::LogSink;
use crate::engine::progress::ProgressBar;
use crate::pipeline::retry::RetryPolicy;
use crate::{CopyTask, ErrorRecord, ScanOpts, SourceEntry};

/// Everything the copy pipeline needs besides its input list and log sinks.
#[derive(Clone)]
pub struct CopyContext {
    pub source_root: PathBuf,
    pub target_root: PathBuf,
    /// Worker count and task queue capacity. Must be at least 1.
    pub pipeline_length: usize,
    pub retry: RetryPolicy,
    pub follow_links: bool,
    /// Sequence number of the first task; lets consecutive batches number continuously.
    pub first_seq: u64,
    pub cancel: CancelToken,
    pub progress: Option<ProgressBar>,
}

impl CopyContext {
    pub fn new(source_root: PathBuf, target_root: PathBuf, pipeline_length: usize) -> Self {
        CopyContext {
            source_root,
            target_root,
            pipeline_length,
            retry: RetryPolicy::default(),
            follow_links: false,
            first_seq: 1,
            cancel: CancelToken::new(),
            progress: None,
        }
    }
}

/// State each copy worker owns a clone of.
#[derive(Clone)]
pub struct WorkerShared {
    pub backup_log: LogSink,
    pub errors: LogSink,
    pub retry: RetryPolicy,
    pub follow_links: bool,
    pub cancel: CancelToken,
    pub progress: Option<ProgressBar>,
}

impl WorkerShared {
    pub fn new(ctx: &CopyContext, backup_log: &LogSink, errors: &LogSink) -> Self {
        WorkerShared {
            backup_log: backup_log.clone(),
            errors: errors.clone(),
            retry: ctx.retry,
            follow_links: ctx.follow_links,
            cancel: ctx.cancel.clone(),
            progress: ctx.progress.clone(),
        }
    }
}

/// Bounded task queue. Orchestrator gets `task_tx`; workers get clones of `task_rx`.
pub struct CopyChannels {
    pub task_tx: Sender<CopyTask>,
    pub task_rx: Receiver<CopyTask>,
}

/// Queue capacity equals the pipeline length so the producer can run at most one task per worker ahead.
pub fn create_copy_channels(pipeline_length: usize) -> CopyChannels {
    let (task_tx, task_rx) = bounded::<CopyTask>(pipeline_length.max(1));
    CopyChannels { task_tx, task_rx }
}

/// Shared context for the walk thread.
#[derive(Clone, Debug)]
pub struct WalkContext {
    pub root: PathBuf,
    pub follow_links: bool,
    pub parallel_walk: bool,
}

impl WalkContext {
    pub fn new(root: PathBuf, opts: &ScanOpts) -> Self {
        WalkContext {
            root,
            follow_links: opts.follow_links,
            parallel_walk: opts.parallel_walk,
        }
    }
}

/// What the walk thread sends to the writer side of the scan.
#[derive(Debug)]
pub enum ScanEvent {
    Entry(SourceEntry),
    Error(ErrorRecord),
}
