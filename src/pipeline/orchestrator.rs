use anyhow::{Context, Result};
use crossbeam_channel::{SendTimeoutError, Sender};
use log::{debug, info};
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use super::context::{CopyContext, WorkerShared, create_copy_channels};
use super::error_handler::{check_cancelled, join_all};
use super::worker::spawn_copy_workers;
use crate::engine::log_sink::LogSink;
use crate::engine::tools::path_from_line;
use crate::utils::config::CANCEL_POLL_INTERVAL;
use crate::{CopySummary, CopyTask, ErrorRecord};

/// What the dispatch loop did before the queue was closed.
#[derive(Debug, Default)]
struct DispatchStats {
    dispatched: usize,
    malformed: usize,
    last_seq: u64,
}

enum Push {
    Sent,
    Cancelled,
}

/// Push with backpressure: block while the queue is full, checking the cancel token between waits.
fn push_task(task_tx: &Sender<CopyTask>, mut task: CopyTask, ctx: &CopyContext) -> Result<Push> {
    loop {
        if ctx.cancel.is_cancelled() {
            return Ok(Push::Cancelled);
        }
        match task_tx.send_timeout(task, CANCEL_POLL_INTERVAL) {
            Ok(()) => return Ok(Push::Sent),
            Err(SendTimeoutError::Timeout(t)) => task = t,
            Err(SendTimeoutError::Disconnected(_)) => {
                anyhow::bail!("all copy workers exited before the queue was closed")
            }
        }
    }
}

/// Read the file list and turn each line into a [`CopyTask`]. Blank lines are recorded and skipped.
/// A reader error ends dispatch with an error; tasks already queued still run.
fn dispatch_tasks<R: BufRead>(
    files: R,
    ctx: &CopyContext,
    task_tx: &Sender<CopyTask>,
    errors: &LogSink,
) -> Result<DispatchStats> {
    let source_root: Arc<Path> = Arc::from(ctx.source_root.as_path());
    let target_root: Arc<Path> = Arc::from(ctx.target_root.as_path());
    let mut stats = DispatchStats {
        last_seq: ctx.first_seq.saturating_sub(1),
        ..Default::default()
    };
    let mut seq = ctx.first_seq;
    for (idx, line) in files.lines().enumerate() {
        let line = line.with_context(|| format!("read file list at line {}", idx + 1))?;
        let Some(source) = path_from_line(&line) else {
            stats.malformed += 1;
            errors.record(&ErrorRecord::MalformedLine {
                line_no: idx + 1,
                line,
                reason: "empty path".to_string(),
            });
            continue;
        };
        let task = CopyTask {
            seq,
            source,
            source_root: Arc::clone(&source_root),
            target_root: Arc::clone(&target_root),
        };
        match push_task(task_tx, task, ctx)? {
            Push::Sent => {
                stats.dispatched += 1;
                stats.last_seq = seq;
                seq += 1;
            }
            Push::Cancelled => {
                debug!("dispatch stopped by cancellation after {} tasks", stats.dispatched);
                break;
            }
        }
    }
    Ok(stats)
}

/// Copy every file named in `files` from `ctx.source_root` to `ctx.target_root` using
/// `ctx.pipeline_length` workers fed through a queue of the same capacity.
///
/// Blocks until every worker has exited. Per-file failures land in `errors` (and as a failed line in
/// `backup_log`) and do not fail the call. Fails on setup problems, a reader error, a worker panic
/// or cancellation, always after the workers have been joined and the sinks flushed.
pub fn run_copy_pipeline<R: BufRead>(
    files: R,
    ctx: &CopyContext,
    backup_log: &LogSink,
    errors: &LogSink,
) -> Result<CopySummary> {
    if ctx.pipeline_length == 0 {
        anyhow::bail!("pipeline length must be at least 1");
    }
    if !ctx.source_root.is_dir() {
        anyhow::bail!(
            "Source root is not a directory: {}",
            ctx.source_root.display()
        );
    }
    debug!(
        "copy pipeline: {} workers, {} -> {}",
        ctx.pipeline_length,
        ctx.source_root.display(),
        ctx.target_root.display()
    );

    let channels = create_copy_channels(ctx.pipeline_length);
    let shared = WorkerShared::new(ctx, backup_log, errors);
    let worker_handles = spawn_copy_workers(&channels.task_rx, &shared, ctx.pipeline_length);
    // Workers hold the only receivers now, so a dead pool shows up as a disconnected send.
    drop(channels.task_rx);
    if worker_handles.is_empty() {
        anyhow::bail!("could not start any copy worker");
    }

    let dispatched = dispatch_tasks(files, ctx, &channels.task_tx, errors);
    // Dropping the last sender closes the queue so workers drain it and exit.
    drop(channels.task_tx);

    let worker_stats = join_all(worker_handles, "copy worker");
    backup_log.flush()?;
    errors.flush()?;
    let worker_stats = worker_stats?;
    let dispatched = dispatched?;

    let mut summary = CopySummary {
        dispatched: dispatched.dispatched,
        malformed: dispatched.malformed,
        last_seq: dispatched.last_seq,
        ..Default::default()
    };
    for s in &worker_stats {
        summary.copied += s.copied;
        summary.failed += s.failed;
    }
    check_cancelled(&ctx.cancel, "copy")?;
    info!(
        "Copied {} of {} files ({} failed, {} malformed lines)",
        summary.copied, summary.dispatched, summary.failed, summary.malformed
    );
    Ok(summary)
}
