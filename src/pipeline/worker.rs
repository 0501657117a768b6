use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};

use super::context::WorkerShared;
use crate::engine::copy_file::backup_file;
use crate::engine::progress::update_progress_bar;
use crate::utils::config::CANCEL_POLL_INTERVAL;
use crate::{CopyOutcome, CopyTask, ErrorRecord};

/// Per-worker counts, summed by the orchestrator after join.
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkerStats {
    pub copied: usize,
    pub failed: usize,
}

/// Log one outcome: always a backup-log line, plus an error-log line on failure.
fn record_outcome(outcome: &CopyOutcome, shared: &WorkerShared, stats: &mut WorkerStats) {
    shared.backup_log.write_line(outcome.backup_line());
    match &outcome.error {
        None => stats.copied += 1,
        Some(reason) => {
            stats.failed += 1;
            shared.errors.record(&ErrorRecord::Copy {
                seq: outcome.seq,
                source: outcome.source.clone(),
                reason: reason.clone(),
            });
        }
    }
    if let Some(pb) = &shared.progress {
        update_progress_bar(pb, 1);
    }
}

/// Single copy worker: take tasks in queue order until the queue is closed and drained,
/// or until cancellation. Tasks left in the queue after cancellation are never started.
fn copy_worker_loop(task_rx: Receiver<CopyTask>, shared: WorkerShared) -> WorkerStats {
    let mut stats = WorkerStats::default();
    loop {
        if shared.cancel.is_cancelled() {
            break;
        }
        match task_rx.recv_timeout(CANCEL_POLL_INTERVAL) {
            Ok(task) => {
                let outcome = backup_file(&task, &shared.retry, shared.follow_links, &shared.cancel);
                record_outcome(&outcome, &shared, &mut stats);
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    stats
}

/// Spawn `num_workers` copy workers on clones of `task_rx`. Workers exit once every sender is dropped and the queue is empty.
pub fn spawn_copy_workers(
    task_rx: &Receiver<CopyTask>,
    shared: &WorkerShared,
    num_workers: usize,
) -> Vec<JoinHandle<WorkerStats>> {
    (0..num_workers)
        .map(|worker_id| {
            let task_rx = task_rx.clone();
            let shared = shared.clone();
            thread::Builder::new()
                .name(format!("copy-worker-{worker_id}"))
                .spawn(move || copy_worker_loop(task_rx, shared))
        })
        .filter_map(|spawned| match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::warn!("could not spawn copy worker: {}", e);
                None
            }
        })
        .collect()
}
