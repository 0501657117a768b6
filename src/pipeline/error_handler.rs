use anyhow::Result;
use std::thread::JoinHandle;

use crate::engine::cancel::CancelToken;
use crate::engine::log_sink::LogSink;

/// Fail with `what` if the run was cancelled. Call after every thread of the phase has been joined.
pub fn check_cancelled(cancel: &CancelToken, what: &str) -> Result<()> {
    if cancel.is_cancelled() {
        anyhow::bail!("{} cancelled by user; partial output was flushed", what);
    }
    Ok(())
}

/// Warn once when a phase finished with per-item errors; the phase itself still succeeds.
pub fn warn_on_recorded_errors(errors: &LogSink, phase: &str) {
    let n = errors.lines();
    if n > 0 {
        log::warn!("{}: {} errors recorded in the error log", phase, n);
    }
}

/// Join worker threads, surfacing a panic as an error only after every thread has been joined.
pub fn join_all<T>(handles: Vec<JoinHandle<T>>, what: &str) -> Result<Vec<T>> {
    let mut results = Vec::with_capacity(handles.len());
    let mut panicked = 0_usize;
    for h in handles {
        match h.join() {
            Ok(v) => results.push(v),
            Err(_) => panicked += 1,
        }
    }
    if panicked > 0 {
        anyhow::bail!("{} {} thread(s) panicked", panicked, what);
    }
    Ok(results)
}
