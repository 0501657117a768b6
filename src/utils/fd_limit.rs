//! File descriptor limit detection for capping the copy pipeline (Unix).

use log::{debug, warn};

use crate::utils::config::WorkerThreadLimits;

/// Each copy worker holds the source and the target open at once.
pub const FDS_PER_COPY_WORKER: usize = 2;

/// Fraction of the process FD limit to use (leave headroom for logs, batch files, the walk).
const FD_LIMIT_FRACTION: f64 = 0.8;

/// Returns the soft limit for max open file descriptors, or `None` if unavailable (e.g. Windows).
#[cfg(unix)]
pub fn max_open_fds() -> Option<u64> {
    use std::mem::MaybeUninit;
    let mut rlim = MaybeUninit::<libc::rlimit>::uninit();
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, rlim.as_mut_ptr()) } != 0 {
        return None;
    }
    let rlim = unsafe { rlim.assume_init() };
    let cur = rlim.rlim_cur;
    // RLIM_INFINITY is typically !0 or u64::MAX; treat as "no practical limit"
    if cur == libc::RLIM_INFINITY || cur > i64::MAX as u64 {
        return None;
    }
    Some(cur)
}

#[cfg(not(unix))]
pub fn max_open_fds() -> Option<u64> {
    None
}

/// Largest pipeline length that stays under ~80% of the FD limit, or `None` when unlimited.
pub fn max_workers_by_fd_limit() -> Option<usize> {
    let limit = max_open_fds()?;
    let usable = (limit as f64 * FD_LIMIT_FRACTION) as usize;
    if usable < FDS_PER_COPY_WORKER {
        return Some(1);
    }
    Some(usable / FDS_PER_COPY_WORKER)
}

/// Resolve the copy pipeline length.
///
/// `None` picks the rayon-derived default capped by the FD limit. An explicit value is kept
/// as given; a warning is logged when it exceeds the cap.
pub fn resolve_pipeline_length(requested: Option<usize>) -> usize {
    let fd_cap = max_workers_by_fd_limit();
    match requested {
        Some(n) => {
            if let Some(cap) = fd_cap
                && n > cap
            {
                warn!(
                    "Pipeline length {} may exhaust file descriptors (suggested max {})",
                    n, cap
                );
            }
            n.max(1)
        }
        None => {
            let default = WorkerThreadLimits::current().default_pipeline_length();
            match fd_cap {
                Some(cap) if cap < default => {
                    debug!("Capping pipeline {} -> {} (FD limit ~80%)", default, cap);
                    cap.max(1)
                }
                _ => default,
            }
        }
    }
}
